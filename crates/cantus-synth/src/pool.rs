//! The segment worker pool: bounded fan-out of the segment stage list.
//!
//! Each admitted segment runs on its own task and owns its segment outright;
//! a semaphore bounds how many run at once. The first stage error wins:
//! admission stops, running tasks are asked to stop at their next stage
//! boundary, and every spawned task is reaped before the error is returned.

use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use cantus_core::record::{Segment, Utterance};
use cantus_core::{Result, SynthError};

use crate::stage::{RecordStage, SegmentContext, SegmentStage};

/// Parallelism applied when the configured worker count is zero.
pub const DEFAULT_WORKERS: usize = 3;

/// Runs the segment stage list over every segment with bounded parallelism.
pub struct SegmentPool {
    stages: Arc<[Arc<dyn SegmentStage>]>,
    workers: usize,
}

impl SegmentPool {
    /// A pool over the given stages; zero workers selects the default of 3.
    #[must_use]
    pub fn new(workers: usize, stages: Vec<Arc<dyn SegmentStage>>) -> Self {
        Self {
            stages: stages.into(),
            workers: if workers == 0 { DEFAULT_WORKERS } else { workers },
        }
    }

    /// Process every segment through the stage list, restoring index order.
    ///
    /// Within one segment the stages run in configured order; across segments
    /// nothing is ordered. Cancellation is cooperative: a stage already
    /// running is never interrupted, but no further stage starts once a
    /// sibling has failed.
    pub async fn run(&self, segments: Vec<Segment>, ctx: SegmentContext) -> Result<Vec<Segment>> {
        if segments.is_empty() {
            return Ok(segments);
        }
        let total = segments.len();
        debug!(segments = total, workers = self.workers, "running segment pool");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let cancel = CancellationToken::new();
        let ctx = Arc::new(ctx);
        let mut tasks: JoinSet<(usize, Segment, Option<SynthError>)> = JoinSet::new();
        let mut slots: Vec<Option<Segment>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);
        let mut first_error: Option<SynthError> = None;

        for (index, segment) in segments.into_iter().enumerate() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // The semaphore is never closed.
                    cancel.cancel();
                    if first_error.is_none() {
                        first_error = Some(SynthError::task("semaphore closed"));
                    }
                    break;
                }
            };
            if cancel.is_cancelled() {
                // A sibling already failed; keep the segment unprocessed.
                slots[index] = Some(segment);
                continue;
            }
            let stages = Arc::clone(&self.stages);
            let ctx = Arc::clone(&ctx);
            let cancel = cancel.clone();
            let _ = tasks.spawn(async move {
                let _permit = permit;
                let mut segment = segment;
                for stage in stages.iter() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Err(err) = stage.process(&mut segment, &ctx).await {
                        cancel.cancel();
                        return (index, segment, Some(err));
                    }
                }
                (index, segment, None)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, segment, err)) => {
                    slots[index] = Some(segment);
                    if let Some(err) = err {
                        if first_error.is_none() {
                            warn!(segment = index, error = %err, "segment task failed");
                            first_error = Some(err);
                        }
                    }
                }
                Err(join_err) => {
                    cancel.cancel();
                    if first_error.is_none() {
                        first_error = Some(SynthError::task(join_err.to_string()));
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(SynthError::partial_tasks(err));
        }
        let mut out = Vec::with_capacity(total);
        for slot in slots {
            out.push(slot.ok_or_else(|| SynthError::task("segment result missing"))?);
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordStage for SegmentPool {
    fn name(&self) -> &'static str {
        "segment_pool"
    }

    async fn process(&self, record: &mut Utterance) -> Result<()> {
        let segments = mem::take(&mut record.segments);
        let ctx = SegmentContext::from_record(record);
        record.segments = self.run(segments, ctx).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
