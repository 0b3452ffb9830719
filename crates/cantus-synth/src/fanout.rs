//! Fan-out over structured-input child records.
//!
//! Text children run the held stage list exactly as a top-level record
//! would, strictly in document order; pause children pass through untouched.
//! A child's validation failure lifts onto the parent and ends the fan-out,
//! so the pipeline's own short-circuit sees it.

use std::mem;

use async_trait::async_trait;
use tracing::{debug, warn};

use cantus_core::Result;
use cantus_core::record::{Utterance, UtteranceKind};

use crate::stage::RecordStage;

/// Applies a stage list to each text child of a structured record.
pub struct SsmlFanout {
    stages: Vec<Box<dyn RecordStage>>,
}

impl SsmlFanout {
    /// A fan-out over the given per-child stage list.
    #[must_use]
    pub fn new(stages: Vec<Box<dyn RecordStage>>) -> Self {
        Self { stages }
    }
}

#[async_trait]
impl RecordStage for SsmlFanout {
    fn name(&self) -> &'static str {
        "ssml_fanout"
    }

    async fn process(&self, record: &mut Utterance) -> Result<()> {
        for i in 0..record.children.len() {
            let child = &mut record.children[i];
            if child.kind != UtteranceKind::SsmlText {
                continue;
            }
            for stage in &self.stages {
                if let Err(err) = stage.process(child).await {
                    warn!(stage = stage.name(), child = i, error = %err, "child stage failed");
                    return Err(err);
                }
                if child.is_rejected() {
                    break;
                }
            }
            if child.is_rejected() {
                debug!(child = i, "child validation stopped the fan-out");
                let failures = mem::take(&mut child.validation_failures);
                record.validation_failures.extend(failures);
                break;
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
