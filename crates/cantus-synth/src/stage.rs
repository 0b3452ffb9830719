//! Stage traits, the seams between the orchestration core and the workers.
//!
//! Whole-record stages run strictly in order on the calling task. Segment
//! stages run inside pool worker tasks, one segment per task. Both kinds are
//! injected at construction time; the core never names a concrete stage.

use async_trait::async_trait;

use cantus_core::Result;
use cantus_core::record::{Segment, SynthesisMode, Utterance};

/// A stage operating on the whole record, run sequentially by the pipeline.
#[async_trait]
pub trait RecordStage: Send + Sync {
    /// Stable stage name for logs.
    fn name(&self) -> &'static str;

    /// Process the record in place.
    async fn process(&self, record: &mut Utterance) -> Result<()>;
}

/// A stage operating on one segment, run inside a pool worker task.
#[async_trait]
pub trait SegmentStage: Send + Sync {
    /// Stable stage name for logs.
    fn name(&self) -> &'static str;

    /// Process the segment in place.
    async fn process(&self, segment: &mut Segment, ctx: &SegmentContext) -> Result<()>;
}

/// Read-only record fields a segment stage may consult.
///
/// Captured from the record before the pool moves segments into worker
/// tasks, so tasks never borrow the record itself.
#[derive(Debug, Clone)]
pub struct SegmentContext {
    /// Pipeline mode, consulted by stage skip checks.
    pub mode: SynthesisMode,
    /// Voice the acoustic stages synthesize with.
    pub voice: String,
    /// Speed multiplier.
    pub speed: f32,
}

impl SegmentContext {
    /// Capture the segment-relevant fields of a record.
    #[must_use]
    pub fn from_record(record: &Utterance) -> Self {
        Self {
            mode: record.mode,
            voice: record.voice.clone(),
            speed: record.speed,
        }
    }
}

impl Default for SegmentContext {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::Full,
            voice: String::new(),
            speed: 1.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
