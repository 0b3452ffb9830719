//! Input validation, the first whole-record stage.

use async_trait::async_trait;
use tracing::debug;

use cantus_core::Result;
use cantus_core::api::ValidationFailure;
use cantus_core::record::{SynthesisMode, Utterance};
use cantus_synth::RecordStage;

/// Checks the raw input before any service is called.
///
/// Failed checks are recorded on the record, not raised: the pipeline stops
/// and answers with a success-shaped result naming them.
#[derive(Debug, Clone)]
pub struct Validator {
    max_chars: usize,
}

impl Validator {
    /// A validator with the given character budget for the whole input.
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl RecordStage for Validator {
    fn name(&self) -> &'static str {
        "validator"
    }

    async fn process(&self, record: &mut Utterance) -> Result<()> {
        if record.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        if record.original_text.trim().is_empty() {
            record.reject(ValidationFailure::check("no_text", 0));
            return Ok(());
        }
        let len = record.original_text.chars().count();
        if len > self.max_chars {
            debug!(len, max_chars = self.max_chars, "input over budget");
            record.reject(ValidationFailure::check(
                "max_text_len",
                i64::try_from(self.max_chars).unwrap_or(i64::MAX),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cantus_core::api::SynthesisRequest;

    use super::*;

    fn record(text: &str) -> Utterance {
        Utterance::new(Arc::new(SynthesisRequest::text(text)))
    }

    #[tokio::test]
    async fn accepts_text_within_budget() {
        let mut record = record("labas rytas");
        Validator::new(100).process(&mut record).await.unwrap();
        assert!(!record.is_rejected());
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let mut record = record("");
        Validator::new(100).process(&mut record).await.unwrap();
        assert_eq!(record.validation_failures.len(), 1);
        assert_eq!(record.validation_failures[0].check.id, "no_text");
    }

    #[tokio::test]
    async fn rejects_whitespace_only_input() {
        let mut record = record(" \t\n ");
        Validator::new(100).process(&mut record).await.unwrap();
        assert_eq!(record.validation_failures[0].check.id, "no_text");
    }

    #[tokio::test]
    async fn rejects_input_over_budget() {
        let mut record = record(&"a".repeat(11));
        Validator::new(10).process(&mut record).await.unwrap();
        assert_eq!(record.validation_failures.len(), 1);
        assert_eq!(record.validation_failures[0].check.id, "max_text_len");
        assert_eq!(record.validation_failures[0].check.value, 10);
    }

    #[tokio::test]
    async fn budget_counts_chars_not_bytes() {
        // five letters, ten bytes
        let mut record = record("ąąąąą");
        Validator::new(5).process(&mut record).await.unwrap();
        assert!(!record.is_rejected());
    }

    #[tokio::test]
    async fn skips_acoustic_only_records() {
        let mut record = record("");
        record.mode = SynthesisMode::AcousticOnly;
        Validator::new(100).process(&mut record).await.unwrap();
        assert!(!record.is_rejected());
    }
}
