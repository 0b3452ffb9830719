//! Number expansion via the number-replacement service.

use async_trait::async_trait;
use tracing::instrument;

use cantus_core::Result;
use cantus_core::record::{SynthesisMode, Utterance};
use cantus_synth::RecordStage;

use crate::http::ServiceClient;

/// Expands digits into number words.
///
/// The service takes the raw text body and answers with a JSON string. The
/// result lands in `text_with_numbers`; the cleaned entries stay as they
/// were for the normalized-text output. Pre-accented entries carry over
/// unchanged.
#[derive(Debug, Clone)]
pub struct NumberReplacer {
    client: ServiceClient,
}

impl NumberReplacer {
    /// A number-replacement stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStage for NumberReplacer {
    fn name(&self) -> &'static str {
        "number_replacer"
    }

    #[instrument(skip_all, fields(request_id = %record.request_id))]
    async fn process(&self, record: &mut Utterance) -> Result<()> {
        if record.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        let mut expanded = Vec::with_capacity(record.cleaned_text.len());
        for (i, text) in record.cleaned_text.iter().enumerate() {
            if record.chunk_is_fixed(i) {
                expanded.push(text.clone());
            } else {
                expanded.push(self.client.invoke_text::<String>(text).await?);
            }
        }
        record.text_with_numbers = expanded;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
