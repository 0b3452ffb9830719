//! Text cleaning via the cleaner service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cantus_core::Result;
use cantus_core::api::ValidationFailure;
use cantus_core::record::{SynthesisMode, Utterance};
use cantus_synth::RecordStage;

use crate::http::ServiceClient;

#[derive(Debug, Serialize)]
struct CleanRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CleanReply {
    #[serde(default)]
    text: String,
}

/// Strips unspeakable characters through the cleaner service.
///
/// Structured records are cleaned chunk by chunk; pre-accented chunks carry
/// caller-authored markup and bypass the service verbatim. A record whose
/// every entry cleans down to nothing is rejected as having no text.
#[derive(Debug, Clone)]
pub struct Cleaner {
    client: ServiceClient,
}

impl Cleaner {
    /// A cleaner stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    async fn clean(&self, text: &str) -> Result<String> {
        let reply: CleanReply = self.client.invoke_json(&CleanRequest { text }).await?;
        Ok(reply.text)
    }
}

#[async_trait]
impl RecordStage for Cleaner {
    fn name(&self) -> &'static str {
        "cleaner"
    }

    #[instrument(skip_all, fields(request_id = %record.request_id))]
    async fn process(&self, record: &mut Utterance) -> Result<()> {
        if record.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        let mut cleaned = Vec::new();
        if record.text_chunks.is_empty() {
            cleaned.push(self.clean(&record.original_text).await?);
        } else {
            for chunk in &record.text_chunks {
                match &chunk.accented {
                    Some(accented) => cleaned.push(accented.clone()),
                    None => cleaned.push(self.clean(&chunk.text).await?),
                }
            }
        }
        if cleaned.iter().all(|text| text.trim().is_empty()) {
            record.reject(ValidationFailure::check("no_text", 0));
        }
        record.cleaned_text = cleaned;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
