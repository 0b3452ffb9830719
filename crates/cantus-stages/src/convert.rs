//! Audio conversion: joined WAV into the requested output format.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cantus_core::api::AudioFormat;
use cantus_core::record::Utterance;
use cantus_core::{Result, SynthError};
use cantus_synth::RecordStage;

use crate::http::ServiceClient;

#[derive(Debug, Serialize)]
struct ConvertRequest<'a> {
    audio: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConvertReply {
    #[serde(default)]
    audio: String,
}

/// Format conversion through the audio converter service. WAV output skips
/// the call entirely.
#[derive(Debug, Clone)]
pub struct AudioConverter {
    client: ServiceClient,
}

impl AudioConverter {
    /// A conversion stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStage for AudioConverter {
    fn name(&self) -> &'static str {
        "audio_converter"
    }

    #[instrument(skip_all, fields(format = record.request.output_format.as_str()))]
    async fn process(&self, record: &mut Utterance) -> Result<()> {
        let format = record.request.output_format;
        if format == AudioFormat::Wav {
            record.final_audio = record.joined_audio.clone();
            return Ok(());
        }
        let encoded = STANDARD.encode(record.joined_audio.as_deref().unwrap_or_default());
        let reply: ConvertReply = self
            .client
            .invoke_json(&ConvertRequest {
                audio: &encoded,
                format: format.as_str(),
            })
            .await?;
        let decoded = STANDARD.decode(&reply.audio).map_err(|err| {
            SynthError::bad_response(self.client.service(), format!("audio payload: {err}"))
        })?;
        record.final_audio = Some(decoded);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
