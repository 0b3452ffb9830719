//! Vocoder: spectrogram in, audio out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cantus_core::Result;
use cantus_core::record::Segment;
use cantus_synth::{SegmentContext, SegmentStage};

use crate::http::ServiceClient;

#[derive(Debug, Serialize)]
struct VocoderRequest<'a> {
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct VocoderReply {
    #[serde(default)]
    data: String,
}

/// Waveform synthesis through the vocoder service.
#[derive(Debug, Clone)]
pub struct Vocoder {
    client: ServiceClient,
}

impl Vocoder {
    /// A vocoder stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SegmentStage for Vocoder {
    fn name(&self) -> &'static str {
        "vocoder"
    }

    #[instrument(skip_all)]
    async fn process(&self, segment: &mut Segment, _ctx: &SegmentContext) -> Result<()> {
        let reply: VocoderReply = self
            .client
            .invoke_json(&VocoderRequest {
                data: segment.spectrogram.as_deref().unwrap_or_default(),
            })
            .await?;
        segment.audio = Some(reply.data);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
