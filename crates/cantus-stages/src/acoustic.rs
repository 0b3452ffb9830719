//! Acoustic model: frame text in, spectrogram out.
//!
//! The frame is the segment's transcriptions joined with pause markers where
//! the prosody needs them: a leading pause for the first segment, spoken
//! punctuation kept inline, a pause after every sentence break and one at the
//! end of the segment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cantus_core::record::{Segment, SynthesisMode};
use cantus_core::token::Token;
use cantus_core::Result;
use cantus_synth::{SegmentContext, SegmentStage};

use crate::http::ServiceClient;

/// Pause marker in the acoustic model's frame alphabet.
const PAUSE: &str = "<space>";

/// Separators the model speaks as prosodic cues.
const SPOKEN_SEPARATORS: [&str; 5] = [",", ".", "!", "?", "..."];

/// Separators that additionally end a breath group.
const SENTENCE_BREAKS: [&str; 4] = [".", "!", "?", "..."];

#[derive(Debug, Serialize)]
struct AcousticRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f32,
}

#[derive(Debug, Deserialize)]
struct AcousticReply {
    #[serde(default)]
    data: String,
}

/// Spectrogram synthesis through the acoustic model service.
#[derive(Debug, Clone)]
pub struct AcousticModel {
    client: ServiceClient,
}

impl AcousticModel {
    /// An acoustic model stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SegmentStage for AcousticModel {
    fn name(&self) -> &'static str {
        "acoustic_model"
    }

    #[instrument(skip_all, fields(voice = %ctx.voice))]
    async fn process(&self, segment: &mut Segment, ctx: &SegmentContext) -> Result<()> {
        let frame = if ctx.mode == SynthesisMode::AcousticOnly {
            segment.text.clone().unwrap_or_default()
        } else {
            frame_text(segment)
        };
        segment.transcribed = Some(frame.clone());
        let reply: AcousticReply = self
            .client
            .invoke_json(&AcousticRequest {
                text: &frame,
                voice: &ctx.voice,
                speed: ctx.speed,
            })
            .await?;
        segment.spectrogram = Some(reply.data);
        Ok(())
    }
}

fn frame_text(segment: &Segment) -> String {
    let mut pieces: Vec<&str> = Vec::new();
    if segment.first {
        pieces.push(PAUSE);
    }
    for annotated in &segment.tokens {
        match &annotated.token {
            Token::Word { .. } => {
                if let Some(transcription) = &annotated.transcription {
                    pieces.extend(transcription.split_whitespace().filter(|p| *p != "-"));
                }
            }
            Token::Separator(sep) => {
                let sep = sep.as_str();
                if SPOKEN_SEPARATORS.contains(&sep) {
                    pieces.push(sep);
                }
                if SENTENCE_BREAKS.contains(&sep) {
                    pieces.push(PAUSE);
                }
            }
            Token::SentenceEnd => {
                if pieces.last() != Some(&PAUSE) {
                    pieces.push(".");
                    pieces.push(PAUSE);
                }
            }
            Token::Space => {}
        }
    }
    if pieces.last() != Some(&PAUSE) {
        pieces.push(PAUSE);
    }
    pieces.join(" ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
