//! Audio join: one WAV from every segment's audio.
//!
//! Plain records concatenate their segments' decoded audio in index order.
//! Structured records walk their children instead, materializing pause
//! children and trailing chunk pauses as silence clips in the format of the
//! audio already joined.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{instrument, warn};

use cantus_core::record::{Segment, Utterance, UtteranceKind};
use cantus_core::wav::{self, WavError};
use cantus_core::{Result, SynthError};
use cantus_synth::RecordStage;

/// Requested pauses are clamped here.
const MAX_PAUSE: Duration = Duration::from_secs(10);

/// Local assembly of the segments' audio into one WAV.
#[derive(Debug, Clone, Default)]
pub struct AudioJoiner;

impl AudioJoiner {
    /// A join stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordStage for AudioJoiner {
    fn name(&self) -> &'static str {
        "audio_joiner"
    }

    #[instrument(skip_all, fields(request_id = %record.request_id))]
    async fn process(&self, record: &mut Utterance) -> Result<()> {
        let parts = if record.kind == UtteranceKind::SsmlRoot {
            ssml_parts(record)?
        } else {
            decoded_segments(&record.segments)?
        };
        record.joined_audio = Some(wav::join(&parts)?);
        Ok(())
    }
}

fn decoded_segments(segments: &[Segment]) -> Result<Vec<Vec<u8>>> {
    segments
        .iter()
        .map(|segment| {
            STANDARD
                .decode(segment.audio.as_deref().unwrap_or_default())
                .map_err(|err| {
                    SynthError::bad_response("vocoder", format!("audio payload: {err}"))
                })
        })
        .collect()
}

fn ssml_parts(record: &Utterance) -> Result<Vec<Vec<u8>>> {
    let mut parts: Vec<Vec<u8>> = Vec::new();
    for child in &record.children {
        match child.kind {
            UtteranceKind::SsmlText => {
                parts.extend(decoded_segments(&child.segments)?);
                let trailing: Duration = child.text_chunks.iter().map(|c| c.pause_after).sum();
                if !trailing.is_zero() {
                    let clip = silence(&parts, trailing)?;
                    parts.push(clip);
                }
            }
            UtteranceKind::SsmlPause => {
                let clip = silence(&parts, child.pause_duration)?;
                parts.push(clip);
            }
            _ => {}
        }
    }
    Ok(parts)
}

/// Silence in the format of the audio joined so far.
fn silence(parts: &[Vec<u8>], duration: Duration) -> Result<Vec<u8>> {
    let template = parts.first().ok_or(WavError::PauseBeforeAudio)?;
    let duration = if duration > MAX_PAUSE {
        warn!(requested = ?duration, "pause clamped");
        MAX_PAUSE
    } else {
        duration
    };
    Ok(wav::silence(template, duration)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
