//! The working record threaded through the pipeline, and the segment as the
//! unit of concurrent work.
//!
//! An [`Utterance`] is created fresh per request, mutated in place by the
//! ordered whole-record stages, and discarded when the request finishes. It
//! is never shared across requests and never persisted. Segments are carved
//! out of the record's token sequence once, by the segmenter, and each is
//! exclusively owned by one worker task while the segment pool runs.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::api::{SynthesisRequest, ValidationFailure};
use crate::ssml::{SsmlPart, TextChunk};
use crate::token::AnnotatedToken;

/// Longest pause that may be folded into the preceding text part instead of
/// becoming a standalone pause record.
const MAX_MERGED_PAUSE: Duration = Duration::from_millis(1000);

// ─────────────────────────────────────────────────────────────────────────────
// Modes and kinds
// ─────────────────────────────────────────────────────────────────────────────

/// How much of the pipeline a record goes through.
///
/// Decoded exactly once, at the pipeline boundary, from the reserved input
/// prefix. Stages consult the flag through their own skip checks; nothing
/// downstream looks at the raw prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynthesisMode {
    /// The full stage chain.
    #[default]
    Full,
    /// Text preparation is skipped; the input goes to the acoustic model as
    /// already-transcribed frames.
    AcousticOnly,
}

/// Structural role of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UtteranceKind {
    /// Plain-text request.
    #[default]
    Plain,
    /// Root of a structured request; its children carry the content.
    SsmlRoot,
    /// Synthesizable text child of a structured request.
    SsmlText,
    /// Silence child of a structured request.
    SsmlPause,
}

// ─────────────────────────────────────────────────────────────────────────────
// Segment
// ─────────────────────────────────────────────────────────────────────────────

/// A contiguous slice of the token sequence processed as one unit of
/// concurrent work.
///
/// Created once by the segmenter and never resized. Artifacts accumulate on
/// the segment as the segment stages run; no stage may touch a sibling
/// segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    /// The tokens of this segment, moved out of the record.
    pub tokens: Vec<AnnotatedToken>,
    /// Whether this is the first segment of the request. Downstream acoustic
    /// framing prepends a leading silence for the first segment.
    pub first: bool,
    /// Raw input text, only set in acoustic-only mode (no tokens then).
    pub text: Option<String>,
    /// Frame text sent to the acoustic model, kept for transcribed output.
    pub transcribed: Option<String>,
    /// Base64 spectrogram returned by the acoustic model.
    pub spectrogram: Option<String>,
    /// Base64 audio returned by the vocoder.
    pub audio: Option<String>,
}

impl Segment {
    /// A segment over a token slice.
    #[must_use]
    pub fn new(tokens: Vec<AnnotatedToken>, first: bool) -> Self {
        Self {
            tokens,
            first,
            ..Self::default()
        }
    }

    /// The single raw-text segment used in acoustic-only mode.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            first: true,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Word tokens of this segment.
    pub fn words(&self) -> impl Iterator<Item = &AnnotatedToken> {
        self.tokens.iter().filter(|t| t.token.is_word())
    }

    /// Mutable word tokens of this segment.
    pub fn words_mut(&mut self) -> impl Iterator<Item = &mut AnnotatedToken> {
        self.tokens.iter_mut().filter(|t| t.token.is_word())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Utterance
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request mutable state threaded through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Utterance {
    /// The request this record answers. Shared with child records.
    pub request: Arc<SynthesisRequest>,
    /// Request ID: the caller's, or freshly allocated.
    pub request_id: String,
    /// Input text after boundary decoding (custom-code prefix stripped).
    pub original_text: String,
    /// Pipeline mode decoded at the boundary.
    pub mode: SynthesisMode,
    /// Structural role.
    pub kind: UtteranceKind,
    /// Voice for the acoustic stages.
    pub voice: String,
    /// Speed multiplier.
    pub speed: f32,
    /// Silence length, meaningful only for pause records.
    pub pause_duration: Duration,
    /// Source chunks for structured text records.
    pub text_chunks: Vec<TextChunk>,
    /// Text after the cleaning stage, one entry per source chunk.
    pub cleaned_text: Vec<String>,
    /// Text after number expansion, one entry per source chunk.
    pub text_with_numbers: Vec<String>,
    /// Token sequence produced by tagging.
    pub tokens: Vec<AnnotatedToken>,
    /// Segments produced by the segmenter, artifacts filled by the pool.
    pub segments: Vec<Segment>,
    /// Joined WAV assembled from segment audio.
    pub joined_audio: Option<Vec<u8>>,
    /// Audio after format conversion; what the result carries.
    pub final_audio: Option<Vec<u8>>,
    /// Failed validation checks; any entry short-circuits the pipeline.
    pub validation_failures: Vec<ValidationFailure>,
    /// Child records for structured input, in document order.
    pub children: Vec<Utterance>,
}

impl Utterance {
    /// Fresh record for a request, allocating a request ID when the caller
    /// supplied none.
    #[must_use]
    pub fn new(request: Arc<SynthesisRequest>) -> Self {
        let request_id = allocated_id(&request);
        Self {
            original_text: request.text.clone(),
            voice: request.voice.clone(),
            speed: request.speed,
            request_id,
            request,
            ..Self::default()
        }
    }

    /// Record a failed validation check.
    pub fn reject(&mut self, failure: ValidationFailure) {
        self.validation_failures.push(failure);
    }

    /// Whether any validation check has failed.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        !self.validation_failures.is_empty()
    }

    /// Whether the text entry at `index` came from a pre-accented source
    /// chunk. Fixed entries pass through the text stages untouched.
    #[must_use]
    pub fn chunk_is_fixed(&self, index: usize) -> bool {
        self.text_chunks
            .get(index)
            .is_some_and(|chunk| chunk.accented.is_some())
    }

    /// Fold parsed structured-input parts into child records.
    ///
    /// Consecutive text parts under the same voice collapse into one child;
    /// a pause of at most one second folds into the previous text child's
    /// trailing chunk instead of opening a pause child.
    #[must_use]
    pub fn from_ssml_parts(request: &Arc<SynthesisRequest>, parts: &[SsmlPart]) -> Vec<Self> {
        let mut children: Vec<Self> = Vec::new();
        for part in parts {
            match part {
                SsmlPart::Text(text) => {
                    match children.last_mut() {
                        Some(last)
                            if last.kind == UtteranceKind::SsmlText && last.voice == text.voice =>
                        {
                            last.text_chunks.extend(text.chunks.iter().cloned());
                        }
                        _ => children.push(Self::ssml_text_child(request, text)),
                    }
                }
                SsmlPart::Pause(pause) => {
                    if pause.duration <= MAX_MERGED_PAUSE {
                        if let Some(chunk) = children
                            .last_mut()
                            .filter(|c| c.kind == UtteranceKind::SsmlText)
                            .and_then(|c| c.text_chunks.last_mut())
                        {
                            chunk.pause_after += pause.duration;
                            continue;
                        }
                    }
                    children.push(Self::ssml_pause_child(pause.duration));
                }
            }
        }
        children
    }

    fn ssml_text_child(request: &Arc<SynthesisRequest>, text: &crate::ssml::SsmlText) -> Self {
        Self {
            request_id: allocated_id(request),
            request: Arc::clone(request),
            kind: UtteranceKind::SsmlText,
            voice: text.voice.clone(),
            speed: if text.speed > 0.0 {
                text.speed
            } else {
                request.speed
            },
            text_chunks: text.chunks.clone(),
            ..Self::default()
        }
    }

    fn ssml_pause_child(duration: Duration) -> Self {
        Self {
            kind: UtteranceKind::SsmlPause,
            pause_duration: duration,
            ..Self::default()
        }
    }
}

fn allocated_id(request: &SynthesisRequest) -> String {
    if request.request_id.is_empty() {
        Uuid::now_v7().to_string()
    } else {
        request.request_id.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
