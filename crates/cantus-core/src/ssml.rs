//! Structured-input (SSML) part shapes consumed by the engine.
//!
//! XML parsing happens outside this workspace; the parser hands the engine an
//! ordered list of [`SsmlPart`] values which the pipeline folds into child
//! working records (see `cantus-synth`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One parsed structured-input unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SsmlPart {
    /// Synthesizable text under one voice.
    Text(SsmlText),
    /// An explicit silence.
    Pause(SsmlPause),
}

/// A text part: one voice, one speed, one or more text chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsmlText {
    /// Voice requested for this part.
    #[serde(default)]
    pub voice: String,
    /// Speed multiplier for this part, 1.0 = neutral.
    #[serde(default)]
    pub speed: f32,
    /// The literal text chunks of the part, in document order.
    pub chunks: Vec<TextChunk>,
}

/// One contiguous run of text inside a text part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    /// The plain text.
    pub text: String,
    /// Pre-accented rendering supplied by the document, when present.
    #[serde(default)]
    pub accented: Option<String>,
    /// Silence to insert after this chunk (small pauses merge here).
    #[serde(default)]
    pub pause_after: Duration,
}

impl TextChunk {
    /// A plain chunk with no accents and no trailing pause.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            accented: None,
            pause_after: Duration::ZERO,
        }
    }
}

/// A pause part with its requested duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsmlPause {
    /// Requested silence length.
    pub duration: Duration,
}
