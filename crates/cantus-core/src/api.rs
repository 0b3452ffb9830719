//! Public request and result shapes.
//!
//! These are the types the (out-of-scope) HTTP front-end maps its wire
//! payloads onto. The engine itself is a library: it consumes a
//! [`SynthesisRequest`] and produces a [`SynthesisResult`].

use serde::{Deserialize, Serialize};

use crate::ssml::SsmlPart;

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Requested shape of the textual part of the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextFormat {
    /// No text in the result.
    #[default]
    None,
    /// The normalized text (after number expansion), space-joined.
    Normalized,
    /// The accented text with inline accent markers.
    Accented,
    /// The phonetic transcription sent to the acoustic model.
    Transcribed,
}

/// Requested audio container/encoding of the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioFormat {
    /// MPEG layer 3 (converted by the audio converter service).
    #[default]
    Mp3,
    /// MPEG-4 audio (converted by the audio converter service).
    M4a,
    /// Raw joined WAV, no conversion.
    Wav,
}

impl AudioFormat {
    /// Converter-service format identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Wav => "wav",
        }
    }
}

/// One synthesis request as handed to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    /// The input text. May carry the reserved custom-code prefix when the
    /// deployment opts in.
    pub text: String,
    /// Voice identifier forwarded to the acoustic stages.
    #[serde(default)]
    pub voice: String,
    /// Speed multiplier, 1.0 = neutral.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Requested audio container.
    #[serde(default)]
    pub output_format: AudioFormat,
    /// Requested textual part of the result.
    #[serde(default)]
    pub output_text_format: TextFormat,
    /// Caller permits persisting request data; gates the request ID echo.
    #[serde(default)]
    pub allow_collect_data: bool,
    /// Caller-supplied request ID; the engine allocates one when empty.
    #[serde(default)]
    pub request_id: String,
    /// Pre-parsed structured input. Empty for plain-text requests.
    #[serde(default)]
    pub ssml_parts: Vec<SsmlPart>,
}

fn default_speed() -> f32 {
    1.0
}

impl SynthesisRequest {
    /// Plain-text request with defaults everywhere else.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speed: 1.0,
            ..Self::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result
// ─────────────────────────────────────────────────────────────────────────────

/// One validation check identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// Check identifier, e.g. `no_text`, `max_text_len`.
    pub id: String,
    /// The configured limit the input failed against, when meaningful.
    #[serde(default)]
    pub value: i64,
}

/// One failed validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    /// The fragment of input that failed, when the check can point at one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub failing_text: String,
    /// Position of the failing fragment, when meaningful.
    #[serde(default)]
    pub failing_position: i32,
    /// Which check failed.
    pub check: Check,
}

impl ValidationFailure {
    /// Failure carrying only a check id and limit.
    #[must_use]
    pub fn check(id: impl Into<String>, value: i64) -> Self {
        Self {
            failing_text: String::new(),
            failing_position: 0,
            check: Check {
                id: id.into(),
                value,
            },
        }
    }
}

/// The engine's answer for one request.
///
/// `audio` and `validation_failures` are mutually exclusive: any recorded
/// failure means synthesis stopped at validation and no audio was produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResult {
    /// Base64-encoded audio in the requested format.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub audio: String,
    /// Textual part per the requested [`TextFormat`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Request ID, echoed only when data collection was allowed.
    #[serde(default, rename = "requestID", skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    /// Failed validation checks, empty on success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_failures: Vec<ValidationFailure>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
