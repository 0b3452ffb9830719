//! Error hierarchy for the synthesis pipeline.
//!
//! One central enum, [`SynthError`], covers every failure domain of the
//! engine and its stages:
//!
//! - external service failures (transport, non-2xx status, undecodable body)
//! - cross-reference mismatches between stage input and output
//! - segmentation failures (budget cannot fit an atomic token run)
//! - worker-pool aggregation (first segment failure, wrapped)
//! - accent-code decoding failures
//!
//! Validation failures are deliberately *not* errors. They are recorded on
//! the working record and short-circuit the pipeline into a success-shaped
//! result (see [`crate::record::Utterance::reject`]).

use thiserror::Error;

use crate::wav::WavError;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, SynthError>;

// ─────────────────────────────────────────────────────────────────────────────
// SynthError
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type for the synthesis pipeline.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Tagging produced no word tokens, so there is nothing to synthesize.
    #[error("no input")]
    NoInput,

    /// An external service could not be reached.
    #[error("service '{service}' call failed")]
    Transport {
        /// Logical service name (e.g. `tagger`).
        service: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An external service answered with a non-success status.
    #[error("service '{service}' returned status {status}")]
    Service {
        /// Logical service name.
        service: String,
        /// HTTP status code.
        status: u16,
    },

    /// An external service answered 2xx but the body did not decode.
    #[error("service '{service}' returned an unreadable response: {detail}")]
    BadResponse {
        /// Logical service name.
        service: String,
        /// What failed to decode.
        detail: String,
    },

    /// An external service answered with an in-band error.
    #[error("service '{service}' refused: {detail}")]
    Refused {
        /// Logical service name.
        service: String,
        /// The service's own error text.
        detail: String,
    },

    /// Stage output does not line up with stage input.
    #[error("response does not match input: '{expected}' vs '{got}'")]
    Mismatch {
        /// The value the stage sent.
        expected: String,
        /// The value the service answered with.
        got: String,
    },

    /// The segmentation budget cannot accommodate an atomic run of tokens.
    #[error("can't split into sequences no longer than {max_chars} chars")]
    SegmentTooLong {
        /// The configured budget that was exceeded.
        max_chars: usize,
    },

    /// First failure observed by the segment worker pool.
    #[error("failed to process partial tasks: {source}")]
    PartialTasks {
        /// The failing segment's own error.
        #[source]
        source: Box<SynthError>,
    },

    /// A spawned segment task ended abnormally (panic or abort).
    #[error("segment task failed: {message}")]
    Task {
        /// Join failure description.
        message: String,
    },

    /// An accent code outside the renderable range.
    #[error("wrong accent {code} for '{word}'")]
    BadAccent {
        /// The word being rendered.
        word: String,
        /// The offending accent code.
        code: i32,
    },

    /// Malformed audio payload.
    #[error("invalid audio: {0}")]
    Audio(#[from] WavError),

    /// A component was constructed with unusable parameters.
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
}

impl SynthError {
    /// Transport-level failure for a named service.
    #[must_use]
    pub fn transport(
        service: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            service: service.into(),
            source: Box::new(source),
        }
    }

    /// Undecodable response for a named service.
    #[must_use]
    pub fn bad_response(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::BadResponse {
            service: service.into(),
            detail: detail.into(),
        }
    }

    /// In-band refusal from a named service.
    #[must_use]
    pub fn refused(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Refused {
            service: service.into(),
            detail: detail.into(),
        }
    }

    /// Construction-time configuration failure.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap a segment failure as the pool's aggregate error.
    #[must_use]
    pub fn partial_tasks(source: SynthError) -> Self {
        Self::PartialTasks {
            source: Box::new(source),
        }
    }

    /// Abnormal segment task termination (panic or closed pool).
    #[must_use]
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
