//! # cantus-core
//!
//! Foundation types and utilities shared by every Cantus crate.
//!
//! This crate provides the vocabulary of the synthesis pipeline:
//!
//! - **Tokens**: [`Token`] enum (word / separator / sentence-end / space) and
//!   the [`AnnotatedToken`] wrapper that downstream stages annotate
//! - **Working record**: [`Utterance`] threaded through the pipeline, and
//!   [`Segment`] as the unit of concurrent work
//! - **Public API shapes**: [`SynthesisRequest`], [`SynthesisResult`],
//!   validation failures
//! - **Errors**: [`SynthError`] hierarchy via `thiserror`
//! - **Accent rendering**: inline accent-marker encoding and decoding
//! - **WAV assembly**: canonical-header RIFF helpers for joining segment audio
//! - **Retry math**: backoff parameters and delay calculation for stage HTTP
//!   clients

pub mod accent;
pub mod api;
pub mod error;
pub mod logging;
pub mod record;
pub mod retry;
pub mod ssml;
pub mod token;
pub mod wav;

pub use api::{AudioFormat, Check, SynthesisRequest, SynthesisResult, TextFormat, ValidationFailure};
pub use error::{Result, SynthError};
pub use record::{Segment, SynthesisMode, Utterance, UtteranceKind};
pub use retry::RetryConfig;
pub use ssml::{SsmlPart, SsmlPause, SsmlText, TextChunk};
pub use token::{AccentVariant, AnnotatedToken, Clitic, CliticKind, Token};
pub use wav::WavError;
