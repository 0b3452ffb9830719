//! Pipeline orchestration for the Cantus TTS engine.
//!
//! This crate holds the engine's moving parts, none of which know a concrete
//! stage:
//!
//! - [`pipeline::Synthesizer`]: the sequential whole-record pipeline
//! - [`segmenter`]: cutting the token sequence into bounded segments
//! - [`pool::SegmentPool`]: bounded concurrent execution of segment stages
//! - [`fanout::SsmlFanout`]: per-child execution for structured input
//! - [`cache::ResultCache`]: whole-pipeline result caching
//!
//! Concrete stages implement the [`stage`] traits and are wired in by the
//! `cantus-stages` crate.

pub mod cache;
pub mod fanout;
pub mod pipeline;
pub mod pool;
pub mod segmenter;
pub mod stage;

pub use cache::{CachedSynthesizer, ResultCache};
pub use fanout::SsmlFanout;
pub use pipeline::Synthesizer;
pub use pool::SegmentPool;
pub use segmenter::Segmenter;
pub use stage::{RecordStage, SegmentContext, SegmentStage};
