//! Concrete pipeline stages for the Cantus TTS engine.
//!
//! Each stage implements one of the `cantus-synth` stage traits and owns its
//! own service client where it talks HTTP. [`pipeline::build`] wires them
//! into a ready synthesizer from [`cantus_settings::Settings`].
//!
//! Whole-record stages, in wiring order: [`Validator`], [`Cleaner`],
//! [`UrlReplacer`], [`Normalizer`], [`NumberReplacer`], [`Tagger`], then the
//! segmenter and pool from `cantus-synth`, [`AudioJoiner`], and
//! [`AudioConverter`]. Segment stages: [`Accentuator`], [`Transcriber`],
//! [`AcousticModel`], [`Vocoder`].

pub mod accentuate;
pub mod acoustic;
pub mod clean;
pub mod convert;
pub mod http;
pub mod join;
pub mod normalize;
pub mod numbers;
pub mod pipeline;
pub mod tag;
pub mod transcribe;
pub mod urls;
pub mod validate;
pub mod vocode;

pub use accentuate::Accentuator;
pub use acoustic::AcousticModel;
pub use clean::Cleaner;
pub use convert::AudioConverter;
pub use http::ServiceClient;
pub use join::AudioJoiner;
pub use normalize::Normalizer;
pub use numbers::NumberReplacer;
pub use tag::Tagger;
pub use transcribe::Transcriber;
pub use urls::UrlReplacer;
pub use validate::Validator;
pub use vocode::Vocoder;
