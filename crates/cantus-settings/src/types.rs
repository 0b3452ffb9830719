//! Settings type definitions with compiled defaults.
//!
//! Every struct carries `#[serde(default)]` so a partial TOML file or a
//! single environment variable override deserializes against the compiled
//! defaults instead of failing.

use cantus_core::RetryConfig;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default character budget for one segment.
pub const DEFAULT_MAX_CHARS: usize = 400;
/// Default segment pool concurrency (`0` in settings means "use this").
pub const DEFAULT_WORKERS: usize = 3;
/// Default per-service HTTP timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Root settings for the synthesis pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pipeline-level knobs (segmentation, concurrency, custom input).
    pub synthesis: SynthesisSettings,
    /// External service endpoints, one per HTTP stage.
    pub services: ServiceSettings,
    /// Backoff policy shared by all HTTP stages.
    pub retry: RetryConfig,
    /// Whole-result cache.
    pub cache: CacheSettings,
}

/// Pipeline-level synthesis settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// Maximum word characters per segment.
    pub max_chars: usize,
    /// Segment pool concurrency; `0` selects the built-in default.
    pub workers: usize,
    /// Whether the reserved acoustic-only input prefix is honored.
    pub allow_custom_code: bool,
    /// Voice used when a request names none.
    pub default_voice: String,
    /// Upper bound on request text length, in characters.
    pub max_text_chars: usize,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            workers: DEFAULT_WORKERS,
            allow_custom_code: false,
            default_voice: "astra".to_string(),
            max_text_chars: 10_000,
        }
    }
}

/// One external HTTP service endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoint {
    /// Base URL of the service. Empty means unconfigured.
    pub url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Endpoints for every HTTP stage, in pipeline order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Text cleaning service.
    pub cleaner: ServiceEndpoint,
    /// Text normalization service.
    pub normalizer: ServiceEndpoint,
    /// Number expansion service.
    pub numbers: ServiceEndpoint,
    /// Morphological tagger service.
    pub tagger: ServiceEndpoint,
    /// Accentuation service.
    pub accentuator: ServiceEndpoint,
    /// Phonetic transcription service.
    pub transcriber: ServiceEndpoint,
    /// Acoustic model service.
    pub acoustic_model: ServiceEndpoint,
    /// Vocoder service.
    pub vocoder: ServiceEndpoint,
    /// Audio format conversion service.
    pub converter: ServiceEndpoint,
}

impl ServiceSettings {
    /// Iterate `(name, endpoint)` pairs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ServiceEndpoint)> {
        [
            ("cleaner", &self.cleaner),
            ("normalizer", &self.normalizer),
            ("numbers", &self.numbers),
            ("tagger", &self.tagger),
            ("accentuator", &self.accentuator),
            ("transcriber", &self.transcriber),
            ("acoustic_model", &self.acoustic_model),
            ("vocoder", &self.vocoder),
            ("converter", &self.converter),
        ]
        .into_iter()
    }
}

/// Whole-result cache settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cached results; `0` disables caching.
    pub capacity: usize,
}

impl Settings {
    /// Check value floors and required endpoints.
    ///
    /// `synthesis.workers == 0` is allowed and means "use the built-in
    /// default"; the floor there is applied by the segment pool itself.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.synthesis.max_chars == 0 {
            return Err(SettingsError::invalid("synthesis.max_chars must be positive"));
        }
        if self.synthesis.max_text_chars == 0 {
            return Err(SettingsError::invalid(
                "synthesis.max_text_chars must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(SettingsError::invalid(
                "retry.jitter_factor must be within 0.0..=1.0",
            ));
        }
        for (name, endpoint) in self.services.iter() {
            if endpoint.url.is_empty() {
                return Err(SettingsError::invalid(format!(
                    "services.{name}.url is required"
                )));
            }
            if endpoint.timeout_ms == 0 {
                return Err(SettingsError::invalid(format!(
                    "services.{name}.timeout_ms must be positive"
                )));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
