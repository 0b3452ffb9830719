//! Settings loading with layered sources.
//!
//! Loading flow (later layers override earlier ones):
//! 1. Compiled [`Settings::default()`]
//! 2. Optional TOML file named by the `CANTUS_CONFIG` environment variable
//! 3. `CANTUS_*` environment variables, nested keys split on `__`
//!    (e.g. `CANTUS_SYNTHESIS__MAX_CHARS=200`)

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::debug;

use crate::errors::Result;
use crate::types::Settings;

/// Environment variable naming the TOML settings file.
pub const CONFIG_PATH_VAR: &str = "CANTUS_CONFIG";
/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "CANTUS_";

/// Compose the layered figment from defaults, file, and environment.
#[must_use]
pub fn figment() -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        debug!(path, "layering settings file");
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load settings from the default layered sources and validate them.
///
/// # Errors
///
/// Returns an error when a source fails to deserialize or when
/// [`Settings::validate`] rejects the merged values.
pub fn load_settings() -> Result<Settings> {
    load_from(figment())
}

/// Extract and validate settings from a prepared [`Figment`].
///
/// # Errors
///
/// Returns an error when extraction or validation fails.
pub fn load_from(figment: Figment) -> Result<Settings> {
    let settings: Settings = figment.extract()?;
    settings.validate()?;
    Ok(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
