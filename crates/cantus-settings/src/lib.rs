//! # cantus-settings
//!
//! Layered configuration for the Cantus synthesis pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`Settings::default()`]
//! 2. **TOML file**: path named by `CANTUS_CONFIG` (merged over defaults)
//! 3. **Environment variables**: `CANTUS_*` overrides, nested keys split
//!    on `__` (highest priority)
//!
//! The merged result is validated once on load: value floors and the
//! presence of every stage service URL.
//!
//! # Usage
//!
//! ```no_run
//! let settings = cantus_settings::settings();
//! println!("segment budget: {}", settings.synthesis.max_chars);
//! ```

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{figment, load_from, load_settings};
pub use types::{
    CacheSettings, ServiceEndpoint, ServiceSettings, Settings, SynthesisSettings,
};

use std::sync::OnceLock;

/// Global settings singleton.
///
/// Initialized on first access via [`settings`], or explicitly via
/// [`init_settings`].
static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from the layered sources. On subsequent
/// calls, returns the cached value. If loading fails, logs the failure and
/// returns compiled defaults.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "settings load failed, using defaults");
            Settings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Intended for tests and embedders that build [`Settings`] in code.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: Settings) -> std::result::Result<(), Settings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
