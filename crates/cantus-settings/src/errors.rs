//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to gather or deserialize a configuration source.
    #[error("failed to load settings: {0}")]
    Figment(#[from] Box<figment::Error>),
    /// A settings value was invalid (e.g., out of range or missing).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl SettingsError {
    /// Build an [`SettingsError::InvalidValue`] from anything displayable.
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidValue(detail.into())
    }
}

impl From<figment::Error> for SettingsError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
