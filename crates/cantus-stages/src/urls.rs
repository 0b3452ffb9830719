//! URL and e-mail replacement, local and regex-driven.
//!
//! Web and mail addresses are unreadable as text; each one collapses to a
//! single spoken placeholder before normalization. Bare domains without a
//! scheme or `www.` prefix are left alone.

use async_trait::async_trait;
use regex::Regex;

use cantus_core::record::{SynthesisMode, Utterance};
use cantus_core::{Result, SynthError};
use cantus_synth::RecordStage;

/// Spoken stand-in for a web or mail address.
const SPOKEN_ADDRESS: &str = "internetinis adresas";

const URL_PATTERN: &str = r#"\b(?:https?://|www\.)[^\s<>()]+[^\s<>().,!?;:'"]"#;
const EMAIL_PATTERN: &str =
    r"[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+";

/// Replaces URLs and e-mail addresses with a speakable placeholder.
#[derive(Debug, Clone)]
pub struct UrlReplacer {
    pattern: Regex,
}

impl UrlReplacer {
    /// A replacer over the built-in address patterns.
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(&format!("(?i)(?:{URL_PATTERN})|(?:{EMAIL_PATTERN})"))
            .map_err(|err| SynthError::config(format!("address pattern: {err}")))?;
        Ok(Self { pattern })
    }
}

#[async_trait]
impl RecordStage for UrlReplacer {
    fn name(&self) -> &'static str {
        "url_replacer"
    }

    async fn process(&self, record: &mut Utterance) -> Result<()> {
        if record.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        for i in 0..record.cleaned_text.len() {
            if record.chunk_is_fixed(i) {
                continue;
            }
            let replaced = self
                .pattern
                .replace_all(&record.cleaned_text[i], SPOKEN_ADDRESS)
                .into_owned();
            record.cleaned_text[i] = replaced;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
