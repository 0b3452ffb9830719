//! Accentuation: choose an accent variant for every segment word.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use cantus_core::record::{Segment, SynthesisMode};
use cantus_core::token::{AccentVariant, Token};
use cantus_core::{Result, SynthError};
use cantus_synth::{SegmentContext, SegmentStage};

use crate::http::ServiceClient;

#[derive(Debug, Deserialize)]
struct AccentedWord {
    #[serde(default)]
    word: String,
    #[serde(default)]
    accent: Vec<AccentGroup>,
}

/// One morphological reading with its accent variants.
#[derive(Debug, Deserialize)]
struct AccentGroup {
    #[serde(default)]
    mi_vdu: String,
    #[serde(default)]
    error: String,
    #[serde(default)]
    variants: Vec<AccentVariant>,
}

/// Accent variant selection through the accentuator service.
#[derive(Debug, Clone)]
pub struct Accentuator {
    client: ServiceClient,
}

impl Accentuator {
    /// An accentuation stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SegmentStage for Accentuator {
    fn name(&self) -> &'static str {
        "accentuator"
    }

    #[instrument(skip_all)]
    async fn process(&self, segment: &mut Segment, ctx: &SegmentContext) -> Result<()> {
        if ctx.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        // Words with a caller-supplied transcription never reach the service.
        let words: Vec<String> = segment
            .words()
            .filter(|t| t.user_transcription.is_none())
            .filter_map(|t| t.token.word_text().map(str::to_owned))
            .collect();
        if words.is_empty() {
            return Ok(());
        }
        let answers: Vec<AccentedWord> = self.client.invoke_json(&words).await?;
        if answers.len() != words.len() {
            return Err(SynthError::bad_response(
                self.client.service(),
                format!("{} answers for {} words", answers.len(), words.len()),
            ));
        }
        for (annotated, answer) in segment
            .words_mut()
            .filter(|t| t.user_transcription.is_none())
            .zip(&answers)
        {
            let (word, tag) = match &annotated.token {
                Token::Word { text, tag, .. } => (text.clone(), tag.clone()),
                _ => continue,
            };
            if answer.word != word {
                return Err(SynthError::Mismatch {
                    expected: word,
                    got: answer.word.clone(),
                });
            }
            annotated.accent = best_variant(&answer.accent, &tag);
        }
        Ok(())
    }
}

/// Pick the variant to carry: an accented variant from an error-free group
/// matching the word's morphological tag, else from any error-free group,
/// else whatever the first group proposes.
fn best_variant(groups: &[AccentGroup], tag: &str) -> Option<AccentVariant> {
    let accented = |group: &AccentGroup| group.variants.iter().find(|v| v.accent > 0).cloned();
    groups
        .iter()
        .filter(|g| g.error.is_empty() && g.mi_vdu == tag)
        .find_map(accented)
        .or_else(|| groups.iter().filter(|g| g.error.is_empty()).find_map(accented))
        .or_else(|| groups.first().and_then(|g| g.variants.first().cloned()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
