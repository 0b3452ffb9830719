//! Transcription: phonetic form for every segment word.
//!
//! Each word is sent with its chosen accent, syllabification and the next
//! word in the same breath group as right context. Separators and sentence
//! ends cut the context chain; plain whitespace does not.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cantus_core::record::{Segment, SynthesisMode};
use cantus_core::token::{AnnotatedToken, Token};
use cantus_core::{Result, SynthError};
use cantus_synth::{SegmentContext, SegmentStage};

use crate::http::ServiceClient;

#[derive(Debug, Serialize)]
struct TranscribeRequest {
    word: String,
    syll: String,
    user: String,
    ml: String,
    rc: String,
    acc: i32,
}

#[derive(Debug, Deserialize)]
struct TranscribedWord {
    #[serde(default)]
    word: String,
    #[serde(default)]
    transcription: Vec<TranscriptionVariant>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionVariant {
    #[serde(default)]
    transcription: String,
}

/// Phonetic transcription through the transcriber service.
#[derive(Debug, Clone)]
pub struct Transcriber {
    client: ServiceClient,
}

impl Transcriber {
    /// A transcription stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SegmentStage for Transcriber {
    fn name(&self) -> &'static str {
        "transcriber"
    }

    #[instrument(skip_all)]
    async fn process(&self, segment: &mut Segment, ctx: &SegmentContext) -> Result<()> {
        if ctx.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        let inputs = map_inputs(segment);
        if inputs.is_empty() {
            return Ok(());
        }
        let answers: Vec<TranscribedWord> = self.client.invoke_json(&inputs).await?;
        if answers.len() != inputs.len() {
            return Err(SynthError::bad_response(
                self.client.service(),
                format!("{} answers for {} words", answers.len(), inputs.len()),
            ));
        }
        for (annotated, answer) in segment.words_mut().zip(&answers) {
            let Some(word) = annotated.token.word_text().map(str::to_owned) else {
                continue;
            };
            if answer.word != word {
                return Err(SynthError::Mismatch {
                    expected: word,
                    got: answer.word.clone(),
                });
            }
            let transcription = answer
                .transcription
                .iter()
                .map(|v| v.transcription.as_str())
                .find(|t| !t.is_empty())
                .unwrap_or_default()
                .replace('?', "");
            annotated.transcription = Some(transcription);
        }
        Ok(())
    }
}

/// One request entry per word token, right context threaded in.
fn map_inputs(segment: &Segment) -> Vec<TranscribeRequest> {
    let mut inputs: Vec<TranscribeRequest> = Vec::new();
    let mut previous: Option<usize> = None;
    for annotated in &segment.tokens {
        match &annotated.token {
            Token::Word { text, .. } => {
                if let Some(prev) = previous {
                    inputs[prev].rc = text.clone();
                }
                previous = Some(inputs.len());
                inputs.push(map_word(annotated, text));
            }
            Token::Separator(_) | Token::SentenceEnd => previous = None,
            Token::Space => {}
        }
    }
    inputs
}

fn map_word(annotated: &AnnotatedToken, text: &str) -> TranscribeRequest {
    if let Some(user) = &annotated.user_transcription {
        return TranscribeRequest {
            word: text.to_string(),
            syll: annotated.user_syllables.clone().unwrap_or_default(),
            user: user.clone(),
            ml: text.to_string(),
            rc: String::new(),
            acc: 0,
        };
    }
    let variant = annotated.accent.clone().unwrap_or_default();
    TranscribeRequest {
        word: text.to_string(),
        syll: variant.syll,
        user: String::new(),
        ml: variant.ml,
        rc: String::new(),
        acc: annotated.effective_accent(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
