//! Tagging: text to tokens, with accent-markup alignment.
//!
//! The tagger service only understands plain text, so accent markers are
//! stripped before the call. For records with pre-accented chunks the reply
//! is then walked against the original marked-up entries, position by
//! position, lifting each marker into the matching word token's user accent
//! and stamping the token with its chunk's provenance.
//!
//! Entries keep a single trailing space so chunk boundaries always fall
//! between tokens, never inside one.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use cantus_core::record::{SynthesisMode, Utterance};
use cantus_core::token::{AnnotatedToken, Token};
use cantus_core::{Result, SynthError, accent};
use cantus_synth::RecordStage;

use crate::http::ServiceClient;

#[derive(Debug, Deserialize)]
struct TaggedUnit {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    string: String,
    #[serde(default)]
    mi: String,
    #[serde(default)]
    lemma: String,
}

/// Morphological tagging through the tagger service.
#[derive(Debug, Clone)]
pub struct Tagger {
    client: ServiceClient,
}

impl Tagger {
    /// A tagger stage over the given client.
    #[must_use]
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStage for Tagger {
    fn name(&self) -> &'static str {
        "tagger"
    }

    #[instrument(skip_all, fields(request_id = %record.request_id))]
    async fn process(&self, record: &mut Utterance) -> Result<()> {
        if record.mode == SynthesisMode::AcousticOnly {
            return Ok(());
        }
        let entries: Vec<String> = record
            .text_with_numbers
            .iter()
            .map(|text| with_trailing_space(text))
            .collect();
        let plain = accent::clear_accents(&entries.concat());
        let units: Vec<TaggedUnit> = self.client.invoke_text(&plain).await?;

        let has_markup = record.text_chunks.iter().any(|c| c.accented.is_some());
        let tokens = if has_markup {
            align_markup(self.client.service(), &units, &entries, record)?
        } else {
            map_units(self.client.service(), &units)?
        };
        if !tokens.iter().any(|t| t.token.is_word()) {
            return Err(SynthError::NoInput);
        }
        record.tokens = tokens;
        Ok(())
    }
}

fn with_trailing_space(text: &str) -> String {
    if text.is_empty() || text.ends_with(' ') {
        text.to_string()
    } else {
        format!("{text} ")
    }
}

fn map_units(service: &str, units: &[TaggedUnit]) -> Result<Vec<AnnotatedToken>> {
    units
        .iter()
        .map(|unit| Ok(AnnotatedToken::new(map_unit(service, unit)?)))
        .collect()
}

fn map_unit(service: &str, unit: &TaggedUnit) -> Result<Token> {
    match unit.kind.as_str() {
        "WORD" | "NUMBER" => Ok(Token::Word {
            text: unit.string.clone(),
            tag: unit.mi.clone(),
            lemma: unit.lemma.clone(),
        }),
        "SEPARATOR" => Ok(Token::Separator(unit.string.clone())),
        "SENTENCE_END" => Ok(Token::SentenceEnd),
        "SPACE" => Ok(Token::Space),
        other => Err(SynthError::bad_response(
            service,
            format!("unknown token type '{other}'"),
        )),
    }
}

/// Map units to tokens while walking the marked-up source text in step.
fn align_markup(
    service: &str,
    units: &[TaggedUnit],
    entries: &[String],
    record: &Utterance,
) -> Result<Vec<AnnotatedToken>> {
    let mut walk = MarkedText::new(entries, record);
    let mut tokens = Vec::with_capacity(units.len());
    for unit in units {
        let mut annotated = AnnotatedToken::new(map_unit(service, unit)?);
        walk.next_entry();
        if let Some(word) = annotated.token.word_text().map(str::to_owned) {
            annotated.from_accented_text = walk.in_fixed();
            annotated.user_accent = walk.take_word(&word)?;
        } else if !matches!(annotated.token, Token::SentenceEnd) {
            // sentence ends have no surface form; everything else consumes
            // its own characters without comparison
            walk.skip(unit.string.chars().count());
        }
        tokens.push(annotated);
    }
    Ok(tokens)
}

/// Cursor over the marked-up text entries, one chunk's text per entry.
struct MarkedText {
    entries: Vec<(Vec<char>, bool)>,
    entry: usize,
    pos: usize,
}

impl MarkedText {
    fn new(entries: &[String], record: &Utterance) -> Self {
        Self {
            entries: entries
                .iter()
                .enumerate()
                .map(|(i, text)| (text.chars().collect(), record.chunk_is_fixed(i)))
                .collect(),
            entry: 0,
            pos: 0,
        }
    }

    /// Step over exhausted entries.
    fn next_entry(&mut self) {
        while self
            .entries
            .get(self.entry)
            .is_some_and(|(chars, _)| self.pos >= chars.len())
        {
            self.entry += 1;
            self.pos = 0;
        }
    }

    /// Whether the cursor stands in a pre-accented chunk.
    fn in_fixed(&self) -> bool {
        self.entries.get(self.entry).is_some_and(|(_, fixed)| *fixed)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.entries.get(self.entry)?.0.get(self.pos + offset).copied()
    }

    /// Consume a word, letter by letter, lifting at most one accent marker.
    ///
    /// Returns the accent code found, or 0.
    fn take_word(&mut self, word: &str) -> Result<i32> {
        let mut code = 0i32;
        let mut position = 1i32;
        for letter in word.chars() {
            let braced = self.peek(0) == Some('{')
                && self.peek(1) == Some(letter)
                && self.peek(3) == Some('}');
            let mark = self.peek(2).map_or(0, accent::mark_value);
            if braced && mark > 0 {
                let found = mark * 100 + position;
                if code != 0 {
                    return Err(SynthError::BadAccent {
                        word: word.to_string(),
                        code: found,
                    });
                }
                code = found;
                self.pos += 4;
            } else if self.peek(0) == Some(letter) {
                self.pos += 1;
            } else {
                return Err(SynthError::Mismatch {
                    expected: word.to_string(),
                    got: self.rest(16),
                });
            }
            position += 1;
        }
        Ok(code)
    }

    /// Consume a non-word unit's characters without comparison.
    fn skip(&mut self, len: usize) {
        self.pos += len;
    }

    fn rest(&self, limit: usize) -> String {
        self.entries
            .get(self.entry)
            .map(|(chars, _)| chars[self.pos.min(chars.len())..].iter().take(limit).collect())
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use cantus_core::RetryConfig;
    use cantus_core::api::SynthesisRequest;
    use cantus_core::ssml::TextChunk;

    use super::*;

    fn client(server: &wiremock::MockServer) -> ServiceClient {
        ServiceClient::new(
            "tagger",
            server.uri(),
            Duration::from_secs(5),
            RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            },
        )
        .unwrap()
    }

    fn plain_record(text: &str) -> Utterance {
        let mut record = Utterance::new(Arc::new(SynthesisRequest::text(text)));
        record.text_with_numbers = vec![text.to_string()];
        record
    }

    fn chunked_record(chunks: Vec<TextChunk>) -> Utterance {
        let mut record = Utterance::new(Arc::new(SynthesisRequest::text("x")));
        record.text_with_numbers = chunks
            .iter()
            .map(|c| c.accented.clone().unwrap_or_else(|| c.text.clone()))
            .collect();
        record.text_chunks = chunks;
        record
    }

    fn accented_chunk(text: &str, accented: &str) -> TextChunk {
        TextChunk {
            accented: Some(accented.into()),
            ..TextChunk::plain(text)
        }
    }

    fn unit(kind: &str, string: &str) -> serde_json::Value {
        serde_json::json!({"type": kind, "string": string})
    }

    #[tokio::test]
    async fn tags_plain_text() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::body_string("laba diena. "))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"type": "WORD", "string": "laba", "mi": "Agfpnn", "lemma": "labas"},
                unit("SPACE", " "),
                {"type": "WORD", "string": "diena", "mi": "Ncfsnn", "lemma": "diena"},
                unit("SEPARATOR", "."),
                unit("SENTENCE_END", ""),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let mut record = plain_record("laba diena.");
        Tagger::new(client(&server)).process(&mut record).await.unwrap();
        assert_eq!(record.tokens.len(), 5);
        assert_eq!(
            record.tokens[0].token,
            Token::Word {
                text: "laba".into(),
                tag: "Agfpnn".into(),
                lemma: "labas".into(),
            }
        );
        assert_eq!(record.tokens[1].token, Token::Space);
        assert_eq!(record.tokens[3].token, Token::Separator(".".into()));
        assert_eq!(record.tokens[4].token, Token::SentenceEnd);
    }

    #[tokio::test]
    async fn number_units_become_words() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([unit("NUMBER", "1984")])),
            )
            .mount(&server)
            .await;

        let mut record = plain_record("1984");
        Tagger::new(client(&server)).process(&mut record).await.unwrap();
        assert!(record.tokens[0].token.is_word());
    }

    #[tokio::test]
    async fn unknown_unit_type_errors() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([unit("GLYPH", "@")])),
            )
            .mount(&server)
            .await;

        let mut record = plain_record("@");
        let err = Tagger::new(client(&server))
            .process(&mut record)
            .await
            .unwrap_err();
        assert_matches!(err, SynthError::BadResponse { .. });
        assert!(err.to_string().contains("GLYPH"));
    }

    #[tokio::test]
    async fn no_word_tokens_errors() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([unit("SEPARATOR", "...")])),
            )
            .mount(&server)
            .await;

        let mut record = plain_record("...");
        let err = Tagger::new(client(&server))
            .process(&mut record)
            .await
            .unwrap_err();
        assert_matches!(err, SynthError::NoInput);
    }

    #[tokio::test]
    async fn markers_are_stripped_from_the_wire_text() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::body_string("vakaras "))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([unit("WORD", "vakaras")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut record = chunked_record(vec![accented_chunk("vakaras", "v{a~}karas")]);
        Tagger::new(client(&server)).process(&mut record).await.unwrap();
        assert_eq!(record.tokens[0].user_accent, 302);
        assert!(record.tokens[0].from_accented_text);
    }

    #[tokio::test]
    async fn walk_spans_mixed_chunks() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::body_string("labas rytas "))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                unit("WORD", "labas"),
                unit("SPACE", " "),
                unit("WORD", "rytas"),
                unit("SPACE", " "),
            ])))
            .mount(&server)
            .await;

        let mut record = chunked_record(vec![
            TextChunk::plain("labas"),
            accented_chunk("rytas", "r{y/}tas"),
        ]);
        Tagger::new(client(&server)).process(&mut record).await.unwrap();
        assert_eq!(record.tokens[0].user_accent, 0);
        assert!(!record.tokens[0].from_accented_text);
        assert_eq!(record.tokens[2].user_accent, 202);
        assert!(record.tokens[2].from_accented_text);
    }

    #[tokio::test]
    async fn malformed_marker_desyncs_the_walk() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                unit("WORD", "laba"),
                unit("SPACE", " "),
                unit("WORD", "diena"),
            ])))
            .mount(&server)
            .await;

        // a marker group wraps exactly one letter; {ie\} is left in the text
        let mut record = chunked_record(vec![accented_chunk("laba diena", "laba d{ie\\}na")]);
        let result = Tagger::new(client(&server)).process(&mut record).await;
        assert_matches!(result, Err(SynthError::Mismatch { .. }));
    }

    #[tokio::test]
    async fn second_marker_in_a_word_errors() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([unit("WORD", "labas")])),
            )
            .mount(&server)
            .await;

        let mut record = chunked_record(vec![accented_chunk("labas", "l{a\\}b{a~}s")]);
        let err = Tagger::new(client(&server))
            .process(&mut record)
            .await
            .unwrap_err();
        assert_matches!(err, SynthError::BadAccent { code: 304, .. });
    }

    #[tokio::test]
    async fn walk_desync_errors_with_mismatch() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([unit("WORD", "vakaras")])),
            )
            .mount(&server)
            .await;

        let mut record = chunked_record(vec![accented_chunk("rytas", "r{y/}tas")]);
        let err = Tagger::new(client(&server))
            .process(&mut record)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            SynthError::Mismatch { expected, .. } if expected == "vakaras"
        );
    }

    #[tokio::test]
    async fn skips_acoustic_only_records() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut record = plain_record("a - b");
        record.mode = SynthesisMode::AcousticOnly;
        Tagger::new(client(&server)).process(&mut record).await.unwrap();
        assert!(record.tokens.is_empty());
    }
}
