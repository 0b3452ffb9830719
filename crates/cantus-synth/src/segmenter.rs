//! Cutting the record's token sequence into bounded segments.
//!
//! Only word characters count against the budget; separators, spaces, and
//! sentence-end markers are free. Cut points are chosen greedily: fill up to
//! the budget, then cut after the strongest boundary seen so far.

use std::mem;

use async_trait::async_trait;

use cantus_core::record::{Segment, SynthesisMode, Utterance};
use cantus_core::token::{AnnotatedToken, Token};
use cantus_core::{Result, SynthError};

use crate::stage::RecordStage;

/// Budget applied when the configured maximum is zero.
pub const DEFAULT_MAX_CHARS: usize = 400;

/// Cut a token sequence into segments of at most `max_chars` word characters.
///
/// Boundary preference, strongest first: after a sentence-end marker, after a
/// non-empty separator, after any token. A boundary counts only once at least
/// one word character has accumulated, so no segment comes out empty. Fails
/// with [`SynthError::SegmentTooLong`] when a single unbreakable run exceeds
/// the budget. Identical input and budget always produce the identical split.
pub fn split(tokens: Vec<AnnotatedToken>, max_chars: usize) -> Result<Vec<Segment>> {
    let max_chars = if max_chars == 0 {
        DEFAULT_MAX_CHARS
    } else {
        max_chars
    };
    let mut segments = Vec::new();
    let mut rest = tokens;
    while !rest.is_empty() {
        let to = next_cut(&rest, max_chars)?;
        let tail = rest.split_off(to);
        segments.push(Segment::new(rest, false));
        rest = tail;
    }
    if let Some(first) = segments.first_mut() {
        first.first = true;
    }
    Ok(segments)
}

/// One past the cut index for the leading segment of `tokens`.
///
/// Tracks the last boundary of each kind while accumulating word characters;
/// the first token pushing the count over the budget triggers the cut, and
/// that token itself is never part of the emitted segment.
fn next_cut(tokens: &[AnnotatedToken], max_chars: usize) -> Result<usize> {
    let mut chars = 0usize;
    let mut last_sentence_end = None;
    let mut last_separator = None;
    let mut last_any = None;
    for (i, annotated) in tokens.iter().enumerate() {
        chars += annotated.token.budget_chars();
        if chars > max_chars {
            let cut = last_sentence_end
                .or(last_separator)
                .or(last_any)
                .ok_or(SynthError::SegmentTooLong { max_chars })?;
            return Ok(cut + 1);
        }
        if chars > 0 {
            match &annotated.token {
                Token::SentenceEnd => last_sentence_end = Some(i),
                Token::Separator(s) if !s.is_empty() => last_separator = Some(i),
                _ => {}
            }
            last_any = Some(i);
        }
    }
    Ok(tokens.len())
}

/// The whole-record stage carving the record's tokens into segments.
///
/// In acoustic-only mode there are no tokens; the record becomes a single
/// raw-text segment instead.
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_chars: usize,
}

impl Segmenter {
    /// A segmenter with the given budget; zero selects the default of 400.
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl RecordStage for Segmenter {
    fn name(&self) -> &'static str {
        "splitter"
    }

    async fn process(&self, record: &mut Utterance) -> Result<()> {
        record.segments = match record.mode {
            SynthesisMode::AcousticOnly => vec![Segment::from_text(record.original_text.clone())],
            SynthesisMode::Full => split(mem::take(&mut record.tokens), self.max_chars)?,
        };
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use cantus_core::api::SynthesisRequest;

    use super::*;

    fn word(text: &str) -> AnnotatedToken {
        AnnotatedToken::new(Token::word(text))
    }

    fn sep(text: &str) -> AnnotatedToken {
        AnnotatedToken::new(Token::Separator(text.into()))
    }

    fn sentence_end() -> AnnotatedToken {
        AnnotatedToken::new(Token::SentenceEnd)
    }

    fn space() -> AnnotatedToken {
        AnnotatedToken::new(Token::Space)
    }

    #[test]
    fn empty_input_yields_no_segments() {
        let segments = split(vec![], 10).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn fitting_input_stays_whole() {
        let segments = split(vec![word("labas"), space(), word("rytas")], 400).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].first);
        assert_eq!(segments[0].tokens.len(), 3);
    }

    #[test]
    fn cuts_after_sentence_end() {
        let tokens = vec![word("0123456789"), sentence_end(), word("0123456789"), sep("?")];
        let segments = split(tokens, 10).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tokens.len(), 2);
        assert_eq!(segments[0].tokens[1].token, Token::SentenceEnd);
        assert_eq!(segments[1].tokens.len(), 2);
        assert_eq!(segments[1].tokens[1].token, Token::Separator("?".into()));
    }

    #[test]
    fn sentence_end_beats_later_separator() {
        let tokens = vec![
            word("0123456789"),
            sentence_end(),
            word("01234"),
            sep(","),
            word("0123456789"),
        ];
        // Both boundaries fit under 20 chars; the stronger one wins even
        // though the separator is closer to the overflow.
        let segments = split(tokens, 20).unwrap();
        assert_eq!(segments[0].tokens.len(), 2);
        assert_eq!(segments[0].tokens[1].token, Token::SentenceEnd);
    }

    #[test]
    fn separator_beats_forced_cut() {
        let tokens = vec![word("01234"), sep(","), word("01234"), word("0123456789")];
        let segments = split(tokens, 10).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].tokens.len(), 2);
        assert_eq!(segments[1].tokens.len(), 1);
        assert_eq!(segments[2].tokens.len(), 1);
    }

    #[test]
    fn forced_cut_lands_after_last_fitting_token() {
        let tokens = vec![word("0123456789"), word("0123456789"), word("0123456789")];
        let segments = split(tokens, 15).unwrap();
        assert_eq!(segments.len(), 3);
        for segment in &segments {
            assert_eq!(segment.tokens.len(), 1);
        }
        assert!(segments[0].first);
        assert!(!segments[1].first);
        assert!(!segments[2].first);
    }

    #[test]
    fn empty_separator_is_not_a_boundary() {
        let tokens = vec![word("01234"), sep(""), word("01234"), word("0123456789")];
        let segments = split(tokens, 10).unwrap();
        // The empty separator only provides the fallback cut, after the
        // second word.
        assert_eq!(segments[0].tokens.len(), 3);
    }

    #[test]
    fn boundary_before_any_word_chars_is_ignored() {
        let tokens = vec![sentence_end(), word("0123456789"), word("01")];
        let segments = split(tokens, 10).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tokens.len(), 2);
    }

    #[test]
    fn unbreakable_run_fails() {
        let err = split(vec![word("0123456789012")], 10).unwrap_err();
        assert_matches!(err, SynthError::SegmentTooLong { max_chars: 10 });
    }

    #[test]
    fn later_unbreakable_run_fails_too() {
        let tokens = vec![word("01234"), sep(","), word("0123456789012")];
        let err = split(tokens, 10).unwrap_err();
        assert_matches!(err, SynthError::SegmentTooLong { .. });
    }

    #[test]
    fn zero_budget_selects_default() {
        let long_word = "a".repeat(DEFAULT_MAX_CHARS);
        let segments = split(vec![word(&long_word)], 0).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn budget_counts_scalars_not_bytes() {
        let tokens = vec![word("ąčęėįšųūž"), sep(","), word("ąčęėįšųūž")];
        let segments = split(tokens, 9).unwrap();
        assert_eq!(segments.len(), 2);
    }

    #[tokio::test]
    async fn stage_fills_record_segments() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest::text("labas rytas")));
        record.tokens = vec![word("labas"), space(), word("rytas")];

        let stage = Segmenter::new(400);
        stage.process(&mut record).await.unwrap();
        assert_eq!(record.segments.len(), 1);
        assert!(record.tokens.is_empty());
    }

    #[tokio::test]
    async fn stage_uses_raw_text_in_acoustic_only_mode() {
        let mut record = Utterance::new(Arc::new(SynthesisRequest::text("a - b - c")));
        record.mode = SynthesisMode::AcousticOnly;

        let stage = Segmenter::new(400);
        stage.process(&mut record).await.unwrap();
        assert_eq!(record.segments.len(), 1);
        assert!(record.segments[0].first);
        assert_eq!(record.segments[0].text.as_deref(), Some("a - b - c"));
        assert!(record.segments[0].tokens.is_empty());
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        fn token_strategy() -> impl Strategy<Value = AnnotatedToken> {
            prop_oneof![
                4 => "[a-z]{1,8}".prop_map(|t| word(&t)),
                1 => Just(sep(",")),
                1 => Just(sentence_end()),
                1 => Just(space()),
            ]
        }

        proptest! {
            #[test]
            fn segments_respect_the_budget(
                tokens in proptest::collection::vec(token_strategy(), 0..40),
                max_chars in 8..64usize,
            ) {
                if let Ok(segments) = split(tokens, max_chars) {
                    for segment in &segments {
                        let chars: usize = segment
                            .tokens
                            .iter()
                            .map(|t| t.token.budget_chars())
                            .sum();
                        prop_assert!(chars <= max_chars);
                        prop_assert!(!segment.tokens.is_empty());
                    }
                }
            }

            #[test]
            fn concatenated_segments_reproduce_the_input(
                tokens in proptest::collection::vec(token_strategy(), 0..40),
                max_chars in 8..64usize,
            ) {
                let original = tokens.clone();
                if let Ok(segments) = split(tokens, max_chars) {
                    let rejoined: Vec<AnnotatedToken> = segments
                        .into_iter()
                        .flat_map(|s| s.tokens)
                        .collect();
                    prop_assert_eq!(rejoined, original);
                }
            }

            #[test]
            fn exactly_one_first_flag(
                tokens in proptest::collection::vec(token_strategy(), 1..40),
            ) {
                if let Ok(segments) = split(tokens, 32) {
                    let firsts = segments.iter().filter(|s| s.first).count();
                    prop_assert_eq!(firsts, usize::from(!segments.is_empty()));
                }
            }
        }
    }
}
