//! Tokens produced by the tagging stage and the annotations layered on them.
//!
//! A [`Token`] is immutable once tagged: its identity (text, morphological
//! tag, lemma) never changes downstream. Later stages (accentuation, clitic
//! classification, transcription) write only into the surrounding
//! [`AnnotatedToken`] wrapper.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────────────

/// One tagging-stage output unit.
///
/// A token is exactly one of the four kinds; "is a word" is derived from the
/// variant, never stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// A speakable word (numbers read as words included).
    Word {
        /// Surface form.
        text: String,
        /// Morphological tag assigned by the tagger.
        tag: String,
        /// Dictionary form.
        lemma: String,
    },
    /// Punctuation between words, carrying the punctuation string itself.
    Separator(String),
    /// End-of-sentence marker.
    SentenceEnd,
    /// Whitespace.
    Space,
}

impl Token {
    /// A word token with an empty tag and lemma. Test and builder shorthand.
    #[must_use]
    pub fn word(text: impl Into<String>) -> Self {
        Self::Word {
            text: text.into(),
            tag: String::new(),
            lemma: String::new(),
        }
    }

    /// Whether this token is a speakable word.
    #[must_use]
    pub fn is_word(&self) -> bool {
        matches!(self, Self::Word { .. })
    }

    /// The word's surface form, if this is a word token.
    #[must_use]
    pub fn word_text(&self) -> Option<&str> {
        match self {
            Self::Word { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The separator string, if this is a separator token.
    #[must_use]
    pub fn separator(&self) -> Option<&str> {
        match self {
            Self::Separator(s) => Some(s),
            _ => None,
        }
    }

    /// Character count charged against the segmentation budget.
    ///
    /// Only word tokens cost anything; separators and spaces are free.
    #[must_use]
    pub fn budget_chars(&self) -> usize {
        match self {
            Self::Word { text, .. } => text.chars().count(),
            _ => 0,
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::Space
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Annotations
// ─────────────────────────────────────────────────────────────────────────────

/// One accent variant proposed by the accentuation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccentVariant {
    /// Accent code (`type * 100 + 1-based letter position`), 0 for none.
    #[serde(default)]
    pub accent: i32,
    /// The word with the accent applied, as the service renders it.
    #[serde(default)]
    pub accented: String,
    /// Morphological lemma form used by the transcriber.
    #[serde(default)]
    pub ml: String,
    /// Syllabified form.
    #[serde(default)]
    pub syll: String,
}

/// Clitic classification of a word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CliticKind {
    /// Clitic analysis does not apply to the word.
    #[default]
    Unused,
    /// Analyzed and found not to be a clitic; suppresses the accent.
    None,
    /// A clitic with its own accent override.
    Custom,
}

/// Clitic annotation: classification plus the accent override when custom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clitic {
    /// Classification outcome.
    pub kind: CliticKind,
    /// Accent code override, meaningful only for [`CliticKind::Custom`].
    pub accent: i32,
}

/// A token plus the mutable annotations downstream stages attach to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotatedToken {
    /// The immutable tagged token.
    pub token: Token,
    /// Accent variant chosen by the accentuation stage.
    pub accent: Option<AccentVariant>,
    /// Accent code supplied by the caller's markup, 0 for none.
    pub user_accent: i32,
    /// Phonetic transcription supplied by the caller's markup.
    pub user_transcription: Option<String>,
    /// Syllabification supplied by the caller's markup.
    pub user_syllables: Option<String>,
    /// Transcription produced by the transcriber stage.
    pub transcription: Option<String>,
    /// Clitic classification.
    pub clitic: Clitic,
    /// The word came from a pre-accented structured-input chunk.
    pub from_accented_text: bool,
}

impl AnnotatedToken {
    /// Wrap a bare token with empty annotations.
    #[must_use]
    pub fn new(token: Token) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// Effective accent code, as used for transcription and accented output.
    ///
    /// Precedence: the caller's accent override; suppression for words from
    /// pre-accented structured input; the clitic override; the accentuator's
    /// chosen variant. A word without a chosen variant has no accent.
    #[must_use]
    pub fn effective_accent(&self) -> i32 {
        let Some(variant) = &self.accent else {
            return 0;
        };
        if self.user_accent > 0 {
            return self.user_accent;
        }
        if self.from_accented_text {
            return 0;
        }
        match self.clitic.kind {
            CliticKind::Custom => self.clitic.accent,
            CliticKind::None => 0,
            CliticKind::Unused => variant.accent,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
