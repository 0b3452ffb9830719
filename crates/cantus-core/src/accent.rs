//! Inline accent-marker encoding.
//!
//! An accent code packs the accent type and the accented letter's position
//! into one integer: `type * 100 + (1-based letter position)`. Rendering
//! wraps the accented letter in braces with a mark character, e.g. code 101
//! on `"aa"` yields `{a\}a` and code 302 on `"ai"` yields `a{i~}`.

use crate::error::SynthError;

/// Mark for the falling (grave-style) accent, type 1.
pub const MARK_FALLING: char = '\\';
/// Mark for the rising (acute-style) accent, type 2.
pub const MARK_RISING: char = '/';
/// Mark for the circumflex (tilde-style) accent, type 3.
pub const MARK_CIRCUMFLEX: char = '~';

/// Accent type for a mark character, 0 when the character is not a mark.
#[must_use]
pub fn mark_value(c: char) -> i32 {
    match c {
        MARK_FALLING => 1,
        MARK_RISING => 2,
        MARK_CIRCUMFLEX => 3,
        _ => 0,
    }
}

fn mark_for(accent_type: i32) -> Option<char> {
    match accent_type {
        1 => Some(MARK_FALLING),
        2 => Some(MARK_RISING),
        3 => Some(MARK_CIRCUMFLEX),
        _ => None,
    }
}

/// Render a word with its accent code as an inline accent marker.
///
/// Code 0 returns the word unchanged. A position past the end of the word or
/// a type outside 1–3 is a [`SynthError::BadAccent`].
pub fn to_accented(word: &str, code: i32) -> Result<String, SynthError> {
    if code == 0 {
        return Ok(word.to_string());
    }
    let bad = || SynthError::BadAccent {
        word: word.to_string(),
        code,
    };
    let pos = code % 100 - 1;
    let accent_type = code / 100;
    let letters: Vec<char> = word.chars().collect();
    let pos = usize::try_from(pos).map_err(|_| bad())?;
    if pos >= letters.len() {
        return Err(bad());
    }
    let mark = mark_for(accent_type).ok_or_else(bad)?;
    let mut out = String::with_capacity(word.len() + 4);
    out.extend(&letters[..pos]);
    out.push('{');
    out.push(letters[pos]);
    out.push(mark);
    out.push('}');
    out.extend(&letters[pos + 1..]);
    Ok(out)
}

/// Strip inline accent markers, restoring the plain letters.
#[must_use]
pub fn clear_accents(text: &str) -> String {
    let letters: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < letters.len() {
        if i + 3 < letters.len()
            && letters[i] == '{'
            && letters[i + 1].is_alphabetic()
            && mark_value(letters[i + 2]) > 0
            && letters[i + 3] == '}'
        {
            out.push(letters[i + 1]);
            i += 4;
        } else {
            out.push(letters[i]);
            i += 1;
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
