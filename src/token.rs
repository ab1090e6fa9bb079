//! Synthetic module identities.
//!
//! A [`Token`] is the opaque identifier minted for each virtual file. It
//! doubles as an importable module specifier, so generated code embeds
//! tokens directly in source text. Cache replay later rewrites those
//! embedded tokens with a textual substitution, which is only sound
//! because tokens are drawn from an identifier-safe alphabet and replaced
//! with whole-token boundary matching: an accidental substring of
//! ordinary source text never matches a full token between two
//! non-identifier characters.

use std::borrow::Borrow;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet tokens are drawn from. Every character may legally appear
/// inside an identifier of the generated source language, so a token can
/// be pasted into code as-is.
pub const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz_$";

/// Length of a minted token. 28^10 possibilities make an accidental
/// appearance in ordinary generated source astronomically unlikely.
pub const TOKEN_LEN: usize = 10;

// =============================================================================
// Token
// =============================================================================

/// Opaque unique identifier for a virtual file.
///
/// Globally unique per build-process lifetime. Usable as an import
/// specifier in generated code; resolution turns it back into the virtual
/// file's synthetic path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Mint a fresh random token.
    pub(crate) fn mint() -> Self {
        let mut rng = rand::rng();
        let id = (0..TOKEN_LEN)
            .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Wrap an externally assigned identifier (e.g. the host bundler's
    /// chunk reference id) as a token.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The token's textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Anchored substitution
// =============================================================================

/// Whether `c` can be part of an identifier in the generated source.
/// Used as the boundary class for anchored token replacement.
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Replace every whole-token occurrence of `old` in `text` with `new`.
///
/// An occurrence only counts when it is not preceded or followed by an
/// identifier character, so a token embedded in a longer identifier is
/// left alone.
fn replace_anchored(text: &str, old: &str, new: &str) -> String {
    debug_assert!(!old.is_empty());
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while let Some(pos) = text[i..].find(old) {
        let start = i + pos;
        let end = start + old.len();
        let before_ok = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_ident_char(c));
        let after_ok = text[end..].chars().next().is_none_or(|c| !is_ident_char(c));
        if before_ok && after_ok {
            out.push_str(&text[i..start]);
            out.push_str(new);
            i = end;
        } else {
            // Not a whole-token match; step past one byte of the match so
            // overlapping candidates are still considered. Token text is
            // ASCII, so the one-byte step stays on a char boundary.
            out.push_str(&text[i..=start]);
            i = start + 1;
        }
    }
    out.push_str(&text[i..]);
    out
}

/// Apply a sequence of old → new token renamings to `text`, each anchored
/// at whole-token boundaries.
pub fn substitute_tokens(text: &str, renames: &[(Token, Token)]) -> String {
    let mut current = text.to_owned();
    for (old, new) in renames {
        if current.contains(old.as_str()) {
            current = replace_anchored(&current, old.as_str(), new.as_str());
        }
    }
    current
}
