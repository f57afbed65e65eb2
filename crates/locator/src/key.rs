//! Search key normalization.
//!
//! Users paste hashes with or without a `0x` prefix, in any case, sometimes
//! abbreviated and sometimes with extra characters. [`normalize`] turns that
//! into a canonical 64 character hash, a 72 character indexer identifier, or
//! a rejection, without touching the network.

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// Hex length of a 32-byte hash.
pub const HASH_HEX_LEN: usize = 64;
/// Hex length of a 36-byte indexer identifier.
pub const IDENTIFIER_HEX_LEN: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum InvalidKey {
    #[error("search key is empty")]
    Empty,
    #[error("bad-hex: search key contains non-hexadecimal characters")]
    BadHex,
    #[error("identifier-length key cannot be used as a block hash")]
    NotAHash,
}

/// Advisory notes attached to a normalized hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyWarning {
    /// Input was longer than a hash; only the first 64 characters are used.
    /// `trailing` holds the last 64 characters for a second attempt.
    Truncated { original_len: usize, trailing: String },
    /// Input was shorter than a hash and was left-padded with zeros.
    Padded { original_len: usize },
}

impl std::fmt::Display for KeyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyWarning::Truncated { original_len, .. } => {
                write!(
                    f,
                    "input has {original_len} hex characters, using the first {HASH_HEX_LEN}"
                )
            }
            KeyWarning::Padded { original_len } => {
                write!(
                    f,
                    "input has {original_len} hex characters, left-padded with zeros to {HASH_HEX_LEN}"
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchKey {
    Hash {
        value: String,
        warnings: Vec<KeyWarning>,
    },
    Identifier(String),
    Invalid(InvalidKey),
}

impl SearchKey {
    /// Canonical value for hash and identifier keys.
    pub fn value(&self) -> Option<&str> {
        match self {
            SearchKey::Hash { value, .. } | SearchKey::Identifier(value) => Some(value),
            SearchKey::Invalid(_) => None,
        }
    }

    pub fn warnings(&self) -> &[KeyWarning] {
        match self {
            SearchKey::Hash { warnings, .. } => warnings.as_slice(),
            _ => &[],
        }
    }

    /// The trailing 64 characters of a truncated input, if any.
    pub fn trailing_candidate(&self) -> Option<&str> {
        self.warnings().iter().find_map(|warning| {
            match warning {
                KeyWarning::Truncated { trailing, .. } => Some(trailing.as_str()),
                KeyWarning::Padded { .. } => None,
            }
        })
    }
}

/// Strips an optional `0x`/`0X` prefix and lower-cases the rest.
pub fn canonical_hex(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Classifies and canonicalizes a raw search string.
pub fn normalize(raw: &str) -> SearchKey {
    let cleaned = canonical_hex(raw);

    if cleaned.is_empty() {
        return SearchKey::Invalid(InvalidKey::Empty);
    }
    if !cleaned.bytes().all(|b| b.is_ascii_hexdigit()) {
        return SearchKey::Invalid(InvalidKey::BadHex);
    }

    let len = cleaned.len();
    if len == IDENTIFIER_HEX_LEN {
        return SearchKey::Identifier(cleaned);
    }

    let mut warnings = Vec::new();
    // All bytes are ASCII hex past this point, so byte slicing is on char boundaries.
    let value = if len > HASH_HEX_LEN {
        warnings.push(KeyWarning::Truncated {
            original_len: len,
            trailing: cleaned[len - HASH_HEX_LEN..].to_string(),
        });
        cleaned[..HASH_HEX_LEN].to_string()
    } else if len < HASH_HEX_LEN {
        warnings.push(KeyWarning::Padded { original_len: len });
        format!("{cleaned:0>width$}", width = HASH_HEX_LEN)
    } else {
        cleaned
    };

    SearchKey::Hash { value, warnings }
}
