// Mirrors `obv_lexer::lexer::error::LexerError`: a plain enum with a
// `#[serde(rename)]` tag per variant, a hand-written `Display`, and an
// empty `std::error::Error` impl rather than pulling in `thiserror` — the
// teacher already has an idiom for this, so it's kept rather than swapped.

use std::fmt;

use serde::Serialize;

/// The six failure kinds a match attempt can surface (spec §7). There are
/// no machine error codes beyond the `#[serde(rename)]` tag; these are
/// meant for a human-readable "reason" string, not a stable wire protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ShorthandError {
    /// Input ran out while a variable or literal was expected.
    #[serde(rename = "input_exhausted")]
    InputExhausted { message: String },

    /// The expected literal was not found at the current position.
    #[serde(rename = "literal_mismatch")]
    LiteralMismatch { message: String },

    /// The template matched but non-whitespace input remains.
    #[serde(rename = "trailing_input")]
    TrailingInput { remainder: String },

    /// A dotted variable assignment hit a non-mapping intermediate.
    #[serde(rename = "path_conflict")]
    PathConflict { message: String },

    /// The template itself has an unexpected token shape, a malformed
    /// `?${...}`, or an unbalanced `]`. A bug in the template, not the
    /// input; never suppressed by optional-block backtracking.
    #[serde(rename = "malformed_template")]
    MalformedTemplate { template: String, message: String },

    /// A quoted span in the template or input was left unterminated.
    #[serde(rename = "tokenizer_failure")]
    TokenizerFailure { message: String },
}

impl ShorthandError {
    /// True for `MalformedTemplate`, the one error kind optional-block
    /// backtracking must never suppress (spec §7).
    pub fn is_malformed_template(&self) -> bool {
        matches!(self, ShorthandError::MalformedTemplate { .. })
    }
}

impl fmt::Display for ShorthandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShorthandError::InputExhausted { message } => write!(f, "{}", message),
            ShorthandError::LiteralMismatch { message } => write!(f, "{}", message),
            ShorthandError::TrailingInput { remainder } => write!(
                f,
                "Input has trailing characters after template is matched: '{}'",
                remainder
            ),
            ShorthandError::PathConflict { message } => write!(f, "{}", message),
            ShorthandError::MalformedTemplate { template, message } => {
                write!(f, "Malformed shorthand template '{}': {}", template, message)
            }
            ShorthandError::TokenizerFailure { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ShorthandError {}
