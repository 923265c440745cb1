use std::io;
use thiserror::Error;

use crate::rules::GrammarKind;

/// Custom error types for grammar construction and loading
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unknown grammar kind: {0}")]
    UnknownGrammarKind(String),

    #[error("Invalid symbol '{0}': symbols must be single characters")]
    InvalidSymbol(String),

    #[error("Symbol '{0}' is declared both as a non-terminal and a terminal")]
    OverlappingAlphabet(char),

    #[error("Invalid grammar rule: '{0}' is not a declared non-terminal")]
    UndeclaredNonTerminal(char),

    #[error("Invalid grammar rule {rule}: symbol '{symbol}' is not declared")]
    UndeclaredSymbol { symbol: char, rule: String },

    #[error("Start symbol '{0}' is not a declared non-terminal")]
    InvalidStartSymbol(char),

    #[error("{0} grammars cannot hold this kind of rule")]
    RuleKindMismatch(GrammarKind),

    #[error("Empty production: {0}")]
    EmptyProduction(String),

    #[error("Invalid derivation: {0}")]
    InvalidDerivation(String),
}

impl GrammarError {
    /// True for errors describing a structurally invalid grammar definition,
    /// as opposed to I/O or encoding failures.
    pub fn is_format_error(&self) -> bool {
        !matches!(
            self,
            GrammarError::Io(_) | GrammarError::Json(_) | GrammarError::InvalidDerivation(_)
        )
    }
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Number of symbols in a word. Symbols are characters, not bytes.
pub fn word_len(word: &str) -> usize {
    word.chars().count()
}

/// Replace the leftmost occurrence of `symbol` in `word` with `replacement`.
///
/// Returns `None` when the symbol does not occur.
pub fn replace_first(word: &str, symbol: char, replacement: &str) -> Option<String> {
    let index = word.find(symbol)?;
    let mut result = String::with_capacity(word.len() + replacement.len());
    result.push_str(&word[..index]);
    result.push_str(replacement);
    result.push_str(&word[index + symbol.len_utf8()..]);
    Some(result)
}

/// Convert a declared symbol token into a character.
pub fn parse_symbol(token: &str) -> Result<char> {
    let token = token.trim();
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(GrammarError::InvalidSymbol(token.to_string())),
    }
}
