//! Reversible, salted encoding of 64-bit identifiers into short alphanumeric tokens.

pub mod base62;
pub mod token;

pub use token::TokenKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid token length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Invalid symbol {0:?}")]
    InvalidSymbol(char),
    #[error("Encoded value does not fit in 64 bits")]
    Overflow,
}
