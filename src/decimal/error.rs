use thiserror::Error;

/// Errors produced while parsing a [`super::Decimal`] from text.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseDecimalError {
    #[error("empty decimal string")]
    Empty,
    #[error("decimal string has no integer digits")]
    MissingIntegerDigits,
    #[error("unexpected character in decimal string")]
    UnexpectedCharacter,
}

/// Errors produced by fallible decimal arithmetic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecimalError {
    #[error("division by zero")]
    DivideByZero,
    #[error("decimal arithmetic overflowed")]
    Overflow,
}
