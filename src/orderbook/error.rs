use thiserror::Error;

/// Errors produced by [`super::LimitOrderBook::apply`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LobError {
    #[error("event exchange {event_exchange:?} does not match book exchange {book_exchange:?}")]
    ExchangeMismatch {
        book_exchange: String,
        event_exchange: String,
    },
}
