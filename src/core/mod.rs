//! Core exchange logic

pub mod exchange;

pub use exchange::{ExchangeController, ExchangeReply, MessageRelay, Outcome, RelayError};
