//! Typed rejections surfaced by the domain services.
//!
//! Not-found is never an error here: a missing day or preference is treated
//! as its empty default. Everything else in the taxonomy gets its own
//! variant so callers can distinguish "ask the user to confirm" from
//! "reject outright" from "retry the store call".
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// The target date falls on a suspended weekday and the day is still
    /// empty. The caller must re-issue the mutation with `confirmed: true`
    /// after an explicit user decision; declining leaves no state change.
    #[error("there is no cooking scheduled for {weekday}; confirmation required")]
    ConfirmationRequired { weekday: String },

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("invalid input: {0}")]
    Validation(String),

    /// Underlying store read/write failed; safe to retry.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
