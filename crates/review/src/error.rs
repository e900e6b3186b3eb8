//! Errors raised by the review core.
//!
//! - [`ReviewError`] is what callers of [`ReviewSession`] and
//!   [`TransitionDispatcher`] see.
//! - [`ServiceError`] is what collaborator implementations (HTTP client,
//!   fakes) return; it is wrapped by [`ReviewError::Update`] and
//!   [`ReviewError::Load`].
//!
//! Failures of the best-effort effects (points, rejection notice, queue
//! count) never reach callers: they are only logged.
//!
//!  [`ReviewSession`]: crate::ReviewSession
//!  [`TransitionDispatcher`]: crate::TransitionDispatcher
use thiserror::Error;

use crate::form::ValidationGap;

/// Review core errors.
#[derive(Error, Debug, PartialEq)]
pub enum ReviewError {
    #[error(transparent)]
    Validation(#[from] ValidationGap),
    #[error("a rejection reason is required")]
    MissingRejectReason,
    #[error("no pending invoice is loaded")]
    NoPendingRecord,
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("update failed: {0}")]
    Update(ServiceError),
    #[error("load failed: {0}")]
    Load(ServiceError),
    #[error("cannot compute the skip date from {0}")]
    ClockOutOfRange(chrono::NaiveDateTime),
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Error returned by a remote collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("{status}: {message}")]
    Server { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
}
