//! Invoice review flow.
//!
//! An agent gets one pending invoice at a time, corrects the pre-filled form
//! and approves, rejects or skips it. [`ReviewSession`] drives the cycle;
//! the remote services are behind the traits in [`services`].

pub use dispatcher::{
    Action, NextRecord, TransitionDispatcher, TransitionReport, TransitionResult, TransitionState,
    build_payload,
};
pub use effects::BackgroundEffects;
pub use error::{ReviewError, ServiceError};
pub use form::{FormError, FormField, Presentation, ReviewForm, ReviewFormState, ValidationGap};
pub use services::{
    AgentContext, AgentQueue, EstablishmentDirectory, Loyalty, Notifier, QueueBadge, Rejections,
};
pub use session::{ReviewSession, ReviewSessionBuilder};

pub mod dates;
pub mod establishments;
pub mod identifier;
pub mod services;

mod dispatcher;
mod effects;
mod error;
mod form;
mod session;
