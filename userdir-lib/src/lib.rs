//! Client core for the user directory service.
//!
//! [`HttpClient`] talks to the REST API, [`ListStore`] keeps the directory
//! listing in step with it, [`FormController`] validates and submits drafts,
//! and [`ConfirmationGate`] holds destructive actions until confirmed.

pub mod api;
pub mod config;
pub mod form;
pub mod gate;
pub mod model;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use api::{ApiError, HttpClient, Resource};
pub use config::{ApiConfig, ConfigError};
pub use form::{FormController, Mode, Submission};
pub use gate::{ConfirmationGate, GateState};
pub use model::{
    Draft, Entity, Gender, Profile, ProfileDraft, ProfileId, User, UserDraft, UserId,
    UserSummary,
};
pub use store::{ListStore, Refresh, StoreError};
pub use validation::{FieldErrors, RuleSet};
