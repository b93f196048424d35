//! Business rules for the Legal Compass marketplace
//!
//! Pure functions only: the API server loads rows, asks these modules
//! whether an action is allowed, then writes the result.

pub mod intake;
pub mod lifecycle;
pub mod patterns;
pub mod quotas;
pub mod ratings;
pub mod templates;

pub use intake::{validate_case, CaseIntake, FieldError, ValidatedCase};
pub use lifecycle::{transition, Actor, TransitionError};
pub use quotas::{QuotaError, TierLimits};
pub use templates::TemplateError;
