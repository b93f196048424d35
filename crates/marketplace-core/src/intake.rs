//! Case intake validation
//!
//! Mirrors the case submission form: every field is checked and all
//! problems are reported together so the form can highlight each one.

use serde::{Deserialize, Serialize};
use shared_types::{Urgency, UsState};

/// Minimum trimmed description length in characters
pub const MIN_DESCRIPTION_CHARS: usize = 50;
/// Maximum trimmed description length in characters
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
/// Maximum topic length in characters
pub const MAX_TOPIC_CHARS: usize = 120;

/// Raw case submission as posted by the client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseIntake {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub description: String,
}

/// A single field-level problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Intake that passed validation, with fields normalized
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCase {
    pub topic: String,
    pub state: UsState,
    pub urgency: Urgency,
    pub description: String,
}

/// Validate a case submission
pub fn validate_case(intake: &CaseIntake) -> Result<ValidatedCase, Vec<FieldError>> {
    let mut errors = Vec::new();

    let topic = intake.topic.trim();
    if topic.is_empty() {
        errors.push(FieldError::new("topic", "Topic is required"));
    } else if topic.chars().count() > MAX_TOPIC_CHARS {
        errors.push(FieldError::new(
            "topic",
            format!("Topic must be at most {} characters", MAX_TOPIC_CHARS),
        ));
    }

    let state = if intake.state.trim().is_empty() {
        errors.push(FieldError::new("state", "State is required"));
        None
    } else {
        let parsed = UsState::from_code(&intake.state);
        if parsed.is_none() {
            errors.push(FieldError::new(
                "state",
                format!("Unknown state: {}", intake.state.trim()),
            ));
        }
        parsed
    };

    let urgency = match intake.urgency.trim().to_lowercase().as_str() {
        "" => {
            errors.push(FieldError::new("urgency", "Urgency is required"));
            None
        }
        other => match other.parse::<Urgency>() {
            Ok(u) => Some(u),
            Err(_) => {
                errors.push(FieldError::new(
                    "urgency",
                    "Urgency must be one of: low, medium, high, emergency",
                ));
                None
            }
        },
    };

    let description = intake.description.trim();
    let length = description.chars().count();
    if length < MIN_DESCRIPTION_CHARS {
        errors.push(FieldError::new(
            "description",
            format!(
                "Description must be at least {} characters (currently {})",
                MIN_DESCRIPTION_CHARS, length
            ),
        ));
    } else if length > MAX_DESCRIPTION_CHARS {
        errors.push(FieldError::new(
            "description",
            format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            ),
        ));
    }

    match (state, urgency) {
        (Some(state), Some(urgency)) if errors.is_empty() => Ok(ValidatedCase {
            topic: topic.to_string(),
            state,
            urgency,
            description: description.to_string(),
        }),
        _ => Err(errors),
    }
}

/// Join field errors into one line for API error bodies
pub fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
