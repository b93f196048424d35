//! Document template rendering
//!
//! Template bodies contain `{{field}}` markers. Rendering requires a value
//! for every marker; values are inserted verbatim after trimming.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::patterns::PLACEHOLDER;

/// Longest value accepted for a single field
pub const MAX_FIELD_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Missing values for: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Value for {0} is too long")]
    FieldTooLong(String),

    #[error("Template body has no fields")]
    NoFields,
}

/// Field names in order of first appearance
pub fn placeholders(body: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    PLACEHOLDER
        .captures_iter(body)
        .filter_map(|c| {
            let name = c[1].to_string();
            seen.insert(name.clone()).then_some(name)
        })
        .collect()
}

/// Check an admin-supplied template body
pub fn validate_body(body: &str) -> Result<Vec<String>, TemplateError> {
    let fields = placeholders(body);
    if fields.is_empty() {
        return Err(TemplateError::NoFields);
    }
    Ok(fields)
}

/// Fill every marker in `body` from `values`
pub fn render(body: &str, values: &HashMap<String, String>) -> Result<String, TemplateError> {
    let mut missing: Vec<String> = placeholders(body)
        .into_iter()
        .filter(|name| {
            values
                .get(name)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(TemplateError::MissingFields(missing));
    }

    if let Some((name, _)) = values
        .iter()
        .find(|(_, v)| v.chars().count() > MAX_FIELD_CHARS)
    {
        return Err(TemplateError::FieldTooLong(name.clone()));
    }

    let rendered = PLACEHOLDER.replace_all(body, |caps: &regex::Captures| {
        values
            .get(&caps[1])
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    });
    Ok(rendered.into_owned())
}
