use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResearchError {
    /// Free research queries are used up; the caller should offer an upgrade
    #[error("{message}")]
    TrialExhausted { message: String },

    #[error("Research request failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Could not reach research service: {0}")]
    Transport(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    trial_exhausted: bool,
}

impl ResearchError {
    /// Map a non-success response to a typed error
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| b.error.clone())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        let exhausted = parsed.map(|b| b.trial_exhausted).unwrap_or(false);
        if exhausted && matches!(status, 402 | 403) {
            ResearchError::TrialExhausted { message }
        } else {
            ResearchError::Http { status, message }
        }
    }

    pub fn is_trial_exhausted(&self) -> bool {
        matches!(self, ResearchError::TrialExhausted { .. })
    }
}

impl From<reqwest::Error> for ResearchError {
    fn from(e: reqwest::Error) -> Self {
        ResearchError::Transport(e.to_string())
    }
}
