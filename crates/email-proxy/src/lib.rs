//! Transactional email for Legal Compass
//!
//! Wraps the Resend REST API behind the [`EmailSender`] trait and enforces
//! the provider plan's global allowance:
//!
//! - 100 messages per UTC day
//! - 3000 messages per UTC month
//!
//! Notification bodies for case acceptance, new chat messages, welcome and
//! attorney verification live in [`EmailTemplate`].

pub mod quota;
pub mod sender;
pub mod types;

pub use quota::{QuotaCheck, SendQuota, DEFAULT_DAILY_LIMIT, DEFAULT_MONTHLY_LIMIT};
pub use sender::{EmailError, EmailSender, ResendSender, RESEND_API_URL};
pub use types::{
    is_valid_email, EmailTag, EmailTemplate, SendEmailRequest, SendEmailResponse,
    ValidationError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for outbound email
#[derive(Debug, Clone)]
pub struct EmailProxyConfig {
    /// Resend API key; email is disabled when absent
    pub api_key: Option<String>,

    /// Default "from" address
    pub default_from: String,

    pub daily_limit: u32,

    pub monthly_limit: u32,

    /// Maximum sends per second
    pub rate_limit_per_second: u32,
}

impl Default for EmailProxyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_from: "Legal Compass <noreply@legalcompass.app>".to_string(),
            daily_limit: DEFAULT_DAILY_LIMIT,
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
            rate_limit_per_second: 10,
        }
    }
}

impl EmailProxyConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("RESEND_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            default_from: std::env::var("EMAIL_FROM").unwrap_or(defaults.default_from),
            daily_limit: std::env::var("EMAIL_DAILY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.daily_limit),
            monthly_limit: std::env::var("EMAIL_MONTHLY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.monthly_limit),
            rate_limit_per_second: std::env::var("EMAIL_RATE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_per_second),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = EmailProxyConfig::default();
        assert_eq!(config.daily_limit, 100);
        assert_eq!(config.monthly_limit, 3000);
        assert!(!config.is_configured());
    }
}
