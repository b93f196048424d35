//! Server configuration
//!
//! Every option can come from the command line or the environment; `.env`
//! is loaded before parsing.

use clap::Parser;
use email_proxy::EmailProxyConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "compass-api")]
#[command(about = "Legal Compass API server")]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite connection string; defaults to a file in the platform data dir
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Secret used to sign access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    #[arg(long, env = "STRIPE_WEBHOOK_SECRET", hide_env_values = true)]
    pub stripe_webhook_secret: Option<String>,

    /// Price charged per accepted lead, in cents
    #[arg(long, env = "STRIPE_LEAD_PRICE_CENTS", default_value = "4900")]
    pub stripe_lead_price_cents: i64,

    /// Recurring price for the pro subscription
    #[arg(long, env = "STRIPE_PRO_PRICE_ID")]
    pub stripe_pro_price_id: Option<String>,

    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    #[arg(
        long,
        env = "EMAIL_FROM",
        default_value = "Legal Compass <noreply@legalcompass.app>"
    )]
    pub email_from: String,

    /// OpenAI-compatible chat completions endpoint
    #[arg(long, env = "AI_GATEWAY_URL")]
    pub ai_gateway_url: Option<String>,

    #[arg(long, env = "AI_GATEWAY_KEY", hide_env_values = true)]
    pub ai_gateway_key: Option<String>,

    #[arg(long, env = "AI_MODEL", default_value = "google/gemini-2.5-flash")]
    pub ai_model: String,

    /// Public URL of the web app, used in email links and checkout redirects
    #[arg(long, env = "APP_BASE_URL", default_value = "http://localhost:5173")]
    pub app_base_url: String,

    /// Rate limit: requests per second per IP
    #[arg(long, env = "RATE_LIMIT", default_value = "10")]
    pub rate_limit: u32,

    /// Admin account created at startup when missing
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Minimal configuration with every outbound integration disabled
    pub fn local(jwt_secret: &str) -> Self {
        Self {
            port: 3001,
            host: "127.0.0.1".to_string(),
            database_url: Some("sqlite::memory:".to_string()),
            jwt_secret: jwt_secret.to_string(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_lead_price_cents: 4900,
            stripe_pro_price_id: None,
            resend_api_key: None,
            email_from: "Legal Compass <noreply@legalcompass.app>".to_string(),
            ai_gateway_url: None,
            ai_gateway_key: None,
            ai_model: "google/gemini-2.5-flash".to_string(),
            app_base_url: "http://localhost:5173".to_string(),
            rate_limit: 10,
            admin_email: None,
            admin_password: None,
            verbose: false,
            log_json: false,
        }
    }

    pub fn email(&self) -> EmailProxyConfig {
        EmailProxyConfig {
            api_key: self.resend_api_key.clone().filter(|k| !k.trim().is_empty()),
            default_from: self.email_from.clone(),
            ..EmailProxyConfig::default()
        }
    }

    /// Link into the web app
    pub fn app_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.app_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
