//! Application state for the Legal Compass API

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use email_proxy::{EmailSender, ResendSender};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::Config;
use crate::gateway::{OpenAiGateway, ResearchGateway};
use crate::realtime::RealtimeHub;
use crate::stripe::StripeClient;

pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub realtime: RealtimeHub,
    pub email: Option<Arc<dyn EmailSender>>,
    pub stripe: Option<StripeClient>,
    pub gateway: Option<Arc<dyn ResearchGateway>>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let db_url = config.database_url.clone().unwrap_or_else(|| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("legal-compass");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/compass.db?mode=rwc", data_dir.display())
        });

        info!("Connecting to database: {}", db_url);
        let db = connect(&db_url, 5).await?;

        let email = ResendSender::from_config(&config.email())
            .map(|sender| Arc::new(sender) as Arc<dyn EmailSender>);
        if email.is_none() {
            warn!("RESEND_API_KEY not set; email notifications disabled");
        }

        let stripe = config
            .stripe_secret_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .map(StripeClient::new);
        if stripe.is_none() {
            warn!("STRIPE_SECRET_KEY not set; checkout disabled");
        }

        let gateway = match (&config.ai_gateway_url, &config.ai_gateway_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some(Arc::new(
                OpenAiGateway::new(url, key, &config.ai_model),
            )
                as Arc<dyn ResearchGateway>),
            _ => {
                warn!("AI gateway not configured; legal research disabled");
                None
            }
        };

        Ok(Self {
            db,
            config,
            realtime: RealtimeHub::default(),
            email,
            stripe,
            gateway,
        })
    }

    /// State over an existing pool with no outbound integrations
    pub fn with_pool(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            config,
            realtime: RealtimeHub::default(),
            email: None,
            stripe: None,
            gateway: None,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ResearchGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_email(mut self, email: Arc<dyn EmailSender>) -> Self {
        self.email = Some(email);
        self
    }

    /// Create the configured admin account if it does not exist yet
    pub async fn ensure_admin(&self) -> Result<()> {
        let (Some(email), Some(password)) =
            (&self.config.admin_email, &self.config.admin_password)
        else {
            return Ok(());
        };
        let email = email.trim().to_lowercase();

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM profiles WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;
        if exists.is_some() {
            return Ok(());
        }

        let hash = shared_crypto::hash_password(password).context("hashing admin password")?;
        let now = chrono::Utc::now();
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, full_name, role, tier, password_hash, created_at, updated_at)
            VALUES (?, ?, 'Administrator', 'admin', 'pro', ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&email)
        .bind(&hash)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        info!(email = %email, "Created admin account");
        Ok(())
    }
}

/// Open a pool and bring the schema up to date
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('client', 'attorney', 'admin')),
            tier TEXT NOT NULL DEFAULT 'free' CHECK (tier IN ('free', 'pro')),
            password_hash TEXT NOT NULL,
            stripe_customer_id TEXT,
            research_queries_used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS lawyer_profiles (
            user_id TEXT PRIMARY KEY REFERENCES profiles(id) ON DELETE CASCADE,
            bar_number TEXT NOT NULL,
            licensed_states TEXT NOT NULL DEFAULT '[]',
            practice_areas TEXT NOT NULL DEFAULT '[]',
            years_experience INTEGER NOT NULL DEFAULT 0,
            bio TEXT NOT NULL DEFAULT '',
            hourly_rate_cents INTEGER,
            verified INTEGER NOT NULL DEFAULT 0,
            rating_avg REAL NOT NULL DEFAULT 0,
            rating_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS cases (
            id TEXT PRIMARY KEY,
            client_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            topic TEXT NOT NULL,
            state TEXT NOT NULL,
            urgency TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS lead_purchases (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL UNIQUE REFERENCES cases(id) ON DELETE CASCADE,
            attorney_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            payment_status TEXT NOT NULL DEFAULT 'pending',
            amount_cents INTEGER NOT NULL DEFAULT 0,
            stripe_session_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
            sender_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            attachments TEXT NOT NULL DEFAULT '[]',
            read_by_recipient INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS templates (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            category TEXT NOT NULL,
            state TEXT,
            description TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS template_usage (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            attorney_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            client_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            case_id TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (case_id, client_id)
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_cases_client ON cases(client_id)",
        "CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status)",
        "CREATE INDEX IF NOT EXISTS idx_purchases_attorney ON lead_purchases(attorney_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_messages_case ON messages(case_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_usage_user ON template_usage(user_id)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Migrations complete");
    Ok(())
}

/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
