use anyhow::{Context, Result};

use crate::llm_client::key_pool::RateLimits;

/// Highest numbered `GEMINI_API_KEY_<n>` variable that is looked up.
const MAX_NUMBERED_KEYS: usize = 19;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub jwt_expiry_mins: i64,
    pub gemini_api_keys: Vec<String>,
    pub gemini_model: String,
    pub llm_limits: RateLimits,
    pub max_upload_bytes: usize,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub port: u16,
    pub rust_log: String,
}

/// Credentials for the admin account created on first start.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let defaults = RateLimits::default();
        let llm_limits = RateLimits {
            requests_per_minute: parse_or(&lookup, "LLM_RPM_LIMIT", defaults.requests_per_minute)?,
            requests_per_day: parse_or(&lookup, "LLM_RPD_LIMIT", defaults.requests_per_day)?,
            tokens_per_minute: parse_or(&lookup, "LLM_TPM_LIMIT", defaults.tokens_per_minute)?,
        };

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_EMAIL"),
            lookup("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(BootstrapAdmin { email, password })
            }
            _ => None,
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require("JWT_SECRET")?,
            jwt_expiry_mins: parse_or(&lookup, "JWT_EXPIRY_MINS", 720)?,
            gemini_api_keys: load_gemini_keys(&lookup),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            llm_limits,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            bootstrap_admin,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Collects `GEMINI_API_KEY_1..=19` in order, then `GEMINI_API_KEY` if it is not a repeat.
fn load_gemini_keys(lookup: &impl Fn(&str) -> Option<String>) -> Vec<String> {
    let mut keys: Vec<String> = (1..=MAX_NUMBERED_KEYS)
        .filter_map(|i| lookup(&format!("GEMINI_API_KEY_{i}")))
        .filter(|k| !k.is_empty())
        .collect();

    if let Some(single) = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
        if !keys.contains(&single) {
            keys.push(single);
        }
    }
    keys
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
