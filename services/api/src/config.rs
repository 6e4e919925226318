//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development. API keys are optional: a
//! missing key disables the corresponding capability instead of failing
//! startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use habitchat_core::{PlanPricing, QuotaPolicy};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which backend the user store runs on.
#[derive(Clone, Debug)]
pub enum StoreBackend {
    /// Hosted table, one row per identifier.
    Postgres { database_url: String },
    /// Local whole-file JSON document keyed by identifier.
    JsonFile { path: PathBuf },
}

/// Billing vendor credentials and per-tier vendor plan ids. Present only
/// when the key pair is configured.
#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub plan_id_silver: String,
    pub plan_id_gold: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store: StoreBackend,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub chat_max_tokens: u32,
    pub chat_temperature: f32,
    pub chat_memoize: bool,
    pub quota: QuotaPolicy,
    pub pricing: PlanPricing,
    pub payments: Option<PaymentConfig>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure tests
    /// are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server and Logging ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Storage Selection ---
        // DATABASE_URL wins; otherwise fall back to the local JSON file.
        let store = match std::env::var("DATABASE_URL") {
            Ok(database_url) => StoreBackend::Postgres { database_url },
            Err(_) => {
                let path = std::env::var("STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./data/users.json"));
                StoreBackend::JsonFile { path }
            }
        };

        // --- Generation Collaborator (optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let chat_max_tokens = parse_var("CHAT_MAX_TOKENS", 512u32)?;
        let chat_temperature = parse_var("CHAT_TEMPERATURE", 0.7f32)?;
        let chat_memoize = parse_var("CHAT_MEMOIZE", false)?;

        // --- Plan Policy ---
        let default_quota = QuotaPolicy::default();
        let quota = QuotaPolicy {
            free: parse_var("QUOTA_FREE", default_quota.free)?,
            silver: parse_var("QUOTA_SILVER", default_quota.silver)?,
            gold: parse_var("QUOTA_GOLD", default_quota.gold)?,
        };
        let default_pricing = PlanPricing::default();
        let pricing = PlanPricing {
            silver: parse_var("PLAN_SILVER_PRICE", default_pricing.silver)?,
            gold: parse_var("PLAN_GOLD_PRICE", default_pricing.gold)?,
        };

        // --- Billing Collaborator (optional, key pair required together) ---
        let payments = match (
            std::env::var("RAZORPAY_KEY_ID"),
            std::env::var("RAZORPAY_KEY_SECRET"),
        ) {
            (Ok(key_id), Ok(key_secret)) => Some(PaymentConfig {
                key_id,
                key_secret,
                base_url: std::env::var("RAZORPAY_BASE_URL")
                    .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
                plan_id_silver: std::env::var("RAZORPAY_PLAN_SILVER")
                    .unwrap_or_else(|_| "plan_silver".to_string()),
                plan_id_gold: std::env::var("RAZORPAY_PLAN_GOLD")
                    .unwrap_or_else(|_| "plan_gold".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bind_address,
            store,
            log_level,
            openai_api_key,
            chat_model,
            chat_max_tokens,
            chat_temperature,
            chat_memoize,
            quota,
            pricing,
            payments,
        })
    }
}

/// Parses an optional environment variable, falling back to `default` when
/// it is unset and failing loudly when it is set but unparsable.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
