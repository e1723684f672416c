//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Backend (read by [`SupabaseConfig::from_env`], only when a command
//! talks to Supabase)
//! - `SUPABASE_URL` - Supabase project URL (e.g., <https://abc.supabase.co>)
//! - `SUPABASE_ANON_KEY` - Project anon (public) API key
//! - `SUPABASE_ACCESS_TOKEN` - Signed-in customer's access token (optional)
//! - `SUPABASE_TIMEOUT_SECS` - HTTP timeout in seconds (default: 10)
//!
//! ## Storefront (all optional)
//! - `BARSHOP_USER_ID` - Signed-in customer's user id
//! - `BARSHOP_ADDRESS` - Signed-in customer's shipping address
//! - `BARSHOP_CART_DIR` - Directory for the persisted cart (default: .barshop)
//! - `BARSHOP_GUEST_PROMO_CODES` - `deny` or `allow` (default: deny)
//! - `BARSHOP_CURRENCY` - Display currency (default: INR)
//! - `BARSHOP_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use barshop_core::{CurrencyCode, UserId};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::promo::GuestPromoPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Signed-in customer, if any
    pub user_id: Option<UserId>,
    /// Shipping address of the signed-in customer
    pub address: Option<String>,
    /// Directory holding the persisted cart
    pub cart_dir: PathBuf,
    /// Promo-code handling for guests
    pub guest_promo_policy: GuestPromoPolicy,
    /// Currency prices are displayed in
    pub currency: CurrencyCode,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Supabase connection configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL
    pub url: Url,
    /// Project anon key (sent as `apikey`)
    pub anon_key: SecretString,
    /// Customer access token (sent as bearer token when present)
    pub access_token: Option<SecretString>,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let user_id = get_optional_env("BARSHOP_USER_ID")
            .filter(|s| !s.trim().is_empty())
            .map(UserId::new);
        let address = get_optional_env("BARSHOP_ADDRESS");
        let cart_dir = PathBuf::from(get_env_or_default("BARSHOP_CART_DIR", ".barshop"));
        let guest_promo_policy = parse_env("BARSHOP_GUEST_PROMO_CODES", "deny")?;
        let currency = parse_env("BARSHOP_CURRENCY", "INR")?;
        let log_format = parse_env("BARSHOP_LOG_FORMAT", "pretty")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            user_id,
            address,
            cart_dir,
            guest_promo_policy,
            currency,
            log_format,
            sentry_dsn,
        })
    }
}

impl SupabaseConfig {
    /// Load backend settings from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SUPABASE_URL` or `SUPABASE_ANON_KEY` is
    /// missing or invalid, or the anon key fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let url = Url::parse(&get_required_env("SUPABASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;
        let timeout_secs: u64 = parse_env("SUPABASE_TIMEOUT_SECS", "10")?;

        Ok(Self {
            url,
            anon_key: get_validated_secret("SUPABASE_ANON_KEY")?,
            access_token: get_optional_env("SUPABASE_ACCESS_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Supabase keys are JWTs: three base64url segments separated by dots.
fn looks_like_jwt(s: &str) -> bool {
    let segments: Vec<&str> = s.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
///
/// Placeholder detection is skipped for JWTs, whose base64 payload can
/// contain blocklisted substrings by chance.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if !looks_like_jwt(secret) {
        let lower = secret.to_lowercase();

        // Check blocklist
        for pattern in PLACEHOLDER_PATTERNS {
            if lower.contains(pattern) {
                return Err(ConfigError::InsecureSecret(
                    var_name.to_string(),
                    format!("appears to be a placeholder (contains '{pattern}')"),
                ));
            }
        }
    }

    // Check entropy (real keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key from your Supabase project settings."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
