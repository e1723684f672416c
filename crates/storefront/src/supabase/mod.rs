//! Supabase (`PostgREST`) client.
//!
//! # Endpoints
//!
//! - `rpc/can_use_promo_code` - server-side usage-limit check
//! - `promo_codes` - active code lookup and id resolution
//! - `rpc/create_order_with_items` - atomic order creation with stock checks
//! - `promo_code_usage` - redemption records
//!
//! Requests carry the project's anon key as `apikey` and either the signed-in
//! customer's access token or the anon key as the bearer token, so row-level
//! security applies as it would in the browser.

pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use barshop_core::{OrderId, PromoCodeText, UserId};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::checkout::{OrderDraft, OrderGateway, OrderOutcome};
use crate::config::{ConfigError, SupabaseConfig};
use crate::promo::{AppliedPromo, PromoAuthority};

use types::{CanUsePromoCodeArgs, PromoCodeIdRow, PromoCodeRow, PromoCodeUsageInsert};

/// Response bodies are truncated to this many characters in logs.
const LOGGED_BODY_CHARS: usize = 500;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Truncated response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A row was well-formed JSON but violates domain rules.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Backend settings are missing or invalid.
    #[error("Supabase not configured: {0}")]
    NotConfigured(#[from] ConfigError),
}

// =============================================================================
// SupabaseClient
// =============================================================================

/// Client for the Supabase REST API.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: Url,
    anon_key: String,
    bearer: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the project URL
    /// cannot be extended with `/rest/v1/`.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let rest_url = rest_base(&config.url)?;
        let anon_key = config.anon_key.expose_secret().to_string();
        let bearer = config
            .access_token
            .as_ref()
            .map_or_else(|| anon_key.clone(), |t| t.expose_secret().to_string());

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                rest_url,
                anon_key,
                bearer,
            }),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, SupabaseError> {
        let mut url = self.inner.rest_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(&self.inner.bearer)
    }

    /// Send a request and return the raw body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, SupabaseError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SupabaseError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate(&body, LOGGED_BODY_CHARS),
                "Supabase returned non-success status"
            );
            return Err(SupabaseError::Status {
                status,
                body: truncate(&body, 200),
            });
        }

        Ok(body)
    }

    /// Send a request and parse the JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, SupabaseError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body, LOGGED_BODY_CHARS),
                "Failed to parse Supabase response"
            );
            SupabaseError::Parse(e)
        })
    }
}

#[async_trait]
impl PromoAuthority for SupabaseClient {
    #[instrument(skip(self, code), fields(code = %code))]
    async fn can_use_code(
        &self,
        code: &PromoCodeText,
        user_id: &UserId,
    ) -> Result<bool, SupabaseError> {
        let url = self.endpoint("rpc/can_use_promo_code", &[])?;
        let args = CanUsePromoCodeArgs {
            promo_code_text: code.as_str(),
            user_id,
        };

        let allowed: bool = self
            .send_json(self.request(Method::POST, url).json(&args))
            .await?;
        debug!(allowed, "usage check complete");
        Ok(allowed)
    }

    #[instrument(skip(self, code), fields(code = %code))]
    async fn lookup_active_code(
        &self,
        code: &PromoCodeText,
    ) -> Result<Option<AppliedPromo>, SupabaseError> {
        let code_filter = format!("eq.{code}");
        let url = self.endpoint(
            "promo_codes",
            &[
                ("select", "code,discount_percentage"),
                ("code", code_filter.as_str()),
                ("active", "eq.true"),
                ("limit", "1"),
            ],
        )?;

        let rows: Vec<PromoCodeRow> = self.send_json(self.request(Method::GET, url)).await?;
        rows.into_iter()
            .next()
            .map(AppliedPromo::try_from)
            .transpose()
    }
}

#[async_trait]
impl OrderGateway for SupabaseClient {
    #[instrument(skip(self, draft), fields(lines = draft.items.len(), total = %draft.total_price))]
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderOutcome, SupabaseError> {
        let url = self.endpoint("rpc/create_order_with_items", &[])?;
        let rows: Vec<OrderOutcome> = self
            .send_json(self.request(Method::POST, url).json(draft))
            .await?;

        rows.into_iter().next().ok_or_else(|| {
            SupabaseError::InvalidRow("create_order_with_items returned no rows".to_string())
        })
    }

    #[instrument(skip(self, code, order_id), fields(code = %code, order_id = %order_id))]
    async fn record_promo_usage(
        &self,
        code: &PromoCodeText,
        order_id: &OrderId,
        user_id: &UserId,
    ) -> Result<(), SupabaseError> {
        let code_filter = format!("eq.{code}");
        let url = self.endpoint(
            "promo_codes",
            &[("select", "id"), ("code", code_filter.as_str()), ("limit", "1")],
        )?;
        let rows: Vec<PromoCodeIdRow> = self.send_json(self.request(Method::GET, url)).await?;
        let promo = rows
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(format!("promo code {code}")))?;

        let url = self.endpoint("promo_code_usage", &[])?;
        let insert = PromoCodeUsageInsert {
            promo_code_id: &promo.id,
            order_id,
            user_id,
        };
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", "return=minimal")
                .json(&insert),
        )
        .await?;

        debug!("promo usage recorded");
        Ok(())
    }
}

/// `<project>/rest/v1/`, keeping any path prefix of the project URL.
fn rest_base(project_url: &Url) -> Result<Url, url::ParseError> {
    let mut base = project_url.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join("rest/v1/")
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_base() {
        let url = Url::parse("https://abc.supabase.co").unwrap();
        assert_eq!(
            rest_base(&url).unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/"
        );

        let prefixed = Url::parse("http://localhost:54321/proxy").unwrap();
        assert_eq!(
            rest_base(&prefixed).unwrap().as_str(),
            "http://localhost:54321/proxy/rest/v1/"
        );
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("₹₹₹₹", 2), "₹₹");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[test]
    fn test_error_display() {
        let err = SupabaseError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");

        let err = SupabaseError::NotFound("promo code SAVE10".to_string());
        assert_eq!(err.to_string(), "Not found: promo code SAVE10");

        let err = SupabaseError::from(ConfigError::MissingEnvVar("SUPABASE_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Supabase not configured: Missing environment variable: SUPABASE_URL"
        );
    }
}
