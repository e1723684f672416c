//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod promo;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use barshop_core::{OrderId, PromoCodeText, UserId};
use barshop_storefront::cart::CartStore;
use barshop_storefront::checkout::{Checkout, OrderDraft, OrderGateway, OrderOutcome};
use barshop_storefront::config::{ConfigError, StorefrontConfig, SupabaseConfig};
use barshop_storefront::promo::{AppliedPromo, PromoAuthority};
use barshop_storefront::storage::FileStorage;
use barshop_storefront::supabase::{SupabaseClient, SupabaseError};
use tracing::debug;

/// Everything a command needs: the persisted cart, checkout and settings.
pub struct Context {
    pub store: CartStore,
    pub checkout: Checkout,
    pub config: StorefrontConfig,
}

impl Context {
    /// Open the cart in the configured directory.
    ///
    /// Nothing talks to `backend` until a command validates a promo code or
    /// places an order.
    pub fn new(config: StorefrontConfig, backend: Arc<Backend>) -> Self {
        let storage = Arc::new(FileStorage::new(config.cart_dir.clone()));
        debug!(dir = %storage.dir().display(), "opening cart");

        let store = CartStore::open(storage, backend.clone(), config.guest_promo_policy);
        let checkout = Checkout::new(backend);

        Self {
            store,
            checkout,
            config,
        }
    }
}

// =============================================================================
// Backend
// =============================================================================

type ConfigLoader = fn() -> Result<SupabaseConfig, ConfigError>;

/// Supabase client built on first use.
///
/// Local cart edits never need backend credentials, so settings are only
/// read when a promo code is validated or an order is placed.
pub struct Backend {
    load: ConfigLoader,
    client: OnceLock<SupabaseClient>,
}

impl Backend {
    /// Backend configured from `SUPABASE_*` environment variables.
    pub fn from_env() -> Self {
        Self::with_loader(SupabaseConfig::from_env)
    }

    fn with_loader(load: ConfigLoader) -> Self {
        Self {
            load,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&SupabaseClient, SupabaseError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = SupabaseClient::new(&(self.load)()?)?;
        debug!(?client, "connected to Supabase");
        Ok(self.client.get_or_init(|| client))
    }
}

#[async_trait]
impl PromoAuthority for Backend {
    async fn can_use_code(
        &self,
        code: &PromoCodeText,
        user_id: &UserId,
    ) -> Result<bool, SupabaseError> {
        self.client()?.can_use_code(code, user_id).await
    }

    async fn lookup_active_code(
        &self,
        code: &PromoCodeText,
    ) -> Result<Option<AppliedPromo>, SupabaseError> {
        self.client()?.lookup_active_code(code).await
    }
}

#[async_trait]
impl OrderGateway for Backend {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderOutcome, SupabaseError> {
        self.client()?.create_order(draft).await
    }

    async fn record_promo_usage(
        &self,
        code: &PromoCodeText,
        order_id: &OrderId,
        user_id: &UserId,
    ) -> Result<(), SupabaseError> {
        self.client()?
            .record_promo_usage(code, order_id, user_id)
            .await
    }
}
