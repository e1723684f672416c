//! Barshop CLI - Drive a persisted cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add two 20g bars to the cart
//! barshop cart add 4b1e-choco --name "Choco Bar" --price 120 --stock 8 --variant 20g -q 2
//!
//! # Show lines and totals
//! barshop cart show
//!
//! # Apply a promo code (needs SUPABASE_URL and SUPABASE_ANON_KEY, and
//! # BARSHOP_USER_ID unless guests are allowed)
//! barshop promo apply welcome10
//!
//! # Place the order
//! barshop checkout --address "12 Market Road, Pune 411001"
//! ```
//!
//! # Commands
//!
//! - `cart` - Show, add, remove, update and clear cart lines
//! - `promo` - Apply or remove a promo code
//! - `checkout` - Submit the cart as an order

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use barshop_core::Variant;
use barshop_storefront::config::{LogFormat, StorefrontConfig};
use barshop_storefront::error::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "barshop")]
#[command(author, version, about = "Barshop cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the applied promo code
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
    /// Place an order for the cart
    Checkout {
        /// Shipping address (defaults to `BARSHOP_ADDRESS`)
        #[arg(short, long)]
        address: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines and totals
    Show,
    /// Add a product
    Add {
        /// Product id
        id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit price
        #[arg(short, long)]
        price: Decimal,

        /// Units currently in stock
        #[arg(short, long)]
        stock: u32,

        /// Protein tier
        #[arg(short, long, default_value = Variant::DEFAULT)]
        variant: Variant,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Image URL
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a line
    Remove {
        /// Product id
        id: String,

        /// Protein tier
        #[arg(short, long, default_value = Variant::DEFAULT)]
        variant: Variant,
    },
    /// Set the quantity of a line (clamped to 1..=stock)
    Update {
        /// Product id
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        /// Protein tier
        #[arg(short, long, default_value = Variant::DEFAULT)]
        variant: Variant,
    },
    /// Remove every line and the promo code
    Clear,
}

#[derive(Subcommand)]
enum PromoAction {
    /// Validate and apply a code
    Apply {
        /// Promo code (case-insensitive)
        code: String,
    },
    /// Remove the applied code
    Remove,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Initialize tracing with `EnvFilter`, the configured format, and Sentry.
fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "barshop_cli=info,barshop_storefront=info".into());

    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().without_time()))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    if let Err(e) = run(cli, config).await {
        if e.is_internal() {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Command failed");
        } else {
            tracing::debug!(error = %e, "Command rejected");
        }
        tracing::error!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<()> {
    let ctx = commands::Context::new(config, Arc::new(commands::Backend::from_env()));

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx),
            CartAction::Add {
                id,
                name,
                price,
                stock,
                variant,
                quantity,
                image,
            } => {
                let item = commands::cart::new_item(id, &name, price, stock, variant, image)?;
                commands::cart::add(&ctx, item, quantity);
            }
            CartAction::Remove { id, variant } => commands::cart::remove(&ctx, &id, &variant),
            CartAction::Update {
                id,
                quantity,
                variant,
            } => commands::cart::update(&ctx, &id, &variant, quantity),
            CartAction::Clear => commands::cart::clear(&ctx),
        },
        Commands::Promo { action } => match action {
            PromoAction::Apply { code } => commands::promo::apply(&ctx, &code).await?,
            PromoAction::Remove => commands::promo::remove(&ctx),
        },
        Commands::Checkout { address } => commands::checkout::place(&ctx, address).await?,
    }
    Ok(())
}
