//! Storefront service binary.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::AppConfig;
use storefront::domain::events::EventPublisher;
use storefront::http::{router, AppState};
use storefront::payment::{PaymentGateway, StripeGateway};
use storefront::services::{AuthService, AuthSettings};
use storefront::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events disabled");
                None
            }
        },
        None => None,
    };

    let gateway = config.stripe_secret_key.as_ref().map(|key| {
        Arc::new(StripeGateway::new(key.clone(), config.stripe_api_base.clone())) as Arc<dyn PaymentGateway>
    });
    if !config.card_payments_enabled() {
        tracing::warn!("STRIPE_SECRET_KEY not set, card payments fall back to cash on delivery");
    }

    let events = EventPublisher::new(nats);
    tracing::info!(events = events.is_enabled(), card_payments = config.card_payments_enabled(), "services configured");

    let store = Arc::new(PgStore::new(db));
    let auth = AuthService::new(store.clone(), AuthSettings::new(config.jwt_secret.clone()));
    let state = AppState::new(store, gateway, events, auth, config.production);
    let app = router(state);

    tracing::info!("🚀 Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
