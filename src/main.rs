use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use billing_reconciler::adapters::http::{app, WebhookAppState};
use billing_reconciler::adapters::postgres::{
    PostgresAccountStore, PostgresReferralLedger, PostgresSubscriptionStore,
};
use billing_reconciler::adapters::stripe::StripeGateway;
use billing_reconciler::application::handlers::reconciliation::ReconciliationEngine;
use billing_reconciler::config::{AppConfig, LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.server);
    config.validate().context("validating configuration")?;

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("connecting to database")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        info!("Database migrations applied");
    }

    let engine = ReconciliationEngine::new(
        config.engine_settings(),
        Arc::new(StripeGateway::new(config.stripe_config())),
        Arc::new(PostgresAccountStore::new(pool.clone())),
        Arc::new(PostgresSubscriptionStore::new(pool.clone())),
        Arc::new(PostgresReferralLedger::new(pool)),
    );
    let router = app(WebhookAppState::new(Arc::new(engine)));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(
        %addr,
        environment = ?config.server.environment,
        livemode_required = config.gateway.require_livemode,
        "Billing reconciler listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Billing reconciler stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match server.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
