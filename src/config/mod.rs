//! Application configuration module
//!
//! Configuration is read once at startup from environment variables using
//! the `config` and `dotenvy` crates. Variables carry the
//! `BILLING_RECONCILER` prefix and nested values are separated by `__`.
//!
//! # Example
//!
//! ```no_run
//! use billing_reconciler::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod gateway;
mod pricing;
mod rewards;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use pricing::PricingConfig;
pub use rewards::RewardsConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

use crate::adapters::stripe::StripeConfig;
use crate::application::handlers::reconciliation::EngineSettings;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub gateway: GatewayConfig,

    pub rewards: RewardsConfig,

    pub pricing: PricingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `BILLING_RECONCILER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BILLING_RECONCILER__GATEWAY__STRIPE_API_KEY=...` -> `gateway.stripe_api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed into its field type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BILLING_RECONCILER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.rewards.validate()?;
        self.pricing.validate()?;
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            webhook_secret: self.gateway.webhook_secret(),
            require_livemode: self.gateway.require_livemode,
            reward_period_value: self.rewards.reward_period_value,
            catalog: self.pricing.catalog(),
        }
    }

    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig::new(self.gateway.api_key())
            .with_base_url(self.gateway.api_base_url.clone())
            .with_currency(self.gateway.currency.clone())
    }
}
