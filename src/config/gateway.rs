//! Payment gateway configuration (Stripe)

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;

/// Stripe credentials and API settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub stripe_api_key: String,

    /// Shared secret for webhook signatures
    pub stripe_webhook_secret: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// ISO currency code used for balance credits
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Drop test-mode events instead of reconciling them
    #[serde(default)]
    pub require_livemode: bool,
}

impl GatewayConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    pub fn api_key(&self) -> SecretString {
        SecretString::new(self.stripe_api_key.clone())
    }

    pub fn webhook_secret(&self) -> SecretString {
        SecretString::new(self.stripe_webhook_secret.clone())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__STRIPE_WEBHOOK_SECRET"));
        }
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !is_http_url(&self.api_base_url) {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            currency: default_currency(),
            require_livemode: false,
        }
    }
}

pub(super) fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}
