//! Plan pricing configuration

use serde::Deserialize;

use crate::domain::subscription::PriceCatalog;

use super::error::ValidationError;
use super::gateway::is_http_url;

/// Gateway price identifiers per plan tier.
///
/// The early prices apply while the active subscriber count is below
/// `early_subscriber_threshold`.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    pub standard_monthly_price_id: String,
    pub standard_annual_price_id: String,
    pub early_monthly_price_id: Option<String>,
    pub early_annual_price_id: Option<String>,
    #[serde(default)]
    pub early_subscriber_threshold: u32,

    /// Default return/callback base URL for checkout flows
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

impl PricingConfig {
    pub fn catalog(&self) -> PriceCatalog {
        PriceCatalog {
            standard_monthly_price_id: self.standard_monthly_price_id.clone(),
            standard_annual_price_id: self.standard_annual_price_id.clone(),
            early_monthly_price_id: self.early_monthly_price_id.clone(),
            early_annual_price_id: self.early_annual_price_id.clone(),
            early_subscriber_threshold: self.early_subscriber_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.standard_monthly_price_id.is_empty() {
            return Err(ValidationError::MissingRequired("PRICING__STANDARD_MONTHLY_PRICE_ID"));
        }
        if self.standard_annual_price_id.is_empty() {
            return Err(ValidationError::MissingRequired("PRICING__STANDARD_ANNUAL_PRICE_ID"));
        }
        if self.early_subscriber_threshold > 0
            && self.early_monthly_price_id.is_none()
            && self.early_annual_price_id.is_none()
        {
            return Err(ValidationError::EarlyPricingIncomplete);
        }
        if !is_http_url(&self.app_base_url) {
            return Err(ValidationError::InvalidAppBaseUrl);
        }
        Ok(())
    }
}

fn default_app_base_url() -> String {
    "http://localhost:5173".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::PlanTier;

    fn pricing() -> PricingConfig {
        PricingConfig {
            standard_monthly_price_id: "price_m".to_string(),
            standard_annual_price_id: "price_a".to_string(),
            early_monthly_price_id: Some("price_em".to_string()),
            early_annual_price_id: Some("price_ea".to_string()),
            early_subscriber_threshold: 100,
            app_base_url: "https://app.example.com".to_string(),
        }
    }

    #[test]
    fn catalog_carries_every_price() {
        let catalog = pricing().catalog();
        assert_eq!(catalog.plan_for_price(Some("price_ea")), PlanTier::Annual);
        assert_eq!(catalog.checkout_price_id(PlanTier::Monthly, 10), "price_em");
        assert_eq!(catalog.checkout_price_id(PlanTier::Monthly, 100), "price_m");
    }

    #[test]
    fn threshold_without_early_prices_is_rejected() {
        let config = PricingConfig {
            early_monthly_price_id: None,
            early_annual_price_id: None,
            ..pricing()
        };
        assert_eq!(config.validate(), Err(ValidationError::EarlyPricingIncomplete));
    }

    #[test]
    fn app_base_url_must_be_http() {
        let config = PricingConfig {
            app_base_url: "app.example.com".to_string(),
            ..pricing()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidAppBaseUrl));
        assert!(pricing().validate().is_ok());
    }
}
