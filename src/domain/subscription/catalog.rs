//! Price catalog: maps gateway price ids to plan tiers.

use serde::{Deserialize, Serialize};

use super::PlanTier;

/// Configured price identifiers.
///
/// Early prices are offered while the subscriber base is below
/// `early_subscriber_threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCatalog {
    pub standard_monthly_price_id: String,
    pub standard_annual_price_id: String,
    pub early_monthly_price_id: Option<String>,
    pub early_annual_price_id: Option<String>,
    pub early_subscriber_threshold: u32,
}

impl PriceCatalog {
    /// Plan tier for a price id. Any annual price is `Annual`, anything else
    /// (including a missing price) is `Monthly`.
    pub fn plan_for_price(&self, price_id: Option<&str>) -> PlanTier {
        let Some(price_id) = price_id else {
            return PlanTier::Monthly;
        };
        let is_annual = price_id == self.standard_annual_price_id
            || self.early_annual_price_id.as_deref() == Some(price_id);
        if is_annual {
            PlanTier::Annual
        } else {
            PlanTier::Monthly
        }
    }

    /// Price a new checkout for `tier` should use.
    pub fn checkout_price_id(&self, tier: PlanTier, active_subscribers: u32) -> &str {
        let early = match tier {
            PlanTier::Monthly => self.early_monthly_price_id.as_deref(),
            PlanTier::Annual => self.early_annual_price_id.as_deref(),
        };
        match early {
            Some(price) if active_subscribers < self.early_subscriber_threshold => price,
            _ => match tier {
                PlanTier::Monthly => &self.standard_monthly_price_id,
                PlanTier::Annual => &self.standard_annual_price_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PriceCatalog {
        PriceCatalog {
            standard_monthly_price_id: "price_monthly".to_string(),
            standard_annual_price_id: "price_annual".to_string(),
            early_monthly_price_id: Some("price_monthly_early".to_string()),
            early_annual_price_id: Some("price_annual_early".to_string()),
            early_subscriber_threshold: 100,
        }
    }

    #[test]
    fn annual_prices_map_to_annual_tier() {
        let catalog = catalog();
        assert_eq!(catalog.plan_for_price(Some("price_annual")), PlanTier::Annual);
        assert_eq!(
            catalog.plan_for_price(Some("price_annual_early")),
            PlanTier::Annual
        );
    }

    #[test]
    fn everything_else_maps_to_monthly() {
        let catalog = catalog();
        assert_eq!(catalog.plan_for_price(Some("price_monthly")), PlanTier::Monthly);
        assert_eq!(catalog.plan_for_price(Some("price_unknown")), PlanTier::Monthly);
        assert_eq!(catalog.plan_for_price(None), PlanTier::Monthly);
    }

    #[test]
    fn early_price_offered_below_threshold() {
        let catalog = catalog();
        assert_eq!(
            catalog.checkout_price_id(PlanTier::Monthly, 99),
            "price_monthly_early"
        );
        assert_eq!(catalog.checkout_price_id(PlanTier::Monthly, 100), "price_monthly");
        assert_eq!(catalog.checkout_price_id(PlanTier::Annual, 0), "price_annual_early");
    }

    #[test]
    fn standard_price_when_no_early_price_configured() {
        let mut catalog = catalog();
        catalog.early_annual_price_id = None;
        assert_eq!(catalog.checkout_price_id(PlanTier::Annual, 0), "price_annual");
    }
}
