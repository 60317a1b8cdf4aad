//! Subscription module - plan tier, status, price catalog and the per-account record.

mod catalog;
mod plan;
mod record;
mod status;

pub use catalog::PriceCatalog;
pub use plan::PlanTier;
pub use record::SubscriptionRecord;
pub use status::SubscriptionStatus;
