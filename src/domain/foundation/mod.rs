//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and the generic error type used by
//! every other domain module.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{AccountId, ReferralEventId};
pub use timestamp::Timestamp;
