//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `account` - The engine's view of a user account
//! - `subscription` - Plan tier, status and the per-account record
//! - `referral` - Referral lifecycle and reward rules
//! - `webhook` - Signature verification and the event envelope

pub mod account;
pub mod foundation;
pub mod referral;
pub mod subscription;
pub mod webhook;
