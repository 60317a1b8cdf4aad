//! Billing Reconciler - Webhook-driven subscription and referral-credit engine
//!
//! This crate consumes signed payment-gateway events and converges local
//! subscription, entitlement and referral-credit state onto them. Every
//! branch tolerates duplicate and concurrent delivery of the same event.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
