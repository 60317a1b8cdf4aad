//! Application layer - Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    Disposition, EngineSettings, ReconcileError, ReconcileReport, ReconciliationEngine, Step,
    StepOutcome,
};
