//! ProcureSense Orchestrator - policy-governed multi-agent procurement
//! service.
//!
//! Routes requests to one of three specialist agents (Negotiation,
//! Compliance, Forecast) through a token-budgeted layered context, runs an
//! independent policy critic over the agent's output, and tracks rolling
//! compliance metrics across the fleet.

pub mod agents;
pub mod api;
pub mod config;
pub mod context;
pub mod critic;
pub mod domain;
pub mod integration;
pub mod observability;
pub mod orchestrator;
pub mod policy;
pub mod tokenizer;

pub use domain::{ProcureError, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize process-wide tracing. Call once at process start.
pub fn init() -> Result<()> {
    observability::init_tracing();
    Ok(())
}
