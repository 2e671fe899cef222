//! Resilience and accounting around provider calls.
//!
//! This module provides:
//! - Process-wide usage and cost ledger
//! - Concurrent adapter health probing
//!
//! Quarantine itself lives in the catalog (`switchyard_core::Catalog`)
//! because it is shared routing state, not per-call plumbing.

mod health;
mod usage;

pub use health::{HealthMonitor, HealthReport};
pub use usage::{BackendUsage, UsageLedger, UsageSummary};
