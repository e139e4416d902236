//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Redirect middleware and server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters per rule and outcome)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows into every redirect log event
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
