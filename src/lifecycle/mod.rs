//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! main.rs
//!     → Shutdown::new()
//!     → server subscribes
//!     → Ctrl+C → Shutdown::trigger()
//!     → server drains in-flight requests and exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
