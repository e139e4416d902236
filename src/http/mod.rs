//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → request.rs (add request ID)
//!     → redirect layers, in configured order
//!     → next handler (forward to upstream, or 404)
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
