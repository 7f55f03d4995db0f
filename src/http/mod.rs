//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, body limit)
//!     → security::rate_limit (parse claim, cooldown check)
//!     → server.rs handlers (claim, info, health)
//!     → response.rs (JSON bodies, error mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Claim, ClaimRequest, X_REQUEST_ID};
pub use response::{ClaimError, InfoResponse, MessageResponse};
pub use server::{AppState, FaucetServer};
