//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Claim:
//!     → timeouts.rs (request-scoped deadline over the whole claim)
//!     → blockchain client (per-call RPC timeout and provider failover)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Submissions are never retried, so a nonce is never signed twice

pub mod timeouts;

pub use timeouts::with_deadline;
