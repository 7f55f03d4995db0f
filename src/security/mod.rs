//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/claim:
//!     → headers.rs (resolve client address behind trusted proxies)
//!     → rate_limit.rs (cooldown by client and destination address)
//!     → claim handler
//! ```
//!
//! # Design Decisions
//! - Forwarded headers are trusted only as far as `proxy_count` hops
//! - A failed claim releases its cooldown windows

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{Admission, ClaimGate, ClaimRateLimiter};
