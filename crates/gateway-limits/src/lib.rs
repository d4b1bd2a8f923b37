//! # Gateway Limits
//!
//! Admission checks for resolved gateway keys:
//! - Revocation and TTL expiry
//! - Lifetime request count
//! - Requests per time window
//! - Cost per time window and lifetime cost, in micro-dollars
//!
//! Counters are read from injected collaborators; this crate never writes them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod ttl;
pub mod validator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ttl::{parse_duration_nanos, ttl_seconds};
pub use validator::{usd_to_micros, LimitValidator};
