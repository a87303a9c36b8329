//! Resilience patterns for production deployment.
//!
//! Exponential backoff is the one piece of the teacher's resilience
//! toolkit this crate still needs directly: venue reconnect logic in
//! [`crate::edges`] schedules retries through it.

pub mod backoff;

pub use backoff::{BackoffConfig, ExponentialBackoff};
