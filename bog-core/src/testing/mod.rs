//! Test fixtures and helpers, gated behind the `testing` feature so they
//! never ship in a release binary.
//!
//! Deterministic replay for integration tests lives in
//! [`crate::edges::simulated::ReplayIngress`]; this module only adds the
//! builders in [`helpers`] on top of it.

pub mod helpers;

pub use helpers::{book_with_bbo, flat_position, test_signal, OrderBuilder};
