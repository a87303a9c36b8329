//! Core zero-overhead types for the trading system.
//!
//! This module provides the fundamental building blocks:
//! - `OrderId`/`OrderIdAllocator`: deterministic, monotonic order identifiers
//! - `Order`/`OrderState`: lifecycle-tracked order records
//! - `Signal`: 64-byte stack-allocated strategy output (cache-line aligned)
//! - `Position`: cache-aligned atomic position state (lock-free, SeqLock reads)
//! - `PriceLevel`: one resting price level in the order book
//! - Fixed-point arithmetic utilities
//!
//! All types are designed to minimize latency:
//! - Copy semantics where possible (no allocations)
//! - Cache-line alignment (64 bytes) on hot structs
//! - Atomic operations (lock-free) where shared across threads

pub mod errors;
pub mod signal;
pub mod types;

pub use errors::{
    BookError, ConversionError, OmsRejection, OverflowError, PositionError, SnapshotError,
};
pub use signal::{Signal, SignalKind};
pub use types::{
    fixed_point, Order, OrderId, OrderIdAllocator, OrderState, OrderType, Position,
    PositionSnapshot, Price, PriceLevel, Quantity, Side, Tif,
};
