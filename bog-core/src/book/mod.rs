//! Per-symbol, order-owning limit order book.
//!
//! Exactly one writer thread owns a `Book` (the ingress shard for that
//! symbol). Readers never touch the book directly; they load the latest
//! [`snapshot::BookSnapshot`] published through an `arc_swap::ArcSwap`
//! pointer swap after every mutation.

pub mod helpers;
pub mod level;
pub mod snapshot;

use crate::core::errors::BookError;
use crate::core::types::{OrderId, Price, Quantity, Side};
use arc_swap::ArcSwap;
use level::Level;
use snapshot::{BookSnapshot, DepthLevel, MAX_DEPTH};
use std::collections::HashMap;
use std::sync::Arc;

/// Where an order lives: which side, and the price of its level (levels
/// are looked up by price, so this is all that's needed for O(log n)
/// cancel/modify via the sorted side array).
#[derive(Debug, Clone, Copy)]
struct OrderLocation {
    side: Side,
    price: Price,
}

pub struct BookConfig {
    pub tick_size: Price,
    pub min_price: Price,
    pub max_price: Price,
    pub max_qty: Quantity,
    pub max_orders: u32,
    pub max_levels_per_side: u32,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            tick_size: 1,
            min_price: 1,
            max_price: u64::MAX / 2,
            max_qty: 1_000_000_000,
            max_orders: 100_000,
            max_levels_per_side: 10_000,
        }
    }
}

pub struct Book {
    symbol_id: u32,
    config: BookConfig,
    bids: Vec<Level>,
    asks: Vec<Level>,
    orders: HashMap<OrderId, OrderLocation>,
    sequence: u64,
    next_level_id: u64,
    snapshot: Arc<ArcSwap<BookSnapshot>>,
}

impl Book {
    pub fn new(symbol_id: u32, config: BookConfig) -> Self {
        let snapshot = Arc::new(ArcSwap::from_pointee(BookSnapshot::empty(symbol_id)));
        Self {
            symbol_id,
            config,
            bids: Vec::new(),
            asks: Vec::new(),
            orders: HashMap::new(),
            sequence: 0,
            next_level_id: 1,
            snapshot,
        }
    }

    /// A clone of the published snapshot handle; give this to reader
    /// threads at construction so they can `load()` without contending
    /// with the writer.
    pub fn snapshot_handle(&self) -> Arc<ArcSwap<BookSnapshot>> {
        self.snapshot.clone()
    }

    fn validate_price_qty(&self, price: Price, qty: Quantity) -> Result<(), BookError> {
        if price % self.config.tick_size != 0 {
            return Err(BookError::InvalidPrice {
                price,
                tick_size: self.config.tick_size,
            });
        }
        if price < self.config.min_price || price > self.config.max_price {
            return Err(BookError::PriceOutOfBand {
                price,
                min: self.config.min_price,
                max: self.config.max_price,
            });
        }
        if qty == 0 || qty > self.config.max_qty {
            return Err(BookError::InvalidQuantity {
                qty,
                max: self.config.max_qty,
            });
        }
        Ok(())
    }

    fn side_levels(&mut self, side: Side) -> &mut Vec<Level> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Binary search position for `price` within a side array sorted in
    /// the side's preference order (bids descending, asks ascending).
    fn search(levels: &[Level], price: Price, side: Side) -> Result<usize, usize> {
        levels.binary_search_by(|lvl| match side {
            Side::Buy => lvl.price.cmp(&price).reverse(),
            Side::Sell => lvl.price.cmp(&price),
        })
    }

    pub fn add_order(
        &mut self,
        order_id: OrderId,
        price: Price,
        qty: Quantity,
        side: Side,
        tsc: u64,
    ) -> Result<(), BookError> {
        self.validate_price_qty(price, qty)?;

        if self.orders.contains_key(&order_id) {
            return Err(BookError::DuplicateOrderId(order_id.as_u64()));
        }
        if self.orders.len() as u32 >= self.config.max_orders {
            return Err(BookError::BookCapacityExceeded(self.config.max_orders));
        }

        let max_levels = self.config.max_levels_per_side;
        let levels = self.side_levels(side);
        match Self::search(levels, price, side) {
            Ok(idx) => {
                levels[idx].push_back(order_id, qty);
            }
            Err(idx) => {
                if levels.len() as u32 >= max_levels {
                    return Err(BookError::LevelCapacityExceeded(max_levels));
                }
                let level_id = self.next_level_id;
                self.next_level_id += 1;
                let mut lvl = Level::new(price, level_id);
                lvl.push_back(order_id, qty);
                levels.insert(idx, lvl);
            }
        }

        self.orders.insert(order_id, OrderLocation { side, price });
        self.sequence += 1;
        self.check_crossed()?;
        self.publish_snapshot(tsc);
        Ok(())
    }

    pub fn cancel_order(&mut self, order_id: OrderId, tsc: u64) -> Result<(), BookError> {
        let loc = *self
            .orders
            .get(&order_id)
            .ok_or(BookError::UnknownOrderId(order_id.as_u64()))?;

        let levels = self.side_levels(loc.side);
        let idx = Self::search(levels, loc.price, loc.side)
            .map_err(|_| BookError::UnknownOrderId(order_id.as_u64()))?;
        levels[idx].remove(order_id);
        if levels[idx].is_empty() {
            levels.remove(idx);
        }

        self.orders.remove(&order_id);
        self.sequence += 1;
        self.publish_snapshot(tsc);
        Ok(())
    }

    /// Cancel, then add as a new order at `new_price`/`new_qty`. Advances
    /// the sequence number exactly once from the observer's viewpoint
    /// (the intermediate state is never published).
    pub fn modify_order(
        &mut self,
        order_id: OrderId,
        new_price: Price,
        new_qty: Quantity,
        tsc: u64,
    ) -> Result<(), BookError> {
        let loc = *self
            .orders
            .get(&order_id)
            .ok_or(BookError::UnknownOrderId(order_id.as_u64()))?;

        self.validate_price_qty(new_price, new_qty)?;

        let levels = self.side_levels(loc.side);
        let idx = Self::search(levels, loc.price, loc.side)
            .map_err(|_| BookError::UnknownOrderId(order_id.as_u64()))?;
        levels[idx].remove(order_id);
        if levels[idx].is_empty() {
            levels.remove(idx);
        }
        self.orders.remove(&order_id);

        let max_levels = self.config.max_levels_per_side;
        let levels = self.side_levels(loc.side);
        match Self::search(levels, new_price, loc.side) {
            Ok(idx) => levels[idx].push_back(order_id, new_qty),
            Err(idx) => {
                if levels.len() as u32 >= max_levels {
                    return Err(BookError::LevelCapacityExceeded(max_levels));
                }
                let level_id = self.next_level_id;
                self.next_level_id += 1;
                let mut lvl = Level::new(new_price, level_id);
                lvl.push_back(order_id, new_qty);
                levels.insert(idx, lvl);
            }
        }
        self.orders.insert(
            order_id,
            OrderLocation {
                side: loc.side,
                price: new_price,
            },
        );

        self.sequence += 1;
        self.check_crossed()?;
        self.publish_snapshot(tsc);
        Ok(())
    }

    /// Apply a fill against a resting order: reduce its level quantity,
    /// removing the order (and its level, if now empty) once fully filled.
    pub fn apply_fill(
        &mut self,
        order_id: OrderId,
        fill_qty: Quantity,
        tsc: u64,
    ) -> Result<(), BookError> {
        let loc = *self
            .orders
            .get(&order_id)
            .ok_or(BookError::UnknownOrderId(order_id.as_u64()))?;

        let levels = self.side_levels(loc.side);
        let idx = Self::search(levels, loc.price, loc.side)
            .map_err(|_| BookError::UnknownOrderId(order_id.as_u64()))?;

        let remaining = levels[idx].reduce(order_id, fill_qty).unwrap_or(0);
        if remaining == 0 {
            levels[idx].remove(order_id);
            self.orders.remove(&order_id);
            if levels[idx].is_empty() {
                levels.remove(idx);
            }
        }

        self.sequence += 1;
        self.publish_snapshot(tsc);
        Ok(())
    }

    pub fn best_bid_ask(&self) -> (Option<Price>, Option<Price>) {
        (
            self.bids.first().map(|l| l.price),
            self.asks.first().map(|l| l.price),
        )
    }

    fn check_crossed(&self) -> Result<(), BookError> {
        if let (Some(bid), Some(ask)) = self.best_bid_ask() {
            if bid >= ask {
                return Err(BookError::CrossedBookDetected { bid, ask });
            }
        }
        Ok(())
    }

    pub fn depth(&self, side: Side, levels: usize) -> Vec<(Price, Quantity)> {
        let src = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        src.iter()
            .take(levels)
            .map(|l| (l.price, l.total_qty()))
            .collect()
    }

    pub fn total_qty(&self, side: Side) -> Quantity {
        let src = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        src.iter().map(|l| l.total_qty()).sum()
    }

    pub fn vwap(&self, side: Side, levels: usize) -> Option<u64> {
        let depth = self.depth(side, levels);
        let prices: Vec<u64> = depth.iter().map(|(p, _)| *p).collect();
        let sizes: Vec<u64> = depth.iter().map(|(_, q)| *q).collect();
        helpers::vwap_u64(&prices, &sizes, levels)
    }

    pub fn spread_bps(&self) -> u32 {
        let (bid, ask) = self.best_bid_ask();
        helpers::spread_bps_from_prices(bid.unwrap_or(0), ask.unwrap_or(0))
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn publish_snapshot(&self, tsc: u64) {
        let mut snap = BookSnapshot::empty(self.symbol_id);
        snap.sequence = self.sequence;
        snap.last_update_tsc = tsc;
        snap.best_bid = self.bids.first().map(|l| l.price);
        snap.best_ask = self.asks.first().map(|l| l.price);

        snap.bid_levels = self.bids.len().min(MAX_DEPTH);
        for (i, lvl) in self.bids.iter().take(MAX_DEPTH).enumerate() {
            snap.bid_depth[i] = DepthLevel {
                price: lvl.price,
                qty: lvl.total_qty(),
            };
        }
        snap.ask_levels = self.asks.len().min(MAX_DEPTH);
        for (i, lvl) in self.asks.iter().take(MAX_DEPTH).enumerate() {
            snap.ask_depth[i] = DepthLevel {
                price: lvl.price,
                qty: lvl.total_qty(),
            };
        }

        self.snapshot.store(Arc::new(snap));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book::new(1, BookConfig::default())
    }

    #[test]
    fn add_order_creates_level_and_updates_bbo() {
        let mut b = book();
        b.add_order(OrderId::new(1), 100, 10, Side::Buy, 1).unwrap();
        b.add_order(OrderId::new(2), 110, 5, Side::Sell, 2).unwrap();
        assert_eq!(b.best_bid_ask(), (Some(100), Some(110)));
    }

    #[test]
    fn add_order_rejects_crossed_book() {
        let mut b = book();
        b.add_order(OrderId::new(1), 110, 10, Side::Buy, 1).unwrap();
        let err = b.add_order(OrderId::new(2), 100, 5, Side::Sell, 2);
        assert_eq!(
            err,
            Err(BookError::CrossedBookDetected { bid: 110, ask: 100 })
        );
    }

    #[test]
    fn add_order_rejects_non_tick_aligned_price() {
        let mut b = Book::new(
            1,
            BookConfig {
                tick_size: 5,
                ..BookConfig::default()
            },
        );
        let err = b.add_order(OrderId::new(1), 7, 10, Side::Buy, 1);
        assert_eq!(
            err,
            Err(BookError::InvalidPrice {
                price: 7,
                tick_size: 5
            })
        );
    }

    #[test]
    fn add_order_rejects_duplicate_id() {
        let mut b = book();
        b.add_order(OrderId::new(1), 100, 10, Side::Buy, 1).unwrap();
        let err = b.add_order(OrderId::new(1), 90, 5, Side::Buy, 2);
        assert_eq!(err, Err(BookError::DuplicateOrderId(1)));
    }

    #[test]
    fn cancel_order_removes_level_when_last_order() {
        let mut b = book();
        b.add_order(OrderId::new(1), 100, 10, Side::Buy, 1).unwrap();
        b.cancel_order(OrderId::new(1), 2).unwrap();
        assert_eq!(b.best_bid_ask(), (None, None));
    }

    #[test]
    fn cancel_unknown_order_errors() {
        let mut b = book();
        assert_eq!(
            b.cancel_order(OrderId::new(99), 1),
            Err(BookError::UnknownOrderId(99))
        );
    }

    #[test]
    fn modify_order_moves_between_levels() {
        let mut b = book();
        b.add_order(OrderId::new(1), 100, 10, Side::Buy, 1).unwrap();
        b.modify_order(OrderId::new(1), 95, 20, 2).unwrap();
        assert_eq!(b.best_bid_ask(), (Some(95), None));
        assert_eq!(b.total_qty(Side::Buy), 20);
    }

    #[test]
    fn apply_fill_partial_then_full() {
        let mut b = book();
        b.add_order(OrderId::new(1), 100, 10, Side::Buy, 1).unwrap();
        b.apply_fill(OrderId::new(1), 4, 2).unwrap();
        assert_eq!(b.total_qty(Side::Buy), 6);
        b.apply_fill(OrderId::new(1), 6, 3).unwrap();
        assert_eq!(b.order_count(), 0);
        assert_eq!(b.best_bid_ask(), (None, None));
    }

    #[test]
    fn snapshot_reflects_latest_mutation() {
        let mut b = book();
        let handle = b.snapshot_handle();
        b.add_order(OrderId::new(1), 100, 10, Side::Buy, 5).unwrap();
        let snap = handle.load();
        assert_eq!(snap.best_bid, Some(100));
        assert_eq!(snap.sequence, 1);
    }

    #[test]
    fn capacity_exceeded_reports_book_capacity_error() {
        let mut b = Book::new(
            1,
            BookConfig {
                max_orders: 1,
                ..BookConfig::default()
            },
        );
        b.add_order(OrderId::new(1), 100, 10, Side::Buy, 1).unwrap();
        let err = b.add_order(OrderId::new(2), 101, 10, Side::Buy, 2);
        assert_eq!(err, Err(BookError::BookCapacityExceeded(1)));
    }
}
