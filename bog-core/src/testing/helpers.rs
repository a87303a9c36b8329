//! Builders for test fixtures: orders, signals, and position snapshots
//! with sane defaults so individual tests only set the fields they care
//! about.

use crate::book::snapshot::BookSnapshot;
use crate::core::signal::{Signal, SignalKind};
use crate::core::types::{fixed_point, Order, OrderId, OrderState, OrderType, Price, PositionSnapshot, Quantity, Side, Tif};

/// Builds an [`Order`] with reasonable defaults, overridden field by
/// field via the chained setters.
#[derive(Debug, Clone, Copy)]
pub struct OrderBuilder {
    order: Order,
}

impl OrderBuilder {
    pub fn new(order_id: u64, symbol_id: u32) -> Self {
        Self {
            order: Order {
                order_id: OrderId::new(order_id),
                symbol_id,
                side: Side::Buy,
                state: OrderState::Pending,
                order_type: OrderType::Limit,
                tif: Tif::GTC,
                price: 0,
                quantity: 0,
                filled_qty: 0,
                created_tsc: 0,
                last_update_tsc: 0,
                strategy_id: 0,
                venue_id: 0,
                client_order_id: 0,
            },
        }
    }

    pub fn side(mut self, side: Side) -> Self {
        self.order.side = side;
        self
    }

    pub fn price(mut self, price: Price) -> Self {
        self.order.price = price;
        self
    }

    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.order.quantity = quantity;
        self
    }

    pub fn tif(mut self, tif: Tif) -> Self {
        self.order.tif = tif;
        self
    }

    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order.order_type = order_type;
        self
    }

    pub fn state(mut self, state: OrderState) -> Self {
        self.order.state = state;
        self
    }

    pub fn build(self) -> Order {
        self.order
    }
}

/// Builds a [`Signal`] with reasonable defaults.
pub fn test_signal(symbol_id: u32, strategy_id: u32, kind: SignalKind) -> Signal {
    Signal::new(0, symbol_id, strategy_id, kind, 128, -fixed_point::SCALE, fixed_point::SCALE, 100, 10_000)
}

/// A flat position snapshot for a symbol, for seeding a `PositionStore`
/// in tests that don't care about accumulated fills.
pub fn flat_position(symbol_id: u32) -> PositionSnapshot {
    PositionSnapshot {
        symbol_id,
        net_qty: 0,
        long_qty: 0,
        short_qty: 0,
        avg_long_px: 0,
        avg_short_px: 0,
        unrealized_pnl: 0,
        realized_pnl: 0,
        last_update_tsc: 0,
    }
}

/// An empty book snapshot with a best bid/ask set, for feeding strategies
/// without constructing a full order book.
pub fn book_with_bbo(symbol_id: u32, best_bid: Price, best_ask: Price) -> BookSnapshot {
    let mut book = BookSnapshot::empty(symbol_id);
    book.best_bid = Some(best_bid);
    book.best_ask = Some(best_ask);
    book
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_builder_applies_overrides() {
        let order = OrderBuilder::new(1, 5).side(Side::Sell).price(100).quantity(10).build();
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.price, 100);
        assert_eq!(order.quantity, 10);
    }

    #[test]
    fn book_with_bbo_sets_both_sides() {
        let book = book_with_bbo(1, 99, 101);
        assert_eq!(book.best_bid, Some(99));
        assert_eq!(book.best_ask, Some(101));
    }
}
