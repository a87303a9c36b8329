//! Wires the hot-path components (book, strategies, risk, OMS, router)
//! into the single-process loop the `run`/`resume` subcommands drive.
//! Market data and venue fills are simulated: a real deployment swaps
//! [`ReplayIngress`]/[`SimulatedVenue`] for venue-specific adapters behind
//! the same [`MarketDataIngress`]/[`VenueEgress`] traits.

use bog_core::book::snapshot::BookSnapshot;
use bog_core::book::{Book, BookConfig};
use bog_core::config::{Config, StrategyParamsConfig};
use bog_core::core::signal::Signal;
use bog_core::core::types::{OrderId, OrderState, OrderType, Price, Quantity, Side, Tif};
use bog_core::edges::simulated::{ReplayIngress, SimulatedVenue};
use bog_core::edges::{MarketDataIngress, Packet, SubmitOutcome, VenueEgress, VenueOrder};
use bog_core::manager::{Allocation, StrategyManager};
use bog_core::oms::{ExecutionReport, Oms};
use bog_core::position::PositionStore;
use bog_core::risk::{OrderIntent, RiskEngine};
use bog_core::router::{ChildOrder, ExecutionSample, Router, RouterConfig, VenueState};
use bog_core::strategy::{
    MarketDataEvent, MarketMakingStrategy, MeanReversionStrategy, MomentumStrategy, ScalpingStrategy, Strategy,
};
use bog_core::supervisor::{Supervisor, WorkerHealth, WorkerRole};
use std::collections::HashMap;
use std::sync::Arc;

/// Rebalance cadence for the strategy manager's capital reweighting. Not
/// presently a config option; every deployment shares this cadence.
const REBALANCE_INTERVAL_NS: u64 = 60_000_000_000;

/// Resting synthetic quote size per symbol.
const SYNTHETIC_QUOTE_QTY: Quantity = 1_000;

/// The single venue this harness routes to.
const SIM_VENUE_ID: u16 = 1;

/// Deterministic modulo-driven bid/ask pair, standing in for a real feed
/// handler until one is wired behind [`PacketParser`](bog_core::edges::PacketParser).
fn synthetic_quote(seq: u64, tick_size: u64) -> (Price, Price) {
    let tick = tick_size.max(1);
    let walk = (seq % 200) * tick;
    let mid = tick * 10_000 + walk;
    (mid.saturating_sub(tick), mid + tick)
}

/// One symbol's order book plus the two synthetic resting orders used to
/// seed it from [`synthetic_quote`].
struct SymbolBook {
    book: Book,
    quoted: bool,
}

impl SymbolBook {
    const BID_ID: OrderId = OrderId::new(1);
    const ASK_ID: OrderId = OrderId::new(2);

    fn new(symbol_id: u32, tick_size: u64) -> Self {
        let config = BookConfig { tick_size, ..BookConfig::default() };
        Self { book: Book::new(symbol_id, config), quoted: false }
    }

    fn update_quote(&mut self, bid: Price, ask: Price, tsc: u64) {
        if !self.quoted {
            let _ = self.book.add_order(Self::BID_ID, bid, SYNTHETIC_QUOTE_QTY, Side::Buy, tsc);
            let _ = self.book.add_order(Self::ASK_ID, ask, SYNTHETIC_QUOTE_QTY, Side::Sell, tsc);
            self.quoted = true;
        } else {
            let _ = self.book.modify_order(Self::BID_ID, bid, SYNTHETIC_QUOTE_QTY, tsc);
            let _ = self.book.modify_order(Self::ASK_ID, ask, SYNTHETIC_QUOTE_QTY, tsc);
        }
    }

    fn snapshot(&self) -> BookSnapshot {
        (*self.book.snapshot_handle().load_full()).clone()
    }
}

fn build_strategy(strategy_id: u32, symbol_id: u32, params: StrategyParamsConfig) -> Strategy {
    match params {
        StrategyParamsConfig::Scalping(p) => Strategy::Scalping(ScalpingStrategy::new(strategy_id, symbol_id, p)),
        StrategyParamsConfig::Momentum(p) => Strategy::Momentum(MomentumStrategy::new(strategy_id, symbol_id, p)),
        StrategyParamsConfig::MeanReversion(p) => {
            Strategy::MeanReversion(MeanReversionStrategy::new(strategy_id, symbol_id, p))
        }
        StrategyParamsConfig::MarketMaking(p) => {
            Strategy::MarketMaking(MarketMakingStrategy::new(strategy_id, symbol_id, p))
        }
    }
}

fn dummy_report() -> ExecutionReport {
    ExecutionReport {
        order_id: OrderId::new(0),
        venue_order_id: 0,
        exec_id: 0,
        state: OrderState::Pending,
        executed_qty: 0,
        remaining_qty: 0,
        exec_price: 0,
        ts: 0,
        reject_reason: None,
    }
}

/// Owns every component on the hot path for one process: per-symbol
/// books, the strategy manager, risk engine, OMS, router, and the
/// simulated ingress/venue edges. `tick` is the single entry point the
/// supervisor's poll loop drives once per interval.
pub struct Pipeline {
    books: HashMap<u32, SymbolBook>,
    manager: StrategyManager,
    risk: RiskEngine,
    positions: PositionStore,
    router: Router,
    oms: Oms,
    ingress: ReplayIngress,
    venue: SimulatedVenue,
    tick_size_per_symbol: HashMap<u32, u64>,
    strategy_equity: HashMap<u32, i64>,
    var_weights: Vec<f64>,
    next_exec_id: u64,
    seq: u64,
    ingress_health: Arc<WorkerHealth>,
    risk_health: Arc<WorkerHealth>,
    router_health: Arc<WorkerHealth>,
}

impl Pipeline {
    pub fn new(config: &Config, risk: RiskEngine, positions: PositionStore, supervisor: &mut Supervisor) -> Self {
        let mut symbol_ids: Vec<u32> = config.tick_size_per_symbol.keys().copied().collect();
        for sc in &config.strategies {
            symbol_ids.extend(sc.target_symbols.iter().copied());
        }
        symbol_ids.sort_unstable();
        symbol_ids.dedup();
        if symbol_ids.is_empty() {
            symbol_ids.push(1);
        }

        let mut books = HashMap::new();
        for &symbol_id in &symbol_ids {
            let tick_size = config.tick_size_per_symbol.get(&symbol_id).copied().unwrap_or(1);
            books.insert(symbol_id, SymbolBook::new(symbol_id, tick_size));
        }

        let mut manager = StrategyManager::new(config.total_strategy_capital(), REBALANCE_INTERVAL_NS);
        let mut strategy_equity = HashMap::new();
        for sc in &config.strategies {
            let symbol_id = sc.target_symbols.first().copied().unwrap_or(1);
            let strategy = build_strategy(sc.id, symbol_id, sc.params.clone());
            manager.add_strategy(sc.id, strategy, Allocation::new(sc.capital, sc.max_drawdown, sc.daily_loss_limit));
            strategy_equity.insert(sc.id, 0);
        }

        // The OMS owns one id namespace shared across every symbol
        // ("one instance per process", per its own doc comment); the
        // smallest configured tick size keeps per-order validation from
        // rejecting a larger-ticked symbol's otherwise-aligned price.
        let oms_tick_size = config.tick_size_per_symbol.values().copied().min().unwrap_or(1);
        let oms = Oms::new(oms_tick_size, config.max_order_notional as u128, 1_024);

        let ingress_health = Arc::new(WorkerHealth::default());
        let risk_health = Arc::new(WorkerHealth::default());
        let router_health = Arc::new(WorkerHealth::default());
        supervisor.register(WorkerRole::Ingress, ingress_health.clone());
        supervisor.register(WorkerRole::Risk, risk_health.clone());
        supervisor.register(WorkerRole::Router, router_health.clone());

        Self {
            books,
            manager,
            risk,
            positions,
            router: Router::new(RouterConfig::default()),
            oms,
            ingress: ReplayIngress::default(),
            venue: SimulatedVenue::new(),
            tick_size_per_symbol: config.tick_size_per_symbol.clone(),
            strategy_equity,
            var_weights: vec![0.0; config.strategies.len().max(1)],
            next_exec_id: 0,
            seq: 0,
            ingress_health,
            risk_health,
            router_health,
        }
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    /// Resume the OMS's order-id allocator past whatever a hydrated
    /// snapshot last issued, so a fresh submit can never collide with a
    /// pre-restart order id.
    pub fn resume_ids_after(&self, last_issued: u64) {
        self.oms.resume_ids_after(last_issued);
    }

    /// Drive one iteration: push synthetic market data through every
    /// tracked symbol's book, run the strategy/risk/OMS/router chain on
    /// whatever signals come out, then apply whatever execution reports
    /// the simulated venue has queued.
    pub fn tick(&mut self, now_ns: u64) {
        self.seq += 1;
        let symbol_ids: Vec<u32> = self.books.keys().copied().collect();
        for &symbol_id in &symbol_ids {
            self.ingress.push(Packet { hardware_ts: self.seq, symbol_id, payload: Vec::new() });
        }

        let mut buf: Vec<Packet> =
            (0..symbol_ids.len().max(1)).map(|_| Packet { hardware_ts: 0, symbol_id: 0, payload: Vec::new() }).collect();
        let drained = self.ingress.recv_burst(&mut buf);
        self.ingress_health.mark_tick(now_ns);
        self.ingress_health.set_queue_depth(0);

        for packet in buf.into_iter().take(drained) {
            let tick_size = self.tick_size_per_symbol.get(&packet.symbol_id).copied().unwrap_or(1);
            let (bid, ask) = synthetic_quote(packet.hardware_ts, tick_size);
            let Some(sym_book) = self.books.get_mut(&packet.symbol_id) else { continue };
            sym_book.update_quote(bid, ask, now_ns);
            self.risk.observe_quote(packet.symbol_id, bid, ask);

            let snapshot = sym_book.snapshot();
            let event = MarketDataEvent {
                symbol_id: packet.symbol_id,
                book: snapshot,
                trade_price: Some((bid + ask) / 2),
                trade_qty: Some(1),
                timestamp_tsc: now_ns,
            };
            self.manager.on_market_data(&event);
        }

        self.manager.on_tick(now_ns);

        let equity = self.strategy_equity.clone();
        self.manager.evaluate_limits(|id| equity.get(&id).copied().unwrap_or(0).max(0) as u64);
        for notice in self.manager.drain_disable_notices() {
            tracing::warn!(strategy_id = notice.strategy_id, reason = ?notice.reason, "strategy disabled");
        }

        let signals = self.manager.drain_scaled_signals();
        for signal in signals {
            self.process_signal(now_ns, signal);
        }

        self.apply_execution_reports(now_ns);

        let books = &self.books;
        let aggregates = self
            .positions
            .aggregates(|symbol_id| books.get(&symbol_id).and_then(|b| b.book.best_bid_ask().0.zip(b.book.best_bid_ask().1)).map(|(bid, ask)| (bid + ask) / 2));
        self.risk.evaluate_portfolio_triggers(aggregates.drawdown, aggregates.daily_pnl);
        self.risk_health.mark_tick(now_ns);
    }

    fn process_signal(&mut self, now_ns: u64, signal: Signal) {
        let Some(sym_book) = self.books.get(&signal.symbol_id) else { return };
        let (bid, ask) = sym_book.book.best_bid_ask();
        let side = if signal.strength >= 0 { Side::Buy } else { Side::Sell };
        let tick_size = self.tick_size_per_symbol.get(&signal.symbol_id).copied().unwrap_or(1).max(1);

        let raw_price = if signal.suggested_price != 0 {
            signal.suggested_price
        } else {
            match (bid, ask) {
                (Some(b), Some(a)) => (b + a) / 2,
                _ => return,
            }
        };
        let price = raw_price - raw_price % tick_size;
        let intent = OrderIntent { symbol_id: signal.symbol_id, side, price, quantity: signal.suggested_qty };

        let verdict = self.risk.check_order(&intent, &self.positions, now_ns, &self.var_weights, &self.var_weights, 1_000_000_000);
        self.risk_health.mark_tick(now_ns);
        if !verdict.is_approved() {
            return;
        }

        let Ok(order_id) = self.oms.submit(
            signal.symbol_id,
            side,
            OrderType::Limit,
            Tif::GTC,
            price,
            signal.suggested_qty,
            signal.strategy_id,
            now_ns,
        ) else {
            return;
        };

        let mut venues = [VenueState {
            venue_id: SIM_VENUE_ID,
            operational: true,
            fill_rate: 1.0,
            spread_bps: 1.0,
            visible_size: signal.suggested_qty.max(1),
            estimated_hidden_size: 0,
            ack_latency_ewma_ns: 0.0,
        }];
        self.router.refresh_hidden_estimates(signal.symbol_id, &mut venues);
        let children: Vec<ChildOrder> = self.router.route(signal.symbol_id, intent.notional(), signal.suggested_qty, &venues);
        self.router_health.mark_tick(now_ns);

        for child in children {
            let venue_order =
                VenueOrder { order_id, symbol_id: signal.symbol_id, side, price, quantity: child.quantity };
            if matches!(self.venue.submit(&venue_order), SubmitOutcome::Accepted { .. }) {
                self.enqueue_paper_fill(order_id, price, child.quantity, now_ns);
                self.router.record_execution(
                    SIM_VENUE_ID,
                    signal.symbol_id,
                    ExecutionSample { filled_qty: child.quantity, displayed_qty: child.quantity, slippage_bps: 0.0, adverse_selection_bps: 0.0 },
                );
            }
        }
    }

    /// Queue the legal `Pending -> Submitted -> Acknowledged -> Filled`
    /// report sequence for an order the simulated venue just accepted,
    /// since [`SimulatedVenue`] never produces reports on its own.
    fn enqueue_paper_fill(&mut self, order_id: OrderId, price: Price, qty: Quantity, now_ns: u64) {
        for state in [OrderState::Submitted, OrderState::Acknowledged, OrderState::Filled] {
            self.next_exec_id += 1;
            let executed_qty = if state == OrderState::Filled { qty } else { 0 };
            self.venue.enqueue_report(ExecutionReport {
                order_id,
                venue_order_id: order_id.as_u64(),
                exec_id: self.next_exec_id,
                state,
                executed_qty,
                remaining_qty: qty - executed_qty,
                exec_price: price,
                ts: now_ns,
                reject_reason: None,
            });
        }
    }

    fn apply_execution_reports(&mut self, now_ns: u64) {
        let mut buf: Vec<ExecutionReport> = (0..64).map(|_| dummy_report()).collect();
        let n = self.venue.poll_reports(&mut buf);
        for report in buf.into_iter().take(n) {
            let Some(order) = self.oms.get(report.order_id) else { continue };
            match self.oms.apply_execution_report(&report) {
                Ok((Some(fill), _)) => {
                    let pos = self.positions.get_or_insert(order.symbol_id);
                    pos.apply_fill(order.side, fill.quantity, fill.price, now_ns);
                    self.manager.on_order_fill(order.strategy_id, &order, &fill);
                    let pnl_delta = match order.side {
                        Side::Buy => -(fill.price as i64 * fill.quantity as i64),
                        Side::Sell => fill.price as i64 * fill.quantity as i64,
                    };
                    *self.strategy_equity.entry(order.strategy_id).or_insert(0) += pnl_delta;
                }
                Ok((None, _)) => {}
                Err(e) => tracing::warn!(order_id = %order.order_id, error = %e, "execution report rejected"),
            }
        }
    }
}
