//! Simulated broker for backtesting.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use stratify_core::types::{
    Bar, FillStatus, MarketSeries, Order, OrderId, OrderKind, OrderRef, Position,
};
use tracing::{debug, warn};

/// Why the broker refused an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Fewer than one unit requested
    InvalidUnits,
    /// Cash balance is zero or negative
    NoCash,
    /// Not even one unit is affordable
    InsufficientCash,
    /// The bar traded no volume
    NoVolume,
    /// Nothing held to sell
    NoPosition,
    /// Sale price collapsed to zero
    ZeroPrice,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InvalidUnits => "fewer than one unit requested",
            RejectReason::NoCash => "no cash available",
            RejectReason::InsufficientCash => "cannot afford a single unit",
            RejectReason::NoVolume => "no volume on bar",
            RejectReason::NoPosition => "no units held",
            RejectReason::ZeroPrice => "unit price is zero",
        };
        f.write_str(s)
    }
}

/// Outcome of executing one order against one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Execution {
    Filled {
        status: FillStatus,
        units: u64,
        cash_impact: f64,
    },
    Rejected(RejectReason),
}

/// Point-in-time view of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub timestamp: Option<DateTime<Utc>>,
    pub cash: f64,
    pub portfolio_value: f64,
    pub commission_rate: f64,
    pub slippage_bound: f64,
    pub positions: BTreeMap<String, u64>,
    pub open_orders: usize,
    pub closed_orders: usize,
}

/// Simulated broker.
///
/// Cash is only ever mutated by the setters and by fills. Positions are
/// created on first fill and never removed, even when flat.
pub struct SimulatedBroker {
    cash: f64,
    commission_rate: f64,
    slippage_bound: f64,
    positions: BTreeMap<String, Position>,
    open_orders: Vec<OrderRef>,
    closed_orders: Vec<OrderRef>,
    timestamp: Option<DateTime<Utc>>,
    series: Vec<Rc<MarketSeries>>,
    rng: StdRng,
}

impl Default for SimulatedBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBroker {
    /// Create a broker with no cash and an entropy-seeded slippage source.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a broker whose slippage draws are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create a broker drawing slippage from `rng`.
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            cash: 0.0,
            commission_rate: 0.0,
            slippage_bound: 0.0,
            positions: BTreeMap::new(),
            open_orders: Vec::new(),
            closed_orders: Vec::new(),
            timestamp: None,
            series: Vec::new(),
            rng,
        }
    }

    /// Replace the available cash.
    pub fn set_cash(&mut self, amount: f64) {
        self.cash = amount;
    }

    /// Deposit cash; a negative amount is a withdrawal.
    pub fn add_cash(&mut self, amount: f64) {
        self.cash += amount;
    }

    /// Set the commission charged on each fill, as a decimal (0.01 = 1%).
    pub fn set_commission_rate(&mut self, rate: f64) {
        self.commission_rate = rate;
    }

    /// Set the maximum adverse slippage, as a decimal (0.01 = 1%).
    pub fn set_slippage_bound(&mut self, rate: f64) {
        self.slippage_bound = rate;
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    pub fn slippage_bound(&self) -> f64 {
        self.slippage_bound
    }

    /// Units held in `instrument`, 0 if never traded.
    pub fn position(&self, instrument: &str) -> u64 {
        self.positions.get(instrument).map(|p| p.units).unwrap_or(0)
    }

    /// All positions ever opened, including flat ones.
    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Make a series visible to portfolio valuation.
    pub fn attach_series(&mut self, series: Rc<MarketSeries>) {
        self.series.push(series);
    }

    /// Move the broker's clock.
    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = Some(timestamp);
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Cash plus the value of every holding whose instrument has a bar at
    /// exactly the current timestamp.
    ///
    /// A holding without a bar at this instant contributes nothing; the last
    /// known price is not carried forward.
    pub fn portfolio_value(&self) -> f64 {
        let Some(now) = self.timestamp else {
            return self.cash;
        };

        let mut value = self.cash;
        for series in &self.series {
            for bar in series.bars_at(now) {
                if let Some(position) = self.positions.get(&bar.instrument) {
                    value += position.value_at(bar.close);
                }
            }
        }
        value
    }

    /// Close of `instrument` at the current timestamp, if any attached series
    /// has a bar there.
    pub fn mark(&self, instrument: &str) -> Option<f64> {
        let now = self.timestamp?;
        self.series
            .iter()
            .flat_map(|s| s.bars_at(now))
            .find(|b| b.instrument == instrument)
            .map(|b| b.close)
    }

    /// Queue an order for execution. Only pending orders are queued, so the
    /// open set never holds a filled or rejected order.
    pub fn submit(&mut self, order: OrderRef) {
        if order.status() != FillStatus::Pending {
            debug!(order = %order.id(), status = %order.status(), "ignoring settled order");
            return;
        }
        self.open_orders.push(order);
    }

    pub fn open_orders(&self) -> &[OrderRef] {
        &self.open_orders
    }

    pub fn closed_orders(&self) -> &[OrderRef] {
        &self.closed_orders
    }

    /// Deep copy of the positions map.
    pub fn positions_snapshot(&self) -> BTreeMap<String, Position> {
        self.positions.clone()
    }

    /// Deep copy of the open orders.
    pub fn open_orders_snapshot(&self) -> Vec<Order> {
        self.open_orders.iter().map(OrderRef::snapshot).collect()
    }

    /// Deep copy of the closed-order archive.
    pub fn closed_orders_snapshot(&self) -> Vec<Order> {
        self.closed_orders.iter().map(OrderRef::snapshot).collect()
    }

    /// Resolve every open order for `bar.instrument` against this bar.
    ///
    /// Cancelled orders for any instrument are dropped without archiving.
    /// Filled orders move to the archive; rejected orders are discarded.
    pub fn execute_orders(&mut self, bar: &Bar) {
        let pending: Vec<OrderRef> = self.open_orders.clone();
        let mut settled: HashSet<OrderId> = HashSet::new();

        for order in pending {
            match order.status() {
                FillStatus::Pending => {}
                status => {
                    debug_assert_eq!(status, FillStatus::Cancelled);
                    debug!(order = %order.id(), "dropping cancelled order");
                    settled.insert(order.id());
                    continue;
                }
            }

            if !order.is_for(&bar.instrument) {
                continue;
            }

            let execution = match order.kind() {
                OrderKind::Buy => self.execute_buy(bar, &order),
                OrderKind::Sell => self.execute_sell(bar, &order),
                OrderKind::Close => self.execute_close(bar, &order),
            };

            settled.insert(order.id());
            match execution {
                Execution::Filled {
                    status,
                    units,
                    cash_impact,
                } => {
                    debug!(
                        order = %order.id(),
                        kind = %order.kind(),
                        instrument = %bar.instrument,
                        %status,
                        units,
                        cash_impact,
                        "order filled"
                    );
                    self.closed_orders.push(order);
                }
                Execution::Rejected(reason) => {
                    debug!(
                        order = %order.id(),
                        kind = %order.kind(),
                        instrument = %bar.instrument,
                        %reason,
                        "order rejected"
                    );
                }
            }
        }

        self.open_orders.retain(|o| !settled.contains(&o.id()));
    }

    fn draw_slippage(&mut self) -> f64 {
        if self.slippage_bound > 0.0 {
            self.rng.gen_range(0.0..=self.slippage_bound)
        } else {
            0.0
        }
    }

    fn now(&self, bar: &Bar) -> DateTime<Utc> {
        self.timestamp.unwrap_or(bar.timestamp)
    }

    fn reject(&self, order: &OrderRef, reason: RejectReason) -> Execution {
        if let Err(e) = order.reject() {
            warn!(order = %order.id(), error = %e, "could not mark order rejected");
        }
        Execution::Rejected(reason)
    }

    fn record_fill(&self, order: &OrderRef, units: u64, cash_impact: f64, bar: &Bar) -> Execution {
        match order.fill(units, cash_impact, self.now(bar)) {
            Ok(status) => Execution::Filled {
                status,
                units,
                cash_impact,
            },
            Err(e) => {
                warn!(order = %order.id(), error = %e, "could not mark order filled");
                Execution::Filled {
                    status: order.status(),
                    units,
                    cash_impact,
                }
            }
        }
    }

    fn execute_buy(&mut self, bar: &Bar, order: &OrderRef) -> Execution {
        let unit_price = bar.close * (1.0 + self.draw_slippage());
        let unit_cost = unit_price * (1.0 + self.commission_rate);
        let requested = order.units();

        if requested < 1 {
            return self.reject(order, RejectReason::InvalidUnits);
        }
        if self.cash <= 0.0 {
            return self.reject(order, RejectReason::NoCash);
        }
        if bar.volume < 1 {
            return self.reject(order, RejectReason::NoVolume);
        }
        if unit_cost > self.cash {
            return self.reject(order, RejectReason::InsufficientCash);
        }

        let affordable = (self.cash / unit_cost).floor() as u64;
        let units = requested.min(bar.volume).min(affordable);
        let debit = units as f64 * unit_price * (1.0 + self.commission_rate);

        self.cash -= debit;
        self.positions
            .entry(bar.instrument.clone())
            .or_insert_with(|| Position::new(&bar.instrument))
            .increase(units);

        self.record_fill(order, units, -debit, bar)
    }

    fn execute_sell(&mut self, bar: &Bar, order: &OrderRef) -> Execution {
        let unit_price = bar.close * (1.0 - self.draw_slippage());
        let held = self.position(&bar.instrument);
        let requested = order.units();

        if held == 0 {
            return self.reject(order, RejectReason::NoPosition);
        }
        if unit_price == 0.0 {
            return self.reject(order, RejectReason::ZeroPrice);
        }
        if requested < 1 {
            return self.reject(order, RejectReason::InvalidUnits);
        }

        let units = requested.min(held);
        let credit = units as f64 * unit_price * (1.0 - self.commission_rate);

        self.cash += credit;
        if let Some(position) = self.positions.get_mut(&bar.instrument) {
            position.decrease(units);
        }

        self.record_fill(order, units, credit, bar)
    }

    fn execute_close(&mut self, bar: &Bar, order: &OrderRef) -> Execution {
        let held = self.position(&bar.instrument);
        if held == 0 {
            return self.reject(order, RejectReason::NoPosition);
        }

        order.set_units(held);
        self.execute_sell(bar, order)
    }

    /// Point-in-time ledger view.
    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            timestamp: self.timestamp,
            cash: self.cash,
            portfolio_value: self.portfolio_value(),
            commission_rate: self.commission_rate,
            slippage_bound: self.slippage_bound,
            positions: self
                .positions
                .iter()
                .map(|(k, p)| (k.clone(), p.units))
                .collect(),
            open_orders: self.open_orders.len(),
            closed_orders: self.closed_orders.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn bar(instrument: &str, n: i64, close: f64, volume: u64) -> Bar {
        Bar::new(instrument, day(n), close, close, close, close, volume)
    }

    fn order(id: u64, instrument: &str, kind: OrderKind, units: u64) -> OrderRef {
        OrderRef::new(Order::new(OrderId(id), instrument, kind, units, day(0)))
    }

    fn broker(cash: f64) -> SimulatedBroker {
        let mut broker = SimulatedBroker::with_seed(7);
        broker.set_cash(cash);
        broker.set_timestamp(day(0));
        broker
    }

    #[test]
    fn test_buy_fills_and_debits_cash() {
        let mut broker = broker(10_000.0);
        let buy = order(1, "AAPL", OrderKind::Buy, 10);
        broker.submit(buy.clone());

        broker.execute_orders(&bar("AAPL", 0, 100.0, 1_000));

        assert_eq!(buy.status(), FillStatus::Filled);
        assert_eq!(broker.cash(), 9_000.0);
        assert_eq!(broker.position("AAPL"), 10);
        assert!(broker.open_orders().is_empty());
        assert_eq!(broker.closed_orders().len(), 1);
        assert_eq!(buy.snapshot().cash_impact, -1_000.0);
        assert_eq!(buy.snapshot().closed_at, Some(day(0)));
    }

    #[test]
    fn test_buy_with_commission_matches_formula() {
        let mut broker = broker(1_000.0);
        broker.set_commission_rate(0.01);
        let buy = order(1, "AAPL", OrderKind::Buy, 100);
        broker.submit(buy.clone());

        broker.execute_orders(&bar("AAPL", 0, 33.0, 1_000));

        // floor(1000 / (33 * 1.01)) = 30
        let snap = buy.snapshot();
        assert_eq!(snap.status, FillStatus::PartiallyFilled);
        assert_eq!(snap.units_traded, 30);
        let expected = 1_000.0 - 30.0 * 33.0 * (1.0 + 0.01);
        assert_eq!(broker.cash(), expected);
    }

    #[test]
    fn test_buy_limited_by_volume() {
        let mut broker = broker(10_000.0);
        let buy = order(1, "AAPL", OrderKind::Buy, 50);
        broker.submit(buy.clone());

        broker.execute_orders(&bar("AAPL", 0, 10.0, 20));

        assert_eq!(buy.status(), FillStatus::PartiallyFilled);
        assert_eq!(broker.position("AAPL"), 20);
    }

    #[test]
    fn test_buy_rejections_are_discarded() {
        let cases = [
            (10_000.0, 0, 100),  // zero units
            (10_000.0, 5, 0),    // zero volume
            (0.0, 5, 100),       // zero cash
            (50.0, 5, 100),      // cannot afford one unit
        ];

        for (cash, units, volume) in cases {
            let mut broker = broker(cash);
            let buy = order(1, "AAPL", OrderKind::Buy, units);
            broker.submit(buy.clone());

            broker.execute_orders(&bar("AAPL", 0, 100.0, volume));

            assert_eq!(buy.status(), FillStatus::Rejected);
            assert!(broker.open_orders().is_empty());
            assert!(broker.closed_orders().is_empty());
            assert_eq!(broker.cash(), cash);
        }
    }

    #[test]
    fn test_sell_caps_at_holding() {
        let mut broker = broker(1_000.0);
        broker.submit(order(1, "AAPL", OrderKind::Buy, 5));
        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));

        let sell = order(2, "AAPL", OrderKind::Sell, 8);
        broker.submit(sell.clone());
        broker.execute_orders(&bar("AAPL", 1, 110.0, 100));

        assert_eq!(sell.status(), FillStatus::PartiallyFilled);
        assert_eq!(sell.snapshot().units_traded, 5);
        assert_eq!(broker.position("AAPL"), 0);
        assert_eq!(broker.cash(), 500.0 + 550.0);
        // the flat position stays in the ledger
        assert!(broker.positions().contains_key("AAPL"));
    }

    #[test]
    fn test_sell_without_position_is_rejected() {
        let mut broker = broker(1_000.0);
        let sell = order(1, "AAPL", OrderKind::Sell, 1);
        broker.submit(sell.clone());

        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));

        assert_eq!(sell.status(), FillStatus::Rejected);
        assert!(broker.closed_orders().is_empty());
    }

    #[test]
    fn test_close_liquidates_full_holding() {
        let mut broker = broker(1_000.0);
        broker.submit(order(1, "AAPL", OrderKind::Buy, 7));
        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));

        let close = order(2, "AAPL", OrderKind::Close, 1);
        broker.submit(close.clone());
        broker.execute_orders(&bar("AAPL", 1, 100.0, 100));

        let snap = close.snapshot();
        assert_eq!(snap.status, FillStatus::Filled);
        assert_eq!(snap.units, 7);
        assert_eq!(snap.units_traded, 7);
        assert_eq!(broker.position("AAPL"), 0);
        assert_eq!(broker.cash(), 1_000.0);
    }

    #[test]
    fn test_close_when_flat_is_rejected() {
        let mut broker = broker(1_000.0);
        let close = order(1, "AAPL", OrderKind::Close, 1);
        broker.submit(close.clone());

        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));

        assert_eq!(close.status(), FillStatus::Rejected);
        assert!(broker.closed_orders().is_empty());
        assert!(broker.open_orders().is_empty());
    }

    #[test]
    fn test_orders_wait_for_their_instrument() {
        let mut broker = broker(1_000.0);
        let buy = order(1, "MSFT", OrderKind::Buy, 1);
        broker.submit(buy.clone());

        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));
        assert_eq!(buy.status(), FillStatus::Pending);
        assert_eq!(broker.open_orders().len(), 1);

        broker.execute_orders(&bar("MSFT", 0, 100.0, 100));
        assert_eq!(buy.status(), FillStatus::Filled);
    }

    #[test]
    fn test_cancelled_orders_dropped_on_any_bar() {
        let mut broker = broker(1_000.0);
        let buy = order(1, "MSFT", OrderKind::Buy, 1);
        let keep = order(2, "MSFT", OrderKind::Buy, 1);
        broker.submit(buy.clone());
        broker.submit(keep.clone());
        buy.handle().cancel().unwrap();

        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));

        assert_eq!(buy.status(), FillStatus::Cancelled);
        assert_eq!(broker.open_orders().len(), 1);
        assert_eq!(broker.open_orders()[0].id(), OrderId(2));
        assert!(broker.closed_orders().is_empty());
        assert_eq!(broker.cash(), 1_000.0);
    }

    #[test]
    fn test_settled_orders_never_enter_open_set() {
        let mut broker = broker(1_000.0);
        let rejected = order(1, "AAPL", OrderKind::Sell, 1);
        rejected.reject().unwrap();
        let cancelled = order(2, "AAPL", OrderKind::Buy, 1);
        cancelled.handle().cancel().unwrap();

        broker.submit(rejected);
        broker.submit(cancelled);
        assert!(broker.open_orders().is_empty());

        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));
        assert!(broker.closed_orders().is_empty());
        assert_eq!(broker.cash(), 1_000.0);
    }

    #[test]
    fn test_every_order_visited_once_per_pass() {
        let mut broker = broker(10_000.0);
        let orders: Vec<OrderRef> = (1..=4)
            .map(|i| order(i, "AAPL", OrderKind::Buy, 1))
            .collect();
        for o in &orders {
            broker.submit(o.clone());
        }

        broker.execute_orders(&bar("AAPL", 0, 10.0, 100));

        assert!(orders.iter().all(|o| o.status() == FillStatus::Filled));
        assert_eq!(broker.position("AAPL"), 4);
        let archived: Vec<OrderId> = broker.closed_orders().iter().map(|o| o.id()).collect();
        assert_eq!(archived, vec![OrderId(1), OrderId(2), OrderId(3), OrderId(4)]);
    }

    #[test]
    fn test_portfolio_value_uses_exact_timestamp_only() {
        let mut broker = broker(1_000.0);
        let aapl = Rc::new(MarketSeries::new(
            "AAPL",
            vec![bar("AAPL", 0, 100.0, 100), bar("AAPL", 2, 120.0, 100)],
        ));
        broker.attach_series(aapl);

        broker.submit(order(1, "AAPL", OrderKind::Buy, 5));
        broker.execute_orders(&bar("AAPL", 0, 100.0, 100));
        assert_eq!(broker.portfolio_value(), 1_000.0);

        broker.set_timestamp(day(1));
        assert_eq!(broker.portfolio_value(), 500.0);
        assert!(broker.mark("AAPL").is_none());

        broker.set_timestamp(day(2));
        assert_eq!(broker.portfolio_value(), 500.0 + 600.0);
        assert_eq!(broker.mark("AAPL"), Some(120.0));
    }

    #[test]
    fn test_slippage_within_bound_and_seeded() {
        let run = |seed| {
            let mut broker = SimulatedBroker::with_seed(seed);
            broker.set_cash(10_000.0);
            broker.set_slippage_bound(0.05);
            broker.set_timestamp(day(0));
            broker.submit(order(1, "AAPL", OrderKind::Buy, 10));
            broker.execute_orders(&bar("AAPL", 0, 100.0, 100));
            broker.cash()
        };

        let a = run(11);
        assert_eq!(a, run(11));
        let spent = 10_000.0 - a;
        assert!(spent >= 1_000.0 && spent <= 1_050.0 + 1e-9);
    }

    #[test]
    fn test_add_cash_accepts_withdrawal() {
        let mut broker = broker(100.0);
        broker.add_cash(-30.0);
        assert_eq!(broker.cash(), 70.0);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Buy(u64),
        Sell(u64),
        Close,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0u64..50).prop_map(Step::Buy),
            (0u64..50).prop_map(Step::Sell),
            Just(Step::Close),
        ]
    }

    proptest! {
        #[test]
        fn prop_ledger_invariants(
            steps in proptest::collection::vec((step(), 1.0f64..500.0, 0u64..40), 1..40),
            commission in 0.0f64..0.05,
        ) {
            let mut broker = SimulatedBroker::with_seed(3);
            broker.set_cash(5_000.0);
            broker.set_commission_rate(commission);
            let mut bought = 0u64;
            let mut sold = 0u64;

            for (i, (step, price, volume)) in steps.into_iter().enumerate() {
                let id = i as u64 + 1;
                let kind = match step {
                    Step::Buy(_) => OrderKind::Buy,
                    Step::Sell(_) => OrderKind::Sell,
                    Step::Close => OrderKind::Close,
                };
                let units = match step {
                    Step::Buy(u) | Step::Sell(u) => u,
                    Step::Close => 1,
                };
                let o = order(id, "X", kind, units);
                broker.submit(o.clone());
                let cash_before = broker.cash();
                let b = bar("X", i as i64, price, volume);
                broker.set_timestamp(b.timestamp);
                broker.execute_orders(&b);

                let snap = o.snapshot();
                if snap.status.is_filled() {
                    match kind {
                        OrderKind::Buy => {
                            bought += snap.units_traded;
                            let expected = cash_before
                                - snap.units_traded as f64 * price * (1.0 + commission);
                            prop_assert_eq!(broker.cash(), expected);
                        }
                        _ => sold += snap.units_traded,
                    }
                }
                prop_assert_eq!(broker.position("X"), bought - sold);
                prop_assert!(broker.cash() > -1e-6);
                prop_assert!(broker.open_orders().is_empty());
            }
        }
    }
}
