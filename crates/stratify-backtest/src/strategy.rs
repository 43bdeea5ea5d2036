//! Strategy trait and the per-strategy context the engine hands to it.

use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::rc::Rc;
use stratify_core::types::{Bar, Order, OrderHandle, OrderId, OrderKind, OrderRef};

use crate::statistics::{StatValue, StatisticsManager};

/// Core strategy trait.
///
/// The engine calls `start` once before the first `next`, `next` once per
/// bar of the merged timeline, and `end` once after the timeline is
/// exhausted. Orders are placed through the [`StrategyContext`].
pub trait Strategy {
    /// Get the name of this strategy.
    fn name(&self) -> &str;

    /// Called once, just before the first `next`.
    fn start(&mut self, _ctx: &mut StrategyContext) {}

    /// Called for every bar, in timeline order.
    fn next(&mut self, ctx: &mut StrategyContext);

    /// Called once after the last bar.
    fn end(&mut self, _ctx: &mut StrategyContext) {}
}

/// Run-wide order id sequence shared by every strategy context.
#[derive(Debug, Clone, Default)]
pub struct OrderIdGenerator(Rc<Cell<u64>>);

impl OrderIdGenerator {
    /// Next id; the first is 1.
    pub fn next_id(&self) -> OrderId {
        let id = self.0.get() + 1;
        self.0.set(id);
        OrderId(id)
    }
}

/// What a strategy sees and can do during a callback.
pub struct StrategyContext {
    bar: Bar,
    ids: OrderIdGenerator,
    queued: Vec<OrderRef>,
    issued: Vec<OrderRef>,
    statistics: StatisticsManager,
}

impl StrategyContext {
    pub(crate) fn new(ids: OrderIdGenerator) -> Self {
        Self {
            bar: Bar::default(),
            ids,
            queued: Vec::new(),
            issued: Vec::new(),
            statistics: StatisticsManager::new(),
        }
    }

    pub(crate) fn set_bar(&mut self, bar: &Bar) {
        self.bar.clone_from(bar);
    }

    pub(crate) fn drain_queued(&mut self) -> Vec<OrderRef> {
        std::mem::take(&mut self.queued)
    }

    pub(crate) fn issued(&self) -> &[OrderRef] {
        &self.issued
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut StatisticsManager {
        &mut self.statistics
    }

    /// The bar currently being processed.
    pub fn bar(&self) -> &Bar {
        &self.bar
    }

    pub fn instrument(&self) -> &str {
        &self.bar.instrument
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.bar.timestamp
    }

    pub fn open(&self) -> f64 {
        self.bar.open
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    pub fn low(&self) -> f64 {
        self.bar.low
    }

    pub fn high(&self) -> f64 {
        self.bar.high
    }

    pub fn volume(&self) -> u64 {
        self.bar.volume
    }

    fn place(&mut self, kind: OrderKind, units: u64) -> OrderHandle {
        let order = OrderRef::new(Order::new(
            self.ids.next_id(),
            self.bar.instrument.clone(),
            kind,
            units,
            self.bar.timestamp,
        ));
        let handle = order.handle();
        self.queued.push(order.clone());
        self.issued.push(order);
        handle
    }

    /// Buy `units` of the current instrument.
    pub fn buy(&mut self, units: u64) -> OrderHandle {
        self.place(OrderKind::Buy, units)
    }

    /// Sell up to `units` of the current instrument.
    pub fn sell(&mut self, units: u64) -> OrderHandle {
        self.place(OrderKind::Sell, units)
    }

    /// Liquidate the whole holding in the current instrument.
    pub fn close_position(&mut self) -> OrderHandle {
        self.place(OrderKind::Close, 0)
    }

    /// Copies of every order this strategy issued, oldest first.
    pub fn orders(&self) -> Vec<Order> {
        self.issued.iter().map(OrderRef::snapshot).collect()
    }

    /// Current value of a statistic by its id (see [`StatId`](crate::StatId)).
    pub fn statistic(&self, id: &str) -> Option<StatValue> {
        self.statistics.statistic(id)
    }

    /// Read access to the attached trackers.
    pub fn statistics(&self) -> &StatisticsManager {
        &self.statistics
    }
}
