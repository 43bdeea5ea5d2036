//! Backtest scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::rc::Rc;
use stratify_broker::SimulatedBroker;
use stratify_core::error::EngineError;
use stratify_core::types::{Bar, MarketSeries, Order};
use tracing::{debug, info, trace};

use crate::report::{BacktestReport, StrategyReport};
use crate::statistics::{default_trackers, Snapshot, StatValue, StatisticTracker, TrackerFactory};
use crate::strategy::{OrderIdGenerator, Strategy, StrategyContext};

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial cash
    pub cash: f64,
    /// Commission per fill, as a decimal
    pub commission_rate: f64,
    /// Maximum adverse slippage, as a decimal
    pub slippage_bound: f64,
    /// Seed for the slippage source; entropy when unset
    pub seed: Option<u64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            cash: 10_000.0,
            commission_rate: 0.0,
            slippage_bound: 0.0,
            seed: None,
        }
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Running,
    Finished,
}

struct StrategySlot {
    strategy: Box<dyn Strategy>,
    ctx: StrategyContext,
    started: bool,
}

/// Backtesting engine.
///
/// Merges every attached series into one timeline and, for each bar of each
/// cross-section, runs every strategy in attachment order before letting the
/// broker execute orders for that bar's instrument.
pub struct BacktestEngine {
    series: Vec<Rc<MarketSeries>>,
    slots: Vec<StrategySlot>,
    factories: Vec<TrackerFactory>,
    broker: SimulatedBroker,
    ids: OrderIdGenerator,
    state: EngineState,
}

impl BacktestEngine {
    /// Create an engine around an already configured broker.
    pub fn new(broker: SimulatedBroker) -> Self {
        Self {
            series: Vec::new(),
            slots: Vec::new(),
            factories: Vec::new(),
            broker,
            ids: OrderIdGenerator::default(),
            state: EngineState::Idle,
        }
    }

    /// Create an engine with a broker built from `config`.
    pub fn from_config(config: &BacktestConfig) -> Self {
        let mut broker = match config.seed {
            Some(seed) => SimulatedBroker::with_seed(seed),
            None => SimulatedBroker::new(),
        };
        broker.set_cash(config.cash);
        broker.set_commission_rate(config.commission_rate);
        broker.set_slippage_bound(config.slippage_bound);
        Self::new(broker)
    }

    pub fn broker(&self) -> &SimulatedBroker {
        &self.broker
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Attach a market data series. An empty series is refused.
    pub fn add_series(&mut self, series: MarketSeries) -> Result<(), EngineError> {
        if series.is_empty() {
            return Err(EngineError::EmptySeries(series.instrument));
        }
        let series = Rc::new(series);
        self.broker.attach_series(Rc::clone(&series));
        self.series.push(series);
        Ok(())
    }

    /// Attach a strategy. Strategies react to each bar in attachment order.
    pub fn add_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.slots.push(StrategySlot {
            strategy,
            ctx: StrategyContext::new(self.ids.clone()),
            started: false,
        });
    }

    /// Register a custom tracker; every strategy gets its own instance.
    pub fn add_statistic<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn StatisticTracker> + 'static,
    {
        self.factories.push(Box::new(factory));
    }

    /// Earliest timestamp across all series.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.series.iter().filter_map(|s| s.first_timestamp()).min()
    }

    /// Latest timestamp across all series.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.series.iter().filter_map(|s| s.last_timestamp()).max()
    }

    /// Distinct timestamps of every series, ascending.
    pub fn timeline(&self) -> Vec<DateTime<Utc>> {
        self.series
            .iter()
            .flat_map(|s| s.iter().map(|b| b.timestamp))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Statistic `id` of the strategy attached at `index`.
    pub fn statistic(&self, index: usize, id: &str) -> Option<StatValue> {
        self.slots.get(index)?.ctx.statistic(id)
    }

    /// Every order issued by the strategy attached at `index`.
    pub fn strategy_orders(&self, index: usize) -> Option<Vec<Order>> {
        self.slots.get(index).map(|s| s.ctx.orders())
    }

    /// Run the whole timeline once.
    pub fn run(&mut self) -> Result<BacktestReport, EngineError> {
        if self.state != EngineState::Idle {
            return Err(EngineError::AlreadyRan);
        }
        if self.series.is_empty() {
            return Err(EngineError::NoSeries);
        }
        self.state = EngineState::Running;

        for slot in &mut self.slots {
            let stats = slot.ctx.statistics_mut();
            for tracker in default_trackers() {
                stats.add(tracker);
            }
            for factory in &self.factories {
                stats.add(factory());
            }
        }

        let timeline = self.timeline();
        info!(
            series = self.series.len(),
            strategies = self.slots.len(),
            ticks = timeline.len(),
            cash = self.broker.cash(),
            "starting backtest"
        );

        let mut bars_processed = 0usize;
        let mut last_bar: Option<Bar> = None;

        for &now in &timeline {
            self.broker.set_timestamp(now);
            trace!(timestamp = %now, "tick");

            for series in &self.series {
                for bar in series.bars_at(now) {
                    for slot in &mut self.slots {
                        react(slot, bar, &mut self.broker);
                    }
                    self.broker.execute_orders(bar);
                    bars_processed += 1;
                    last_bar = Some(bar.clone());
                }
            }
        }

        let last_bar = last_bar.ok_or(EngineError::NoSeries)?;
        for slot in &mut self.slots {
            finish(slot, &last_bar, &mut self.broker);
        }

        self.state = EngineState::Finished;
        let ledger = self.broker.summary();
        info!(
            bars = bars_processed,
            cash = ledger.cash,
            portfolio_value = ledger.portfolio_value,
            closed_orders = ledger.closed_orders,
            "backtest finished"
        );

        Ok(BacktestReport {
            ledger,
            timeline_len: timeline.len(),
            bars_processed,
            strategies: self
                .slots
                .iter()
                .map(|s| StrategyReport::new(s.strategy.name(), &s.ctx))
                .collect(),
        })
    }
}

/// One strategy's turn on one bar.
fn react(slot: &mut StrategySlot, bar: &Bar, broker: &mut SimulatedBroker) {
    slot.ctx.set_bar(bar);
    if !slot.started {
        slot.strategy.start(&mut slot.ctx);
        slot.started = true;
    }
    slot.strategy.next(&mut slot.ctx);

    let queued = slot.ctx.drain_queued();
    for order in &queued {
        broker.submit(order.clone());
    }

    let snapshot = Snapshot::capture(bar, broker, &queued, slot.ctx.issued());
    slot.ctx.statistics_mut().observe(&snapshot);
}

/// End hooks for one strategy, then its trackers over a closing snapshot.
fn finish(slot: &mut StrategySlot, last_bar: &Bar, broker: &mut SimulatedBroker) {
    if !slot.started {
        return;
    }
    slot.ctx.set_bar(last_bar);
    slot.strategy.end(&mut slot.ctx);

    let queued = slot.ctx.drain_queued();
    if !queued.is_empty() {
        debug!(
            strategy = slot.strategy.name(),
            orders = queued.len(),
            "orders issued at end stay open"
        );
    }
    for order in &queued {
        broker.submit(order.clone());
    }

    let snapshot = Snapshot::capture(last_bar, broker, &queued, slot.ctx.issued());
    slot.ctx.statistics_mut().end(&snapshot);
}
