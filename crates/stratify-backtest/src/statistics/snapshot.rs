use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use stratify_broker::SimulatedBroker;
use stratify_core::types::{Bar, Order, OrderKind, OrderRef, Position};

/// Per-tick view of market and portfolio state for one strategy.
///
/// Everything here is a deep copy; trackers cannot reach the live ledger or
/// the shared order records through it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Bar the strategy just reacted to
    pub bar: Bar,
    pub portfolio_cash: f64,
    pub portfolio_value: f64,
    pub commission_rate: f64,
    pub slippage_bound: f64,
    pub positions: BTreeMap<String, Position>,
    /// Orders the strategy issued during this tick
    pub tick_orders: Vec<Order>,
    pub open_orders: Vec<Order>,
    pub closed_orders: Vec<Order>,
    /// Every order the strategy has issued so far, oldest first
    pub strategy_orders: Vec<Order>,
    /// Realized cash impact of the strategy's filled orders
    pub net_cash_pnl: f64,
    /// `net_cash_pnl` plus the strategy's net units marked at the current bar
    pub net_value_pnl: f64,
}

impl Snapshot {
    pub(crate) fn capture(
        bar: &Bar,
        broker: &SimulatedBroker,
        tick_orders: &[OrderRef],
        strategy_orders: &[OrderRef],
    ) -> Self {
        let strategy_orders: Vec<Order> = strategy_orders.iter().map(OrderRef::snapshot).collect();
        let (net_cash_pnl, net_value_pnl) = net_pnl(&strategy_orders, |i| broker.mark(i));

        Self {
            bar: bar.clone(),
            portfolio_cash: broker.cash(),
            portfolio_value: broker.portfolio_value(),
            commission_rate: broker.commission_rate(),
            slippage_bound: broker.slippage_bound(),
            positions: broker.positions_snapshot(),
            tick_orders: tick_orders.iter().map(OrderRef::snapshot).collect(),
            open_orders: broker.open_orders_snapshot(),
            closed_orders: broker.closed_orders_snapshot(),
            strategy_orders,
            net_cash_pnl,
            net_value_pnl,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.bar.timestamp
    }
}

#[cfg(test)]
impl Snapshot {
    /// Cash-only snapshot at `timestamp` worth `value`.
    pub(crate) fn valued(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            bar: Bar::new("TEST", timestamp, value, value, value, value, 1),
            portfolio_cash: value,
            portfolio_value: value,
            commission_rate: 0.0,
            slippage_bound: 0.0,
            positions: BTreeMap::new(),
            tick_orders: Vec::new(),
            open_orders: Vec::new(),
            closed_orders: Vec::new(),
            strategy_orders: Vec::new(),
            net_cash_pnl: 0.0,
            net_value_pnl: 0.0,
        }
    }
}

/// Cash and mark-to-market P/L of a set of orders.
///
/// Instruments without a mark contribute nothing to the value leg.
pub(crate) fn net_pnl<F>(orders: &[Order], mark: F) -> (f64, f64)
where
    F: Fn(&str) -> Option<f64>,
{
    let mut cash = 0.0;
    let mut units: BTreeMap<&str, i64> = BTreeMap::new();

    for order in orders.iter().filter(|o| o.status.is_filled()) {
        cash += order.cash_impact;
        let delta = order.units_traded as i64;
        let held = units.entry(order.instrument.as_str()).or_insert(0);
        match order.kind {
            OrderKind::Buy => *held += delta,
            OrderKind::Sell | OrderKind::Close => *held -= delta,
        }
    }

    let value = units
        .into_iter()
        .map(|(instrument, held)| held as f64 * mark(instrument).unwrap_or(0.0))
        .sum::<f64>();

    (cash, cash + value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stratify_core::types::OrderId;

    fn filled(id: u64, instrument: &str, kind: OrderKind, units: u64, impact: f64) -> Order {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let order = OrderRef::new(Order::new(OrderId(id), instrument, kind, units, t));
        order.fill(units, impact, t).unwrap();
        order.snapshot()
    }

    #[test]
    fn test_net_pnl_marks_open_units() {
        let orders = vec![
            filled(1, "AAPL", OrderKind::Buy, 10, -1_000.0),
            filled(2, "AAPL", OrderKind::Sell, 4, 480.0),
            filled(3, "MSFT", OrderKind::Buy, 1, -50.0),
        ];

        let (cash, value) = net_pnl(&orders, |i| (i == "AAPL").then_some(130.0));

        assert_eq!(cash, -570.0);
        // 6 AAPL at 130, MSFT has no mark
        assert_eq!(value, -570.0 + 780.0);
    }

    #[test]
    fn test_net_pnl_ignores_unfilled() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let pending = Order::new(OrderId(1), "AAPL", OrderKind::Buy, 10, t);

        assert_eq!(net_pnl(&[pending], |_| Some(100.0)), (0.0, 0.0));
    }
}
