//! FIFO pairing of a strategy's fills into round-trip trades.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use stratify_core::types::{Order, OrderId, OrderKind};

use crate::statistics::{
    format_duration, serialize_duration, Snapshot, StatId, StatValue, StatisticTracker,
};

const PROFIT_EPSILON: f64 = 1e-8;

/// One matched buy/exit pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedTrade {
    pub buy: OrderId,
    pub exit: OrderId,
    pub units: u64,
    pub profit: f64,
    #[serde(serialize_with = "serialize_duration")]
    pub holding: Duration,
}

impl MatchedTrade {
    pub fn is_won(&self) -> bool {
        self.profit > PROFIT_EPSILON
    }
}

/// Aggregate trade results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    /// Percent of trades won
    pub win_rate: f64,
    pub average_profit: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    #[serde(serialize_with = "serialize_duration")]
    pub average_holding: Duration,
    pub trades: Vec<MatchedTrade>,
}

impl TradeStats {
    fn from_trades(trades: Vec<MatchedTrade>) -> Self {
        let total = trades.len();
        let won = trades.iter().filter(|t| t.is_won()).count();
        let lost = total - won;

        let profits = || trades.iter().map(|t| t.profit);
        let largest_win = profits().reduce(f64::max).unwrap_or(0.0);
        let largest_loss = profits().reduce(f64::min).unwrap_or(0.0);

        let (win_rate, average_profit, average_holding) = if total == 0 {
            (0.0, 0.0, Duration::zero())
        } else {
            let profit: f64 = trades.iter().map(|t| t.profit).sum();
            let holding = trades
                .iter()
                .fold(Duration::zero(), |acc, t| acc + t.holding);
            (
                won as f64 / total as f64 * 100.0,
                profit / total as f64,
                holding / total as i32,
            )
        };

        Self {
            total,
            won,
            lost,
            win_rate,
            average_profit,
            largest_win,
            largest_loss,
            average_holding,
            trades,
        }
    }
}

/// Unmatched remainder of a filled order.
#[derive(Debug, Clone, Copy)]
struct Leg {
    id: OrderId,
    remaining: u64,
    unit_impact: f64,
    opened_at: DateTime<Utc>,
    closed_at: DateTime<Utc>,
}

impl Leg {
    fn from_order(order: &Order) -> Option<Self> {
        if !order.status.is_filled() || order.units == 0 {
            return None;
        }
        Some(Self {
            id: order.id,
            remaining: order.units,
            unit_impact: order.cash_impact / order.units as f64,
            opened_at: order.opened_at,
            closed_at: order.closed_at.unwrap_or(order.opened_at),
        })
    }
}

/// Pair filled orders oldest first: each buy against the oldest sell or
/// close, across every instrument the strategy traded.
pub(crate) fn pair_trades(orders: &[Order]) -> Vec<MatchedTrade> {
    let mut buys: VecDeque<Leg> = VecDeque::new();
    let mut exits: VecDeque<Leg> = VecDeque::new();

    for order in orders {
        if let Some(leg) = Leg::from_order(order) {
            if order.kind.is_exit() {
                exits.push_back(leg);
            } else {
                buys.push_back(leg);
            }
        }
    }

    let mut trades = Vec::new();
    while let (Some(mut buy), Some(mut exit)) = (buys.pop_front(), exits.pop_front()) {
        let units = buy.remaining.min(exit.remaining);
        let profit = units as f64 * exit.unit_impact + units as f64 * buy.unit_impact;

        trades.push(MatchedTrade {
            buy: buy.id,
            exit: exit.id,
            units,
            profit,
            holding: exit.closed_at - buy.opened_at,
        });

        buy.remaining -= units;
        exit.remaining -= units;
        if buy.remaining > 0 {
            buys.push_front(buy);
        }
        if exit.remaining > 0 {
            exits.push_front(exit);
        }
    }
    trades
}

/// Win/loss attribution over the strategy's fills, computed at `end`.
#[derive(Debug, Default)]
pub struct TradesTracker {
    result: Option<TradeStats>,
}

impl StatisticTracker for TradesTracker {
    fn id(&self) -> &str {
        StatId::TRADES
    }

    fn end(&mut self, snapshot: &Snapshot) {
        self.result = Some(TradeStats::from_trades(pair_trades(
            &snapshot.strategy_orders,
        )));
    }

    fn stats(&self) -> StatValue {
        self.result
            .clone()
            .map(StatValue::Trades)
            .unwrap_or(StatValue::Unavailable)
    }

    fn stats_string(&self) -> String {
        let Some(r) = &self.result else {
            return "Trades: n/a".to_string();
        };
        format!(
            "Trades: {} (won {}, lost {}, win rate {:.2}%)\n\
             Average Profit: {:.2}\n\
             Largest Win: {:.2}\n\
             Largest Loss: {:.2}\n\
             Average Holding: {}",
            r.total,
            r.won,
            r.lost,
            r.win_rate,
            r.average_profit,
            r.largest_win,
            r.largest_loss,
            format_duration(r.average_holding)
        )
    }
}
