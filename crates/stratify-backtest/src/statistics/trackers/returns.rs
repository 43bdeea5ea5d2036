//! Trackers that only look at the first and last snapshot.

use chrono::{DateTime, Utc};

use crate::statistics::{Snapshot, StatId, StatValue, StatisticTracker};

fn number(value: Option<f64>) -> StatValue {
    value.map(StatValue::Number).unwrap_or(StatValue::Unavailable)
}

fn text(label: &str, value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{label}: {v:.2}{suffix}"),
        None => format!("{label}: n/a"),
    }
}

/// Percentage change of portfolio value over the run.
#[derive(Debug, Default)]
pub struct TotalReturnTracker {
    initial: f64,
    result: Option<f64>,
}

impl StatisticTracker for TotalReturnTracker {
    fn id(&self) -> &str {
        StatId::TOTAL_RETURN
    }

    fn start(&mut self, snapshot: &Snapshot) {
        self.initial = snapshot.portfolio_value;
    }

    fn end(&mut self, snapshot: &Snapshot) {
        self.result = Some(if self.initial == 0.0 {
            0.0
        } else {
            (snapshot.portfolio_value - self.initial) / self.initial * 100.0
        });
    }

    fn stats(&self) -> StatValue {
        number(self.result)
    }

    fn stats_string(&self) -> String {
        text("Total Return", self.result, "%")
    }
}

/// Compound yearly return over the run.
#[derive(Debug, Default)]
pub struct AnnualizedReturnTracker {
    initial: Option<(DateTime<Utc>, f64)>,
    result: Option<f64>,
}

impl StatisticTracker for AnnualizedReturnTracker {
    fn id(&self) -> &str {
        StatId::ANNUALIZED_RETURN
    }

    fn start(&mut self, snapshot: &Snapshot) {
        self.initial = Some((snapshot.timestamp(), snapshot.portfolio_value));
    }

    fn end(&mut self, snapshot: &Snapshot) {
        let Some((start_time, initial)) = self.initial else {
            return;
        };
        let years = (snapshot.timestamp() - start_time).num_days() as f64 / 365.25;

        self.result = Some(if years <= 0.0 || initial == 0.0 {
            0.0
        } else {
            ((snapshot.portfolio_value / initial).powf(1.0 / years) - 1.0) * 100.0
        });
    }

    fn stats(&self) -> StatValue {
        number(self.result)
    }

    fn stats_string(&self) -> String {
        text("Annualized Return", self.result, "%")
    }
}

/// Cash available when the strategy first ran.
#[derive(Debug, Default)]
pub struct StartingCashTracker {
    cash: Option<f64>,
}

impl StatisticTracker for StartingCashTracker {
    fn id(&self) -> &str {
        StatId::STARTING_CASH
    }

    fn start(&mut self, snapshot: &Snapshot) {
        self.cash = Some(snapshot.portfolio_cash);
    }

    fn stats(&self) -> StatValue {
        number(self.cash)
    }

    fn stats_string(&self) -> String {
        text("Starting Cash", self.cash, "")
    }
}

/// Portfolio value at the end of the run.
#[derive(Debug, Default)]
pub struct FinalValueTracker {
    value: Option<f64>,
}

impl StatisticTracker for FinalValueTracker {
    fn id(&self) -> &str {
        StatId::FINAL_PORTFOLIO_VALUE
    }

    fn end(&mut self, snapshot: &Snapshot) {
        self.value = Some(snapshot.portfolio_value);
    }

    fn stats(&self) -> StatValue {
        number(self.value)
    }

    fn stats_string(&self) -> String {
        text("Final Portfolio Value", self.value, "")
    }
}

/// Absolute change of portfolio value over the run.
#[derive(Debug, Default)]
pub struct NetProfitTracker {
    initial: f64,
    result: Option<f64>,
}

impl StatisticTracker for NetProfitTracker {
    fn id(&self) -> &str {
        StatId::NET_PROFIT_OR_LOSS
    }

    fn start(&mut self, snapshot: &Snapshot) {
        self.initial = snapshot.portfolio_value;
    }

    fn end(&mut self, snapshot: &Snapshot) {
        self.result = Some(snapshot.portfolio_value - self.initial);
    }

    fn stats(&self) -> StatValue {
        number(self.result)
    }

    fn stats_string(&self) -> String {
        text("Net Profit/Loss", self.result, "")
    }
}
