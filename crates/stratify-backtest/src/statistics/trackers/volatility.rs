use statrs::statistics::Statistics;

use crate::statistics::{Snapshot, StatId, StatValue, StatisticTracker};

/// Sample standard deviation of tick-over-tick portfolio returns, in
/// percent.
#[derive(Debug, Default)]
pub struct VolatilityTracker {
    values: Vec<f64>,
    result: Option<f64>,
}

/// Period returns; a zero previous value yields a zero return.
fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] == 0.0 { 0.0 } else { (w[1] - w[0]) / w[0] })
        .collect()
}

impl StatisticTracker for VolatilityTracker {
    fn id(&self) -> &str {
        StatId::VOLATILITY
    }

    fn update(&mut self, snapshot: &Snapshot) {
        self.values.push(snapshot.portfolio_value);
    }

    fn end(&mut self, _snapshot: &Snapshot) {
        let returns = period_returns(&self.values);
        self.result = Some(if returns.len() < 2 {
            0.0
        } else {
            returns.iter().std_dev() * 100.0
        });
    }

    fn stats(&self) -> StatValue {
        self.result
            .map(StatValue::Number)
            .unwrap_or(StatValue::Unavailable)
    }

    fn stats_string(&self) -> String {
        match self.result {
            Some(v) => format!("Volatility: {v:.2}%"),
            None => "Volatility: n/a".to_string(),
        }
    }
}
