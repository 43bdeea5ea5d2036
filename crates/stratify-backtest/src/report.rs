//! Backtest report generation.

use serde::Serialize;
use stratify_broker::LedgerSummary;
use stratify_core::types::Order;

use crate::statistics::StatValue;
use crate::strategy::StrategyContext;

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════\n";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────\n";

/// One tracker's final result.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticEntry {
    pub id: String,
    pub value: StatValue,
    /// Human readable rendering
    pub text: String,
}

/// Results of one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub name: String,
    pub statistics: Vec<StatisticEntry>,
    /// Every order the strategy issued, in issue order
    pub orders: Vec<Order>,
}

impl StrategyReport {
    pub(crate) fn new(name: &str, ctx: &StrategyContext) -> Self {
        Self {
            name: name.to_string(),
            statistics: ctx
                .statistics()
                .iter()
                .map(|t| StatisticEntry {
                    id: t.id().to_string(),
                    value: t.stats(),
                    text: t.stats_string(),
                })
                .collect(),
            orders: ctx.orders(),
        }
    }

    /// Value of the first statistic registered under `id`.
    pub fn statistic(&self, id: &str) -> Option<&StatValue> {
        self.statistics
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.value)
    }
}

/// Complete backtest report.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    /// Final ledger state
    pub ledger: LedgerSummary,
    /// Distinct timestamps replayed
    pub timeline_len: usize,
    /// Bars processed across all series
    pub bars_processed: usize,
    pub strategies: Vec<StrategyReport>,
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(RULE_HEAVY);
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str(RULE_HEAVY);
        s.push('\n');

        s.push_str("LEDGER\n");
        s.push_str(RULE_LIGHT);
        s.push_str(&format!("  Cash:                {:.2}\n", self.ledger.cash));
        s.push_str(&format!(
            "  Portfolio Value:     {:.2}\n",
            self.ledger.portfolio_value
        ));
        s.push_str(&format!(
            "  Commission Rate:     {:.4}\n",
            self.ledger.commission_rate
        ));
        s.push_str(&format!(
            "  Slippage Bound:      {:.4}\n",
            self.ledger.slippage_bound
        ));
        for (instrument, units) in &self.ledger.positions {
            s.push_str(&format!("  Position {:<11} {}\n", instrument, units));
        }
        s.push_str(&format!(
            "  Open Orders:         {}\n",
            self.ledger.open_orders
        ));
        s.push_str(&format!(
            "  Closed Orders:       {}\n",
            self.ledger.closed_orders
        ));
        s.push('\n');

        for strategy in &self.strategies {
            s.push_str(&format!("STRATEGY {}\n", strategy.name.to_uppercase()));
            s.push_str(RULE_LIGHT);
            for entry in &strategy.statistics {
                for line in entry.text.lines() {
                    s.push_str("  ");
                    s.push_str(line);
                    s.push('\n');
                }
            }
            s.push('\n');
        }

        s.push_str("EXECUTION\n");
        s.push_str(RULE_LIGHT);
        s.push_str(&format!("  Timeline Length:     {}\n", self.timeline_len));
        s.push_str(&format!("  Bars Processed:      {}\n", self.bars_processed));
        s.push('\n');

        s.push_str(RULE_HEAVY);

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Report for the strategy named `name`.
    pub fn strategy(&self, name: &str) -> Option<&StrategyReport> {
        self.strategies.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report() -> BacktestReport {
        BacktestReport {
            ledger: LedgerSummary {
                timestamp: None,
                cash: 9_000.0,
                portfolio_value: 11_000.0,
                commission_rate: 0.0,
                slippage_bound: 0.0,
                positions: BTreeMap::from([("AAPL".to_string(), 100)]),
                open_orders: 0,
                closed_orders: 1,
            },
            timeline_len: 20,
            bars_processed: 20,
            strategies: vec![StrategyReport {
                name: "buy_and_hold".to_string(),
                statistics: vec![StatisticEntry {
                    id: "total_return".to_string(),
                    value: StatValue::Number(10.0),
                    text: "Total Return: 10.00%".to_string(),
                }],
                orders: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_report_summary() {
        let summary = report().summary();
        assert!(summary.contains("BACKTEST REPORT"));
        assert!(summary.contains("STRATEGY BUY_AND_HOLD"));
        assert!(summary.contains("  Total Return: 10.00%"));
        assert!(summary.contains("11000.00"));
        assert!(summary.contains("AAPL"));
    }

    #[test]
    fn test_report_json() {
        let report = report();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["strategies"][0]["statistics"][0]["value"], 10.0);
        assert_eq!(json["ledger"]["positions"]["AAPL"], 100);
        assert_eq!(
            report.strategy("buy_and_hold").unwrap().statistic("total_return"),
            Some(&StatValue::Number(10.0))
        );
    }
}
