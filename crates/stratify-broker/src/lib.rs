//! Simulated broker.
//!
//! Owns the ledger (cash, positions, open and closed orders) and resolves
//! open orders against each bar the scheduler hands it.

mod simulated;

pub use simulated::{Execution, LedgerSummary, RejectReason, SimulatedBroker};
