//! Order types and the fill-status state machine.
//!
//! An order is shared between the strategy that issued it and the broker
//! that executes it. Both sides hold a handle onto the same record:
//! [`OrderHandle`] may only cancel, [`OrderRef`] may drive any transition.
//! Every status change goes through [`FillStatus::can_transition_to`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::OrderError;

/// Run-unique order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the order asks the broker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Buy the requested units
    Buy,
    /// Sell up to the requested units of the current holding
    Sell,
    /// Liquidate the whole holding
    Close,
}

impl OrderKind {
    /// Sells and closes reduce a position.
    pub fn is_exit(&self) -> bool {
        matches!(self, OrderKind::Sell | OrderKind::Close)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Buy => write!(f, "BUY"),
            OrderKind::Sell => write!(f, "SELL"),
            OrderKind::Close => write!(f, "CLOSE"),
        }
    }
}

/// Order fill status.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    /// Waiting for the instrument's next bar
    Pending,
    /// All requested units traded
    Filled,
    /// Fewer units traded than requested
    PartiallyFilled,
    /// Broker refused the order
    Rejected,
    /// Strategy withdrew the order before execution
    Cancelled,
}

impl FillStatus {
    /// Check if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FillStatus::Pending)
    }

    /// Check if any units traded.
    pub fn is_filled(&self) -> bool {
        matches!(self, FillStatus::Filled | FillStatus::PartiallyFilled)
    }

    /// Only `Pending -> terminal` moves are legal.
    pub fn can_transition_to(&self, next: FillStatus) -> bool {
        *self == FillStatus::Pending && next.is_terminal()
    }
}

impl fmt::Display for FillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FillStatus::Pending => "pending",
            FillStatus::Filled => "filled",
            FillStatus::PartiallyFilled => "partially_filled",
            FillStatus::Rejected => "rejected",
            FillStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// An order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID
    pub id: OrderId,
    /// Instrument traded
    pub instrument: String,
    /// Buy, sell or close
    pub kind: OrderKind,
    /// Requested units; a close is rewritten to the full holding on execution
    pub units: u64,
    /// Current status
    pub status: FillStatus,
    /// Simulation time the order was issued
    pub opened_at: DateTime<Utc>,
    /// Simulation time the order was filled
    pub closed_at: Option<DateTime<Utc>>,
    /// Signed cash effect of the fill (negative for buys)
    pub cash_impact: f64,
    /// Units that actually traded
    pub units_traded: u64,
}

impl Order {
    /// Create a new pending order.
    pub fn new(
        id: OrderId,
        instrument: impl Into<String>,
        kind: OrderKind,
        units: u64,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            instrument: instrument.into(),
            kind,
            units,
            status: FillStatus::Pending,
            opened_at,
            closed_at: None,
            cash_impact: 0.0,
            units_traded: 0,
        }
    }

    /// Check if the order still awaits execution.
    pub fn is_pending(&self) -> bool {
        self.status == FillStatus::Pending
    }

    /// Move to `next`, refusing anything but `Pending -> terminal`.
    pub fn transition(&mut self, next: FillStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::IllegalTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Strategy-side handle: can inspect the order and cancel it.
#[derive(Debug, Clone)]
pub struct OrderHandle(Rc<RefCell<Order>>);

impl OrderHandle {
    /// Order ID.
    pub fn id(&self) -> OrderId {
        self.0.borrow().id
    }

    /// Current status.
    pub fn status(&self) -> FillStatus {
        self.0.borrow().status
    }

    /// Cancel a pending order. The broker drops it at its next execution pass.
    pub fn cancel(&self) -> Result<(), OrderError> {
        self.0.borrow_mut().transition(FillStatus::Cancelled)
    }

    /// Copy of the current order record.
    pub fn snapshot(&self) -> Order {
        self.0.borrow().clone()
    }
}

/// Broker-side handle: the authoritative writer during execution.
#[derive(Debug, Clone)]
pub struct OrderRef(Rc<RefCell<Order>>);

impl OrderRef {
    /// Wrap a fresh order.
    pub fn new(order: Order) -> Self {
        Self(Rc::new(RefCell::new(order)))
    }

    /// Hand out a cancel-only view of the same order.
    pub fn handle(&self) -> OrderHandle {
        OrderHandle(Rc::clone(&self.0))
    }

    pub fn id(&self) -> OrderId {
        self.0.borrow().id
    }

    pub fn instrument(&self) -> String {
        self.0.borrow().instrument.clone()
    }

    pub fn kind(&self) -> OrderKind {
        self.0.borrow().kind
    }

    pub fn units(&self) -> u64 {
        self.0.borrow().units
    }

    pub fn status(&self) -> FillStatus {
        self.0.borrow().status
    }

    /// Check if this order targets `instrument`.
    pub fn is_for(&self, instrument: &str) -> bool {
        self.0.borrow().instrument == instrument
    }

    /// Rewrite the requested units of a pending order.
    pub fn set_units(&self, units: u64) {
        let mut order = self.0.borrow_mut();
        if order.is_pending() {
            order.units = units;
        }
    }

    /// Record a fill. The status is `Filled` when every requested unit
    /// traded, `PartiallyFilled` otherwise.
    pub fn fill(
        &self,
        units_traded: u64,
        cash_impact: f64,
        at: DateTime<Utc>,
    ) -> Result<FillStatus, OrderError> {
        let mut order = self.0.borrow_mut();
        let status = if units_traded < order.units {
            FillStatus::PartiallyFilled
        } else {
            FillStatus::Filled
        };
        order.transition(status)?;
        order.units_traded = units_traded;
        order.cash_impact = cash_impact;
        order.closed_at = Some(at);
        Ok(status)
    }

    /// Record a rejection.
    pub fn reject(&self) -> Result<(), OrderError> {
        self.0.borrow_mut().transition(FillStatus::Rejected)
    }

    /// Deep copy of the current order record.
    pub fn snapshot(&self) -> Order {
        self.0.borrow().clone()
    }
}
