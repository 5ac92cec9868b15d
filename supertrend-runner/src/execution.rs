//! Order execution adapter for live collaborators.
//!
//! Consumes the signal stream only. Backtest simulation never goes through
//! an executor, and an executor never sees bands or equity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use supertrend_core::{latest_actionable, Bar, Signal};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Acknowledgement for an accepted market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    /// Timestamp of the bar whose signal triggered the order.
    pub bar_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("order size must be finite and > 0, got {0}")]
    InvalidSize(f64),
    #[error("{side} rejected for {symbol}: {reason}")]
    Rejected {
        symbol: String,
        side: OrderSide,
        reason: String,
    },
}

/// Anything that can place market orders.
pub trait OrderExecutor {
    fn market_buy(&mut self, symbol: &str, size: f64) -> Result<OrderAck, ExecutionError>;
    fn market_sell(&mut self, symbol: &str, size: f64) -> Result<OrderAck, ExecutionError>;
}

/// In-memory executor with long-only bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct PaperExecutor {
    orders: Vec<OrderAck>,
    in_position: bool,
}

impl PaperExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an open position, e.g. one carried over from earlier bars.
    pub fn with_position(in_position: bool) -> Self {
        Self {
            orders: Vec::new(),
            in_position,
        }
    }

    pub fn orders(&self) -> &[OrderAck] {
        &self.orders
    }

    pub fn in_position(&self) -> bool {
        self.in_position
    }

    fn submit(&mut self, symbol: &str, side: OrderSide, size: f64) -> Result<OrderAck, ExecutionError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(ExecutionError::InvalidSize(size));
        }
        let reject = |reason: &str| ExecutionError::Rejected {
            symbol: symbol.to_string(),
            side,
            reason: reason.to_string(),
        };
        match (side, self.in_position) {
            (OrderSide::Buy, true) => return Err(reject("already in position")),
            (OrderSide::Sell, false) => return Err(reject("no open position")),
            _ => {}
        }

        self.in_position = side == OrderSide::Buy;
        let ack = OrderAck {
            order_id: self.orders.len() as u64 + 1,
            symbol: symbol.to_string(),
            side,
            size,
            bar_timestamp: None,
        };
        self.orders.push(ack.clone());
        Ok(ack)
    }
}

impl OrderExecutor for PaperExecutor {
    fn market_buy(&mut self, symbol: &str, size: f64) -> Result<OrderAck, ExecutionError> {
        self.submit(symbol, OrderSide::Buy, size)
    }

    fn market_sell(&mut self, symbol: &str, size: f64) -> Result<OrderAck, ExecutionError> {
        self.submit(symbol, OrderSide::Sell, size)
    }
}

/// Place an order for the signal on the most recent closed bar.
///
/// Returns `Ok(None)` when that bar carries no signal.
pub fn act_on_latest_signal<E: OrderExecutor + ?Sized>(
    bars: &[Bar],
    signals: &[Signal],
    executor: &mut E,
    symbol: &str,
    size: f64,
) -> Result<Option<OrderAck>, ExecutionError> {
    let Some((index, signal)) = latest_actionable(bars, signals) else {
        return Ok(None);
    };

    let placed = match signal {
        Signal::Buy => executor.market_buy(symbol, size),
        Signal::Sell => executor.market_sell(symbol, size),
        Signal::None => return Ok(None),
    };

    match placed {
        Ok(mut ack) => {
            ack.bar_timestamp = Some(bars[index].timestamp);
            info!(symbol, side = %ack.side, size, order_id = ack.order_id, "order placed");
            Ok(Some(ack))
        }
        Err(e) => {
            warn!(symbol, ?signal, error = %e, "order failed");
            Err(e)
        }
    }
}
