//! Depth snapshots of the book for telemetry and inspection.
//!
//! A snapshot captures aggregates only. It cannot restore a book: resting
//! entities carry caller-supplied callback objects that have no data
//! representation.

use super::book::Book;
use serde::{Deserialize, Serialize};

/// Aggregates of one resting price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Level price in ticks.
    pub price: u128,
    /// Aggregate residual of the divisible (non-AON) residents.
    pub quantity: u64,
    /// Aggregate residual of the all-or-nothing residents.
    pub all_or_nothing_quantity: u64,
    /// Number of resting orders.
    pub order_count: usize,
}

impl LevelSnapshot {
    /// Combined resting quantity at this level.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.quantity + self.all_or_nothing_quantity
    }
}

/// Point-in-time depth view of a [`Book`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// The instrument symbol.
    pub symbol: String,
    /// Price of the most recent trade, if any.
    pub market_price: Option<u128>,
    /// Bid levels, best (highest) first.
    pub bids: Vec<LevelSnapshot>,
    /// Ask levels, best (lowest) first.
    pub asks: Vec<LevelSnapshot>,
}

impl BookSnapshot {
    /// Serializes the snapshot as JSON.
    ///
    /// # Errors
    /// Returns the underlying serializer error, which for this type should
    /// not occur in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a snapshot from its JSON form.
    ///
    /// # Errors
    /// Returns the underlying deserializer error when `input` is not a
    /// valid snapshot document.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

impl Book {
    /// Captures the current depth of both sides, best price first.
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        let capture = |(&price, &handle): (&u128, &super::arena::ArenaHandle)| {
            self.levels.get(handle).map(|level| LevelSnapshot {
                price,
                quantity: level.quantity(),
                all_or_nothing_quantity: level.all_or_nothing_quantity(),
                order_count: level.order_count(),
            })
        };
        BookSnapshot {
            symbol: self.symbol.clone(),
            market_price: self.market_price,
            bids: self.bids.iter().rev().filter_map(capture).collect(),
            asks: self.asks.iter().filter_map(capture).collect(),
        }
    }
}
