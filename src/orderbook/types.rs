//! Shared primitive types: order book side and entity/book identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// The side of the book an order or trigger belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy side. Resting bids are keyed descending; the best bid is the highest price.
    Bid,
    /// Sell side. Resting asks are keyed ascending; the best ask is the lowest price.
    Ask,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Unique identifier for an order or trigger, used in logs and trade records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generates a fresh random identifier.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a [`Book`](crate::orderbook::Book) instance within the process.
///
/// Resting entities carry the id of the book they rest in; it stands in for
/// the back pointer a pointer-based implementation would hold, and lets
/// cancellation verify that an entity actually belongs to the book it is
/// being cancelled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookId(u64);

static NEXT_BOOK_ID: AtomicU64 = AtomicU64::new(1);

impl BookId {
    pub(super) fn next() -> Self {
        Self(NEXT_BOOK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "book-{}", self.0)
    }
}
