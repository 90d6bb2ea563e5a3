//! Prelude module that re-exports the types needed for everyday use.
//!
//! ```rust
//! use matchbook::prelude::*;
//! ```

// Core book types
pub use crate::orderbook::{Book, Submission};

// Entities and their lifecycle callback traits
pub use crate::orderbook::{Order, OrderEvents, OrderFlags, OrderRef};
pub use crate::orderbook::{Trigger, TriggerEvents, TriggerRef};

// Trade reporting
pub use crate::orderbook::{Trade, TradeListener};

// Snapshots
pub use crate::orderbook::{BookSnapshot, LevelSnapshot};

// Primitives and errors
pub use crate::orderbook::{BookId, EntityId, RejectReason, Side};
