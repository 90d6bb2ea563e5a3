//! Trade record and the book-level trade listener hook.

use super::types::{EntityId, Side};
use serde::Serialize;
use std::rc::Rc;

/// One fill between an incoming (taker) order and a resting (maker) order.
///
/// The price is always the resting level's price: the resting side sets the
/// price, the aggressive side takes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    /// Price the fill executed at, in ticks.
    pub price: u128,
    /// Quantity exchanged.
    pub quantity: u64,
    /// The resting order.
    pub maker_id: EntityId,
    /// The incoming order.
    pub taker_id: EntityId,
    /// Side of the incoming order.
    pub taker_side: Side,
}

/// Observes every fill the book produces, in execution order.
///
/// The listener is a plain reader: it receives the trade record only, so it
/// cannot re-enter the book. Use the per-order `on_traded` callbacks for
/// logic that needs to react by submitting further orders.
pub type TradeListener = Rc<dyn Fn(&Trade)>;
