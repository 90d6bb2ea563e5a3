//! Core book state: the two priced sides, the trigger books, the market
//! price, and the re-entrancy deferral machinery.

use super::arena::{Arena, ArenaHandle};
use super::level::{PriceLevel, TriggerLevel};
use super::order::OrderRef;
use super::snapshot::LevelSnapshot;
use super::trade::TradeListener;
use super::trigger::TriggerRef;
use super::types::{BookId, Side};
use std::collections::{BTreeMap, VecDeque};

/// Anything that can be handed to [`Book::insert`]: an order or a trigger.
#[derive(Debug, Clone)]
pub enum Submission {
    /// A limit order.
    Order(OrderRef),
    /// A price trigger.
    Trigger(TriggerRef),
}

impl From<OrderRef> for Submission {
    fn from(order: OrderRef) -> Self {
        Submission::Order(order)
    }
}

impl From<&OrderRef> for Submission {
    fn from(order: &OrderRef) -> Self {
        Submission::Order(order.clone())
    }
}

impl From<TriggerRef> for Submission {
    fn from(trigger: TriggerRef) -> Self {
        Submission::Trigger(trigger)
    }
}

impl From<&TriggerRef> for Submission {
    fn from(trigger: &TriggerRef) -> Self {
        Submission::Trigger(trigger.clone())
    }
}

/// A price–time-priority matching engine for a single instrument.
///
/// Bids and asks rest in price-keyed maps (bids matched from the highest
/// price down, asks from the lowest up) with FIFO time priority inside each
/// level. Triggers rest in side-specific maps of their own and fire when
/// the last-trade price crosses their level.
///
/// The book is single-threaded and synchronous: every lifecycle callback
/// runs inline on the submitter's stack. Callbacks may call
/// [`Book::insert`] recursively; such submissions are parked on a deferral
/// queue and processed in order once the outer insertion has finished its
/// trade walk and trigger cascade.
pub struct Book {
    pub(super) id: BookId,
    pub(super) symbol: String,

    /// Backing store for the price levels of both sides. The price-ordered
    /// maps hold handles into this arena, and resting orders cache their
    /// level's handle, so cancellation reaches its level in O(1).
    pub(super) levels: Arena<PriceLevel>,
    /// Bid side, matched from the highest price downwards.
    pub(super) bids: BTreeMap<u128, ArenaHandle>,
    /// Ask side, matched from the lowest price upwards.
    pub(super) asks: BTreeMap<u128, ArenaHandle>,

    /// Backing store for the trigger levels of both sides.
    pub(super) trigger_levels: Arena<TriggerLevel>,
    /// Triggers that fire when the market price falls to or below them.
    pub(super) bid_triggers: BTreeMap<u128, ArenaHandle>,
    /// Triggers that fire when the market price rises to or above them.
    pub(super) ask_triggers: BTreeMap<u128, ArenaHandle>,

    /// Price of the most recent trade; `None` until the first fill.
    pub(super) market_price: Option<u128>,

    /// Non-zero while an insertion is dispatching. Submissions arriving
    /// from callbacks while the depth is non-zero are parked on `deferred`.
    pub(super) deferral_depth: usize,
    pub(super) deferred: VecDeque<Submission>,

    pub(super) trade_listener: Option<TradeListener>,
}

impl Book {
    /// Creates an empty book for `symbol`.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            id: BookId::next(),
            symbol: symbol.to_string(),
            levels: Arena::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            trigger_levels: Arena::new(),
            bid_triggers: BTreeMap::new(),
            ask_triggers: BTreeMap::new(),
            market_price: None,
            deferral_depth: 0,
            deferred: VecDeque::new(),
            trade_listener: None,
        }
    }

    /// Creates an empty book that reports every fill to `trade_listener`.
    #[must_use]
    pub fn with_trade_listener(symbol: &str, trade_listener: TradeListener) -> Self {
        let mut book = Self::new(symbol);
        book.trade_listener = Some(trade_listener);
        book
    }

    /// Installs or replaces the trade listener.
    pub fn set_trade_listener(&mut self, trade_listener: TradeListener) {
        self.trade_listener = Some(trade_listener);
    }

    /// Removes the trade listener.
    pub fn remove_trade_listener(&mut self) {
        self.trade_listener = None;
    }

    /// This book's process-unique identifier.
    #[must_use]
    pub fn id(&self) -> BookId {
        self.id
    }

    /// The instrument symbol this book was created for.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Highest resting bid price, or `None` when no bids rest.
    #[must_use]
    pub fn best_bid(&self) -> Option<u128> {
        self.bids.last_key_value().map(|(&price, _)| price)
    }

    /// Lowest resting ask price, or `None` when no asks rest.
    #[must_use]
    pub fn best_ask(&self) -> Option<u128> {
        self.asks.first_key_value().map(|(&price, _)| price)
    }

    /// Price of the most recent trade, or `None` before the first trade.
    #[must_use]
    pub fn market_price(&self) -> Option<u128> {
        self.market_price
    }

    /// Best-ask minus best-bid, when both sides rest.
    #[must_use]
    pub fn spread(&self) -> Option<u128> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => ask.checked_sub(bid),
            _ => None,
        }
    }

    /// Midpoint of the best bid and ask, when both sides rest.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }

    /// Aggregates for the level resting at `price` on `side`, if any.
    #[must_use]
    pub fn level(&self, side: Side, price: u128) -> Option<LevelSnapshot> {
        self.side_index(side)
            .get(&price)
            .and_then(|&handle| self.levels.get(handle))
            .map(|level| LevelSnapshot {
                price,
                quantity: level.quantity(),
                all_or_nothing_quantity: level.all_or_nothing_quantity(),
                order_count: level.order_count(),
            })
    }

    /// Number of price levels resting on `side`.
    #[must_use]
    pub fn level_count(&self, side: Side) -> usize {
        self.side_index(side).len()
    }

    /// Number of orders resting on `side`, across all levels.
    #[must_use]
    pub fn order_count(&self, side: Side) -> usize {
        self.side_index(side)
            .values()
            .filter_map(|&handle| self.levels.get(handle))
            .map(PriceLevel::order_count)
            .sum()
    }

    /// Number of triggers resting on `side`, across all levels.
    #[must_use]
    pub fn trigger_count(&self, side: Side) -> usize {
        let index = match side {
            Side::Bid => &self.bid_triggers,
            Side::Ask => &self.ask_triggers,
        };
        index
            .values()
            .filter_map(|&handle| self.trigger_levels.get(handle))
            .map(TriggerLevel::trigger_count)
            .sum()
    }

    /// `true` when nothing rests on either side and no triggers are armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
            && self.asks.is_empty()
            && self.bid_triggers.is_empty()
            && self.ask_triggers.is_empty()
    }

    /// Price-ordered index of `side`'s resting levels.
    pub(super) fn side_index(&self, side: Side) -> &BTreeMap<u128, ArenaHandle> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub(super) fn side_index_mut(&mut self, side: Side) -> &mut BTreeMap<u128, ArenaHandle> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Drops an emptied level: frees its arena slot and unlinks its price
    /// from the side's index.
    pub(super) fn remove_level(&mut self, side: Side, price: u128, handle: ArenaHandle) {
        self.levels.remove(handle);
        self.side_index_mut(side).remove(&price);
    }
}

impl Drop for Book {
    /// Detaches every resting entity before the maps are torn down.
    /// No callbacks fire on destruction.
    fn drop(&mut self) {
        for level in self.levels.values() {
            for order in level.orders() {
                order.clear_book_state();
            }
        }
        for level in self.trigger_levels.values_mut() {
            while level.pop_front().is_some() {}
        }
    }
}

impl std::fmt::Debug for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("id", &self.id)
            .field("symbol", &self.symbol)
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("market_price", &self.market_price)
            .field("deferral_depth", &self.deferral_depth)
            .finish()
    }
}
