//! Matching logic: the crossing walk over opposing price levels, the
//! all-or-nothing feasibility pre-check and re-check cascade, and the
//! trigger firing pass.

use super::arena::ArenaHandle;
use super::book::Book;
use super::level::{LevelCursor, PriceLevel};
use super::order::OrderRef;
use super::trade::Trade;
use super::types::Side;
use std::ops::Bound;
use tracing::{debug, trace};

impl Book {
    /// Inserts an order with ordinary (divisible) semantics: match while it
    /// crosses, then rest or discard the residual.
    pub(super) fn insert_limit_order(&mut self, order: &OrderRef) {
        self.execute(order);

        if order.is_immediate_or_cancel() {
            if order.quantity() > 0 {
                trace!(
                    symbol = %self.symbol,
                    order = %order.id(),
                    residual = order.quantity(),
                    "immediate-or-cancel residual discarded"
                );
                if let Some(events) = order.events() {
                    events.on_canceled(self, order);
                }
            }
            order.set_book(None);
            return;
        }

        if order.quantity() > 0 {
            self.queue_order(order);
        } else {
            order.set_book(None);
        }
    }

    /// Inserts an all-or-nothing order: execute only when the feasibility
    /// pre-check proves the opposing side can fill it completely; otherwise
    /// rest it (or discard it, for immediate-or-cancel).
    pub(super) fn insert_all_or_nothing_order(&mut self, order: &OrderRef) {
        if self.is_fillable(order) {
            self.execute(order);
            debug_assert_eq!(order.quantity(), 0, "fillable all-or-nothing must complete");
            order.set_book(None);
            return;
        }

        if order.is_immediate_or_cancel() {
            trace!(
                symbol = %self.symbol,
                order = %order.id(),
                "unfillable all-or-nothing immediate-or-cancel discarded"
            );
            if let Some(events) = order.events() {
                events.on_canceled(self, order);
            }
            order.set_book(None);
            return;
        }

        self.queue_order(order);
    }

    /// Walks the opposing side from its best price while the incoming order
    /// crosses, consuming liquidity level by level, then runs the trigger
    /// pass against the resulting market price.
    ///
    /// Levels left holding only oversized all-or-nothing residents are
    /// stepped past rather than looped on.
    fn execute(&mut self, order: &OrderRef) {
        let incoming_side = order.side();
        let level_side = incoming_side.opposite();
        let limit = order.price();
        let mut walked_past: Option<u128> = None;

        loop {
            if order.quantity() == 0 {
                break;
            }
            let Some((price, level_handle)) = self.next_level(level_side, walked_past) else {
                break;
            };
            let crosses = match incoming_side {
                Side::Bid => price <= limit,
                Side::Ask => price >= limit,
            };
            if !crosses {
                break;
            }
            self.trade_at_level(level_side, price, level_handle, order);
            walked_past = Some(price);
        }

        match incoming_side {
            Side::Bid => self.fire_ask_triggers(),
            Side::Ask => self.fire_bid_triggers(),
        }
    }

    /// Best remaining level on `level_side` past `walked_past`: ascending
    /// for asks, descending for bids.
    fn next_level(
        &self,
        level_side: Side,
        walked_past: Option<u128>,
    ) -> Option<(u128, ArenaHandle)> {
        match (level_side, walked_past) {
            (Side::Ask, None) => self
                .asks
                .first_key_value()
                .map(|(&price, &handle)| (price, handle)),
            (Side::Ask, Some(past)) => self
                .asks
                .range((Bound::Excluded(past), Bound::Unbounded))
                .next()
                .map(|(&price, &handle)| (price, handle)),
            (Side::Bid, None) => self
                .bids
                .last_key_value()
                .map(|(&price, &handle)| (price, handle)),
            (Side::Bid, Some(past)) => self
                .bids
                .range(..past)
                .next_back()
                .map(|(&price, &handle)| (price, handle)),
        }
    }

    /// Trades the incoming order against one level, one fill at a time so
    /// each fill's callbacks run without any borrow of the level
    /// outstanding. Once the level has consumed everything it can, the
    /// market price moves to the level's price if anything traded, and the
    /// level is removed if emptied.
    fn trade_at_level(
        &mut self,
        level_side: Side,
        price: u128,
        level_handle: ArenaHandle,
        incoming: &OrderRef,
    ) {
        let mut cursor = LevelCursor::Start;
        let mut traded = false;
        loop {
            if incoming.quantity() == 0 {
                break;
            }
            let fill = {
                let Some(level) = self.levels.get_mut(level_handle) else {
                    break;
                };
                level.trade_step(incoming, &mut cursor)
            };
            let Some(fill) = fill else {
                break;
            };

            traded = true;
            trace!(
                symbol = %self.symbol,
                price,
                quantity = fill.quantity,
                maker = %fill.resident.id(),
                taker = %incoming.id(),
                "trade"
            );
            if let Some(listener) = &self.trade_listener {
                listener(&Trade {
                    price,
                    quantity: fill.quantity,
                    maker_id: fill.resident.id(),
                    taker_id: incoming.id(),
                    taker_side: incoming.side(),
                });
            }
            if let Some(events) = fill.resident.events() {
                events.on_traded(self, &fill.resident, incoming);
            }
            if let Some(events) = incoming.events() {
                events.on_traded(self, incoming, &fill.resident);
            }
        }

        if traded {
            self.market_price = Some(price);
        }
        if self
            .levels
            .get(level_handle)
            .is_some_and(|level| level.is_empty())
        {
            self.remove_level(level_side, price, level_handle);
        }
    }

    /// Rests the order's residual at its price, re-checks the opposing
    /// side's all-or-nothing orders against the grown liquidity, and
    /// reports `on_queue`.
    fn queue_order(&mut self, order: &OrderRef) {
        let price = order.price();
        let side = order.side();
        let (index, arena) = match side {
            Side::Bid => (&mut self.bids, &mut self.levels),
            Side::Ask => (&mut self.asks, &mut self.levels),
        };
        let level_handle = *index
            .entry(price)
            .or_insert_with(|| arena.insert(PriceLevel::default()));
        let Some(level) = arena.get_mut(level_handle) else {
            debug_assert!(false, "price index points at a missing level");
            return;
        };
        let handle = level.insert(order);
        order.set_queued(level_handle, handle);
        trace!(
            symbol = %self.symbol,
            order = %order.id(),
            side = %side,
            price,
            quantity = order.quantity(),
            "order queued"
        );

        self.recheck_all_or_nothing(side.opposite(), price);

        if let Some(events) = order.events() {
            events.on_queue(self, order);
        }
    }

    /// Feasibility pre-check: could `order` be filled completely against
    /// the opposing side right now, respecting all-or-nothing
    /// indivisibility, without mutating anything?
    ///
    /// Whole-level sums and the regular aggregate answer most levels in
    /// O(1); only when the answer lands between the two bounds is the
    /// level's resident-by-resident simulation consulted.
    pub(super) fn is_fillable(&self, order: &OrderRef) -> bool {
        let level_side = order.side().opposite();
        let limit = order.price();
        let mut remaining = order.quantity();
        let mut walked_past: Option<u128> = None;

        while remaining > 0 {
            let Some((price, level_handle)) = self.next_level(level_side, walked_past) else {
                break;
            };
            let crosses = match order.side() {
                Side::Bid => price <= limit,
                Side::Ask => price >= limit,
            };
            if !crosses {
                break;
            }
            let Some(level) = self.levels.get(level_handle) else {
                break;
            };
            let total = level.quantity() + level.all_or_nothing_quantity();
            if remaining >= total {
                remaining -= total;
            } else if remaining <= level.quantity() {
                return true;
            } else {
                remaining = level.simulate_trade(remaining);
            }
            walked_past = Some(price);
        }

        remaining == 0
    }

    /// Re-checks resting all-or-nothing orders on `level_side` after
    /// liquidity grew at `price` on the other side.
    ///
    /// Scans from the level at `price` outward (away from the best end of
    /// `level_side`); each AON resident found is run through the
    /// feasibility check and executed out of the queue when it passes.
    /// The pass is bounded by the AON population in the scanned range and
    /// does not recurse: callbacks fired by the nested executions run
    /// under deferral.
    pub(super) fn recheck_all_or_nothing(&mut self, level_side: Side, price: u128) {
        let mut walked_past: Option<u128> = None;
        loop {
            let next = match (level_side, walked_past) {
                (Side::Ask, None) => self
                    .asks
                    .range(price..)
                    .next()
                    .map(|(&level_price, &handle)| (level_price, handle)),
                (Side::Ask, Some(past)) => self
                    .asks
                    .range((Bound::Excluded(past), Bound::Unbounded))
                    .next()
                    .map(|(&level_price, &handle)| (level_price, handle)),
                (Side::Bid, None) => self
                    .bids
                    .range(..=price)
                    .next_back()
                    .map(|(&level_price, &handle)| (level_price, handle)),
                (Side::Bid, Some(past)) => self
                    .bids
                    .range(..past)
                    .next_back()
                    .map(|(&level_price, &handle)| (level_price, handle)),
            };
            let Some((level_price, level_handle)) = next else {
                break;
            };

            let candidates = self
                .levels
                .get(level_handle)
                .map(|level| level.all_or_nothing_orders())
                .unwrap_or_default();
            for order in candidates {
                if !order.is_queued() {
                    continue;
                }
                if self.is_fillable(&order) {
                    self.execute_queued(&order);
                }
            }

            if self
                .levels
                .get(level_handle)
                .is_some_and(|level| level.is_empty())
            {
                self.remove_level(level_side, level_price, level_handle);
            }
            walked_past = Some(level_price);
        }
    }

    /// Executes a resting all-or-nothing order out of its queue once the
    /// feasibility check has passed.
    ///
    /// The execution walk is the ordinary one and only touches the other
    /// side, so this level's AON aggregate is deducted explicitly by the
    /// captured pre-walk quantity; the erase that follows removes a
    /// zero-residual order and adjusts nothing further.
    fn execute_queued(&mut self, order: &OrderRef) {
        let quantity = order.quantity();
        trace!(
            symbol = %self.symbol,
            order = %order.id(),
            side = %order.side(),
            price = order.price(),
            quantity,
            "resting all-or-nothing became fillable"
        );

        self.execute(order);
        debug_assert_eq!(order.quantity(), 0, "queued all-or-nothing must complete");

        let (Some(level_handle), Some(handle)) = (order.level_handle(), order.handle()) else {
            debug_assert!(false, "queued order lost its location handles");
            return;
        };
        let Some(level) = self.levels.get_mut(level_handle) else {
            debug_assert!(false, "queued order points at a missing level");
            return;
        };
        level.unbook_all_or_nothing(quantity);
        level.erase(handle);
    }

    /// Fires ask-side triggers whose price the market price has risen to or
    /// above, lowest level first. Nothing fires before the first trade.
    fn fire_ask_triggers(&mut self) {
        let Some(market_price) = self.market_price else {
            return;
        };
        loop {
            let Some((&price, &level_handle)) = self.ask_triggers.first_key_value() else {
                break;
            };
            if price > market_price {
                break;
            }
            self.ask_triggers.remove(&price);
            let Some(mut level) = self.trigger_levels.remove(level_handle) else {
                break;
            };
            while let Some(trigger) = level.pop_front() {
                debug!(symbol = %self.symbol, trigger = %trigger.id(), price, "trigger fired");
                if let Some(events) = trigger.events() {
                    events.on_triggered(self, &trigger);
                }
            }
        }
    }

    /// Fires bid-side triggers whose price the market price has fallen to
    /// or below, highest level first. Nothing fires before the first trade.
    fn fire_bid_triggers(&mut self) {
        let Some(market_price) = self.market_price else {
            return;
        };
        loop {
            let Some((&price, &level_handle)) = self.bid_triggers.last_key_value() else {
                break;
            };
            if price < market_price {
                break;
            }
            self.bid_triggers.remove(&price);
            let Some(mut level) = self.trigger_levels.remove(level_handle) else {
                break;
            };
            while let Some(trigger) = level.pop_front() {
                debug!(symbol = %self.symbol, trigger = %trigger.id(), price, "trigger fired");
                if let Some(events) = trigger.events() {
                    events.on_triggered(self, &trigger);
                }
            }
        }
    }
}
