//! Submission pipeline: validation, acceptance, deferral, cancellation and
//! quantity amendment.

use super::book::{Book, Submission};
use super::error::RejectReason;
use super::level::TriggerLevel;
use super::order::OrderRef;
use super::trigger::TriggerRef;
use super::types::Side;
use tracing::{debug, trace};

impl Book {
    /// Submits an order or trigger to the book.
    ///
    /// This is the sole entry point. The submission is validated, accepted,
    /// matched against the opposing side while it crosses, and rested if a
    /// residual remains; lifecycle callbacks fire synchronously along the
    /// way. A rejected submission reports `on_rejected` and nothing else.
    ///
    /// When called from inside a lifecycle callback (the deferral depth is
    /// non-zero), the submission is parked on a FIFO and processed after
    /// the outer insertion has completed its trade walk and trigger
    /// cascade, preserving submission order.
    pub fn insert(&mut self, submission: impl Into<Submission>) {
        let submission = submission.into();
        if self.deferral_depth > 0 {
            trace!(symbol = %self.symbol, "deferring submission made during dispatch");
            self.deferred.push_back(submission);
            return;
        }

        self.process(submission);

        // The outer insertion is done; drain whatever its callbacks parked.
        // Processing a deferred entry may defer further entries, which this
        // same loop picks up in order.
        while let Some(next) = self.deferred.pop_front() {
            self.process(next);
        }
    }

    pub(super) fn process(&mut self, submission: Submission) {
        match submission {
            Submission::Order(order) => self.process_order(order),
            Submission::Trigger(trigger) => self.process_trigger(trigger),
        }
    }

    fn process_order(&mut self, order: OrderRef) {
        if order.quantity() == 0 {
            debug!(symbol = %self.symbol, order = %order.id(), "rejected: zero quantity");
            if let Some(events) = order.events() {
                events.on_rejected(self, &order, RejectReason::ZeroQuantity);
            }
            return;
        }
        if order.is_queued() {
            debug!(symbol = %self.symbol, order = %order.id(), "rejected: already queued");
            if let Some(events) = order.events() {
                events.on_rejected(self, &order, RejectReason::AlreadyQueued);
            }
            return;
        }

        order.set_book(Some(self.id));
        trace!(
            symbol = %self.symbol,
            order = %order.id(),
            side = %order.side(),
            price = order.price(),
            quantity = order.quantity(),
            "order accepted"
        );
        if let Some(events) = order.events() {
            events.on_accepted(self, &order);
        }

        self.deferral_depth += 1;
        if order.is_all_or_nothing() {
            self.insert_all_or_nothing_order(&order);
        } else {
            self.insert_limit_order(&order);
        }
        self.deferral_depth -= 1;
    }

    fn process_trigger(&mut self, trigger: TriggerRef) {
        if trigger.is_queued() {
            debug!(symbol = %self.symbol, trigger = %trigger.id(), "rejected: already queued");
            if let Some(events) = trigger.events() {
                events.on_rejected(self, &trigger, RejectReason::AlreadyQueued);
            }
            return;
        }

        trigger.set_book(Some(self.id));
        if let Some(events) = trigger.events() {
            events.on_accepted(self, &trigger);
        }

        self.deferral_depth += 1;
        self.queue_trigger(&trigger);
        self.deferral_depth -= 1;
    }

    fn queue_trigger(&mut self, trigger: &TriggerRef) {
        let price = trigger.price();
        let (index, arena) = match trigger.side() {
            Side::Bid => (&mut self.bid_triggers, &mut self.trigger_levels),
            Side::Ask => (&mut self.ask_triggers, &mut self.trigger_levels),
        };
        let level_handle = *index
            .entry(price)
            .or_insert_with(|| arena.insert(TriggerLevel::default()));
        let Some(level) = arena.get_mut(level_handle) else {
            debug_assert!(false, "trigger index points at a missing level");
            return;
        };
        let handle = level.insert(trigger);
        trigger.set_queued(level_handle, handle);
        trace!(
            symbol = %self.symbol,
            trigger = %trigger.id(),
            side = %trigger.side(),
            price,
            "trigger queued"
        );
        if let Some(events) = trigger.events() {
            events.on_queue(self, trigger);
        }
    }

    /// Cancels a resting order in O(1) through its stored location handle.
    ///
    /// Returns `false` when the order is not resting in this book. On
    /// success the order's residual is deducted from its level, the level
    /// is removed if emptied, the order is detached, and `on_canceled`
    /// fires. A cancelled order may be submitted again.
    pub fn cancel_order(&mut self, order: &OrderRef) -> bool {
        if !order.is_queued() || order.book_id() != Some(self.id) {
            return false;
        }
        let (Some(level_handle), Some(handle)) = (order.level_handle(), order.handle()) else {
            return false;
        };
        let Some(level) = self.levels.get_mut(level_handle) else {
            debug_assert!(false, "queued order points at a missing level");
            return false;
        };
        let erased = level.erase(handle).is_some();
        debug_assert!(erased, "queued order's handle went stale");
        if level.is_empty() {
            self.remove_level(order.side(), order.price(), level_handle);
        }

        trace!(symbol = %self.symbol, order = %order.id(), "order cancelled");
        if let Some(events) = order.events() {
            events.on_canceled(self, order);
        }
        true
    }

    /// Cancels a resting trigger. Returns `false` when the trigger is not
    /// resting in this book.
    pub fn cancel_trigger(&mut self, trigger: &TriggerRef) -> bool {
        if !trigger.is_queued() || trigger.book_id() != Some(self.id) {
            return false;
        }
        let (Some(level_handle), Some(handle)) = (trigger.level_handle(), trigger.handle())
        else {
            return false;
        };
        let Some(level) = self.trigger_levels.get_mut(level_handle) else {
            debug_assert!(false, "queued trigger points at a missing level");
            return false;
        };
        let erased = level.erase(handle).is_some();
        debug_assert!(erased, "queued trigger's handle went stale");
        if level.is_empty() {
            self.trigger_levels.remove(level_handle);
            let index = match trigger.side() {
                Side::Bid => &mut self.bid_triggers,
                Side::Ask => &mut self.ask_triggers,
            };
            index.remove(&trigger.price());
        }

        trace!(symbol = %self.symbol, trigger = %trigger.id(), "trigger cancelled");
        if let Some(events) = trigger.events() {
            events.on_canceled(self, trigger);
        }
        true
    }

    /// Amends the quantity of a resting non-AON order in place.
    ///
    /// The level aggregate is adjusted in O(1) and the order keeps its queue
    /// position. Amending to zero cancels the order. Growing the quantity
    /// adds resting liquidity, so the opposing side's all-or-nothing orders
    /// are re-checked at this price, exactly as if the extra quantity had
    /// just rested.
    ///
    /// Returns `false` when the order is not resting in this book, or when
    /// it is all-or-nothing: an AON amendment changes its own feasibility,
    /// so it goes through cancel and re-submission instead.
    pub fn update_quantity(&mut self, order: &OrderRef, quantity: u64) -> bool {
        if !order.is_queued() || order.book_id() != Some(self.id) {
            return false;
        }
        if order.is_all_or_nothing() {
            return false;
        }
        if quantity == 0 {
            return self.cancel_order(order);
        }
        let previous = order.quantity();
        if quantity == previous {
            return true;
        }

        let price = order.price();
        let side = order.side();
        let Some(level_handle) = order.level_handle() else {
            return false;
        };
        let Some(level) = self.levels.get_mut(level_handle) else {
            debug_assert!(false, "queued order points at a missing level");
            return false;
        };
        level.replace_regular_quantity(previous, quantity);
        order.replace_quantity(quantity);
        trace!(
            symbol = %self.symbol,
            order = %order.id(),
            from = previous,
            to = quantity,
            "order quantity amended"
        );

        if quantity > previous {
            self.deferral_depth += 1;
            self.recheck_all_or_nothing(side.opposite(), price);
            self.deferral_depth -= 1;
            if self.deferral_depth == 0 {
                while let Some(next) = self.deferred.pop_front() {
                    self.process(next);
                }
            }
        }
        true
    }
}
