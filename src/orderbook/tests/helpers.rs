//! Shared fixtures: recording event handlers, trade capture, and the
//! invariant checker used after every mutation in the white-box tests.

use crate::orderbook::book::Book;
use crate::orderbook::error::RejectReason;
use crate::orderbook::order::{OrderEvents, OrderRef};
use crate::orderbook::trade::Trade;
use crate::orderbook::trigger::{TriggerEvents, TriggerRef};
use crate::orderbook::types::{EntityId, Side};
use std::cell::RefCell;
use std::rc::Rc;

/// One observed lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Accepted(EntityId),
    Queued(EntityId),
    Rejected(EntityId, RejectReason),
    Traded { order: EntityId, counterparty: EntityId },
    Canceled(EntityId),
    Triggered(EntityId),
}

/// Records every callback it receives, for orders and triggers alike.
#[derive(Default)]
pub struct Recorder {
    events: RefCell<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<Event> {
        self.events.borrow_mut().drain(..).collect()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl OrderEvents for Recorder {
    fn on_accepted(&self, _book: &mut Book, order: &OrderRef) {
        self.push(Event::Accepted(order.id()));
    }

    fn on_queue(&self, _book: &mut Book, order: &OrderRef) {
        self.push(Event::Queued(order.id()));
    }

    fn on_rejected(&self, _book: &mut Book, order: &OrderRef, reason: RejectReason) {
        self.push(Event::Rejected(order.id(), reason));
    }

    fn on_traded(&self, _book: &mut Book, order: &OrderRef, counterparty: &OrderRef) {
        self.push(Event::Traded {
            order: order.id(),
            counterparty: counterparty.id(),
        });
    }

    fn on_canceled(&self, _book: &mut Book, order: &OrderRef) {
        self.push(Event::Canceled(order.id()));
    }
}

impl TriggerEvents for Recorder {
    fn on_accepted(&self, _book: &mut Book, trigger: &TriggerRef) {
        self.push(Event::Accepted(trigger.id()));
    }

    fn on_queue(&self, _book: &mut Book, trigger: &TriggerRef) {
        self.push(Event::Queued(trigger.id()));
    }

    fn on_rejected(&self, _book: &mut Book, trigger: &TriggerRef, reason: RejectReason) {
        self.push(Event::Rejected(trigger.id(), reason));
    }

    fn on_triggered(&self, _book: &mut Book, trigger: &TriggerRef) {
        self.push(Event::Triggered(trigger.id()));
    }

    fn on_canceled(&self, _book: &mut Book, trigger: &TriggerRef) {
        self.push(Event::Canceled(trigger.id()));
    }
}

/// Trigger handler that submits a canned entity when it fires.
pub struct SubmitOnTriggered {
    submission: RefCell<Option<crate::orderbook::book::Submission>>,
}

impl SubmitOnTriggered {
    pub fn new(submission: impl Into<crate::orderbook::book::Submission>) -> Rc<Self> {
        Rc::new(Self {
            submission: RefCell::new(Some(submission.into())),
        })
    }
}

impl TriggerEvents for SubmitOnTriggered {
    fn on_triggered(&self, book: &mut Book, _trigger: &TriggerRef) {
        if let Some(submission) = self.submission.borrow_mut().take() {
            book.insert(submission);
        }
    }
}

/// Order handler that submits a canned entity on its first fill.
pub struct SubmitOnTraded {
    submission: RefCell<Option<crate::orderbook::book::Submission>>,
}

impl SubmitOnTraded {
    pub fn new(submission: impl Into<crate::orderbook::book::Submission>) -> Rc<Self> {
        Rc::new(Self {
            submission: RefCell::new(Some(submission.into())),
        })
    }
}

impl OrderEvents for SubmitOnTraded {
    fn on_traded(&self, book: &mut Book, _order: &OrderRef, _counterparty: &OrderRef) {
        if let Some(submission) = self.submission.borrow_mut().take() {
            book.insert(submission);
        }
    }
}

/// Installs a trade listener that appends every fill to the returned log.
pub fn capture_trades(book: &mut Book) -> Rc<RefCell<Vec<Trade>>> {
    let log: Rc<RefCell<Vec<Trade>>> = Rc::default();
    let sink = log.clone();
    book.set_trade_listener(Rc::new(move |trade: &Trade| {
        sink.borrow_mut().push(trade.clone());
    }));
    log
}

/// Asserts the quantified invariants that must hold after every `insert`
/// and `cancel`:
///
/// 1. per level, the aggregates equal the sums over the residents, and the
///    AON index covers exactly the AON residents;
/// 2. every resident is queued, back-references this book, and both of its
///    location handles (level and FIFO slot) dereference to it;
/// 3. no empty level remains, and the level arenas hold exactly the levels
///    the price indexes reach;
/// 4. the deferral queue has drained.
pub fn assert_book_invariants(book: &Book) {
    for side in [Side::Bid, Side::Ask] {
        for (&price, &level_handle) in book.side_index(side) {
            let level = book
                .levels
                .get(level_handle)
                .expect("price index points at a missing level");
            assert!(!level.is_empty(), "{side} level {price} is empty but kept");

            let mut regular = 0u64;
            let mut all_or_nothing = 0u64;
            let mut aon_residents = 0usize;
            for order in level.orders() {
                assert!(order.is_queued(), "resident {} not queued", order.id());
                assert_eq!(order.book_id(), Some(book.id()), "resident book mismatch");
                assert_eq!(order.price(), price, "resident price differs from level");
                assert_eq!(order.side(), side, "resident side differs from level");
                assert!(order.quantity() > 0, "zero-quantity resident kept");
                assert_eq!(
                    order.level_handle(),
                    Some(level_handle),
                    "resident level handle drifted"
                );
                let handle = order.handle().expect("queued resident has no handle");
                let via_handle = level
                    .order_at(handle)
                    .expect("resident handle does not dereference");
                assert!(
                    OrderRef::ptr_eq(via_handle, order),
                    "resident handle dereferences to another order"
                );
                if order.is_all_or_nothing() {
                    all_or_nothing += order.quantity();
                    aon_residents += 1;
                } else {
                    regular += order.quantity();
                }
            }
            assert_eq!(level.quantity(), regular, "regular aggregate drifted");
            assert_eq!(
                level.all_or_nothing_quantity(),
                all_or_nothing,
                "all-or-nothing aggregate drifted"
            );
            assert_eq!(
                level.all_or_nothing_order_count(),
                aon_residents,
                "all-or-nothing index drifted"
            );
        }
    }

    assert_eq!(
        book.levels.len(),
        book.bids.len() + book.asks.len(),
        "level arena leaked or lost a level"
    );
    assert_eq!(
        book.trigger_levels.len(),
        book.bid_triggers.len() + book.ask_triggers.len(),
        "trigger arena leaked or lost a level"
    );
    for (&price, &handle) in book.bid_triggers.iter().chain(book.ask_triggers.iter()) {
        let level = book
            .trigger_levels
            .get(handle)
            .expect("trigger index points at a missing level");
        assert!(!level.is_empty(), "trigger level {price} is empty but kept");
    }

    assert_eq!(book.deferral_depth, 0, "deferral depth not unwound");
    assert!(book.deferred.is_empty(), "deferred queue not drained");
}
