//! Price trigger entity: a one-shot event handle that fires when the
//! last-trade price crosses its level.

use super::arena::ArenaHandle;
use super::book::Book;
use super::error::RejectReason;
use super::queue::QueueHandle;
use super::types::{BookId, EntityId, Side};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a [`Trigger`].
pub type TriggerRef = Rc<Trigger>;

/// Lifecycle notifications for a trigger.
///
/// As with order events, callbacks run inline and may call
/// [`Book::insert`]; a trigger's `on_triggered` handler typically submits
/// an order, which the deferral queue serializes behind the execution walk
/// that fired the trigger.
#[allow(unused_variables)]
pub trait TriggerEvents {
    /// The trigger passed validation.
    fn on_accepted(&self, book: &mut Book, trigger: &TriggerRef) {}

    /// The trigger was added to its side's trigger book.
    fn on_queue(&self, book: &mut Book, trigger: &TriggerRef) {}

    /// The trigger failed validation and was not admitted.
    fn on_rejected(&self, book: &mut Book, trigger: &TriggerRef, reason: RejectReason) {}

    /// The last-trade price crossed the trigger's level. Fires at most once
    /// per insertion; the trigger has already been removed from the book.
    fn on_triggered(&self, book: &mut Book, trigger: &TriggerRef) {}

    /// The trigger was cancelled before it fired.
    fn on_canceled(&self, book: &mut Book, trigger: &TriggerRef) {}
}

/// A conditional event handle resting in the trigger book.
///
/// Bid-side triggers fire when the market price falls to or below their
/// price; ask-side triggers fire when it rises to or above. Nothing fires
/// before the first trade establishes a market price.
pub struct Trigger {
    id: EntityId,
    side: Side,
    price: Cell<u128>,
    queued: Cell<bool>,
    book: Cell<Option<BookId>>,
    level: Cell<Option<ArenaHandle>>,
    handle: Cell<Option<QueueHandle>>,
    events: Option<Rc<dyn TriggerEvents>>,
}

impl Trigger {
    /// Creates a trigger with no event handler.
    #[must_use]
    pub fn new(side: Side, price: u128) -> TriggerRef {
        Rc::new(Self {
            id: EntityId::new(),
            side,
            price: Cell::new(price),
            queued: Cell::new(false),
            book: Cell::new(None),
            level: Cell::new(None),
            handle: Cell::new(None),
            events: None,
        })
    }

    /// Creates a trigger that reports lifecycle events to `events`.
    #[must_use]
    pub fn with_events(side: Side, price: u128, events: Rc<dyn TriggerEvents>) -> TriggerRef {
        Rc::new(Self {
            id: EntityId::new(),
            side,
            price: Cell::new(price),
            queued: Cell::new(false),
            book: Cell::new(None),
            level: Cell::new(None),
            handle: Cell::new(None),
            events: Some(events),
        })
    }

    /// Unique identifier of this trigger.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Side of the trigger book this trigger belongs to.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Price level this trigger fires at.
    #[must_use]
    pub fn price(&self) -> u128 {
        self.price.get()
    }

    /// Moves the trigger to a new price level.
    ///
    /// Only allowed while the trigger is not resting: a queued trigger is
    /// keyed by its price, so repricing it in place would desynchronize the
    /// trigger book. Cancel and re-insert instead. Returns `false` when
    /// queued.
    pub fn set_price(&self, price: u128) -> bool {
        if self.queued.get() {
            return false;
        }
        self.price.set(price);
        true
    }

    /// Whether the trigger is currently resting in a book.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.queued.get()
    }

    /// Identifier of the book this trigger belongs to, while it is resting.
    #[must_use]
    pub fn book_id(&self) -> Option<BookId> {
        self.book.get()
    }

    pub(super) fn events(&self) -> Option<&Rc<dyn TriggerEvents>> {
        self.events.as_ref()
    }

    pub(super) fn set_book(&self, book: Option<BookId>) {
        self.book.set(book);
    }

    pub(super) fn set_queued(&self, level: ArenaHandle, handle: QueueHandle) {
        self.queued.set(true);
        self.level.set(Some(level));
        self.handle.set(Some(handle));
    }

    pub(super) fn level_handle(&self) -> Option<ArenaHandle> {
        self.level.get()
    }

    pub(super) fn handle(&self) -> Option<QueueHandle> {
        self.handle.get()
    }

    pub(super) fn clear_book_state(&self) {
        self.queued.set(false);
        self.book.set(None);
        self.level.set(None);
        self.handle.set(None);
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("side", &self.side)
            .field("price", &self.price.get())
            .field("queued", &self.queued.get())
            .field("book", &self.book.get())
            .finish()
    }
}
