//! Limit order entity and its lifecycle callback surface.

use super::arena::ArenaHandle;
use super::book::Book;
use super::error::RejectReason;
use super::queue::QueueHandle;
use super::types::{BookId, EntityId, Side};
use bitflags::bitflags;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

bitflags! {
    /// Execution-policy flags carried by an order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OrderFlags: u8 {
        /// Execute any crossable quantity immediately and discard the
        /// residual instead of resting it.
        const IMMEDIATE_OR_CANCEL = 0b01;
        /// Execute fully in one cross or not at all. May rest unfilled and
        /// is re-evaluated whenever opposing liquidity grows.
        const ALL_OR_NOTHING = 0b10;
    }
}

/// Shared handle to an [`Order`].
///
/// The submitter keeps one clone; the book holds another while the order
/// rests. Dropping the book never drops a submitter's orders.
pub type OrderRef = Rc<Order>;

/// Lifecycle notifications for an order.
///
/// Every method has an empty default body; implementors override the ones
/// they care about. Callbacks run synchronously on the submitter's stack
/// and receive the book, so they may call [`Book::insert`]; a submission
/// made from inside a callback is parked on the book's deferral queue and
/// processed once the outer insertion completes.
#[allow(unused_variables)]
pub trait OrderEvents {
    /// The order passed validation and is about to be matched.
    fn on_accepted(&self, book: &mut Book, order: &OrderRef) {}

    /// The order (or its residual) was added to the resting book.
    fn on_queue(&self, book: &mut Book, order: &OrderRef) {}

    /// The order failed validation and was not admitted.
    fn on_rejected(&self, book: &mut Book, order: &OrderRef, reason: RejectReason) {}

    /// A fill occurred between this order and `counterparty`.
    ///
    /// Both participants are notified, resting side first. Quantities have
    /// already been decremented when this fires; a fully-filled resting
    /// order has also been removed from the book.
    fn on_traded(&self, book: &mut Book, order: &OrderRef, counterparty: &OrderRef) {}

    /// The order was cancelled, either explicitly or as an
    /// immediate-or-cancel residual.
    fn on_canceled(&self, book: &mut Book, order: &OrderRef) {}
}

/// A limit order for a single instrument.
///
/// Identity (side, price, flags) is fixed at construction. The residual
/// quantity and the book-location state are interior-mutable and owned by
/// the matching engine while the order rests; external code must not bypass
/// the engine to change them on a queued order.
///
/// While queued, the order carries two location handles: the arena handle
/// of its price level and its slot in that level's FIFO. Both stay stable
/// across unrelated insertions and removals, so cancellation is O(1).
pub struct Order {
    id: EntityId,
    side: Side,
    price: u128,
    flags: OrderFlags,
    quantity: Cell<u64>,
    queued: Cell<bool>,
    book: Cell<Option<BookId>>,
    level: Cell<Option<ArenaHandle>>,
    handle: Cell<Option<QueueHandle>>,
    events: Option<Rc<dyn OrderEvents>>,
}

impl Order {
    /// Creates a plain limit order with no flags and no event handler.
    #[must_use]
    pub fn new(side: Side, price: u128, quantity: u64) -> OrderRef {
        Self::with_flags(side, price, quantity, OrderFlags::empty())
    }

    /// Creates a limit order with the given execution-policy flags.
    #[must_use]
    pub fn with_flags(side: Side, price: u128, quantity: u64, flags: OrderFlags) -> OrderRef {
        Rc::new(Self {
            id: EntityId::new(),
            side,
            price,
            flags,
            quantity: Cell::new(quantity),
            queued: Cell::new(false),
            book: Cell::new(None),
            level: Cell::new(None),
            handle: Cell::new(None),
            events: None,
        })
    }

    /// Creates a limit order that reports lifecycle events to `events`.
    #[must_use]
    pub fn with_events(
        side: Side,
        price: u128,
        quantity: u64,
        flags: OrderFlags,
        events: Rc<dyn OrderEvents>,
    ) -> OrderRef {
        Rc::new(Self {
            id: EntityId::new(),
            side,
            price,
            flags,
            quantity: Cell::new(quantity),
            queued: Cell::new(false),
            book: Cell::new(None),
            level: Cell::new(None),
            handle: Cell::new(None),
            events: Some(events),
        })
    }

    /// Unique identifier of this order.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Side of the book this order belongs to.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Limit price in ticks.
    #[must_use]
    pub fn price(&self) -> u128 {
        self.price
    }

    /// Residual (unfilled) quantity. Decreases monotonically while matching;
    /// an order whose residual reaches zero no longer exists in the book.
    #[must_use]
    pub fn quantity(&self) -> u64 {
        self.quantity.get()
    }

    /// Execution-policy flags.
    #[must_use]
    pub fn flags(&self) -> OrderFlags {
        self.flags
    }

    /// Whether the residual is discarded instead of rested.
    #[must_use]
    pub fn is_immediate_or_cancel(&self) -> bool {
        self.flags.contains(OrderFlags::IMMEDIATE_OR_CANCEL)
    }

    /// Whether the order only ever fills in its entirety.
    #[must_use]
    pub fn is_all_or_nothing(&self) -> bool {
        self.flags.contains(OrderFlags::ALL_OR_NOTHING)
    }

    /// Whether the order is currently resting in a book.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.queued.get()
    }

    /// Identifier of the book this order belongs to, while it is accepted
    /// or resting.
    #[must_use]
    pub fn book_id(&self) -> Option<BookId> {
        self.book.get()
    }

    /// Replaces the quantity of an order that is not resting.
    ///
    /// Returns `false` without touching anything when the order is queued;
    /// use [`Book::update_quantity`] to amend a resting order so the level
    /// aggregates stay consistent.
    pub fn set_quantity(&self, quantity: u64) -> bool {
        if self.queued.get() {
            return false;
        }
        self.quantity.set(quantity);
        true
    }

    pub(super) fn events(&self) -> Option<&Rc<dyn OrderEvents>> {
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

    /// Consumes `quantity` from the residual during a fill.
    pub(super) fn consume(&self, quantity: u64) {
        debug_assert!(quantity <= self.quantity.get(), "fill exceeds residual");
        self.quantity.set(self.quantity.get() - quantity);
    }

    pub(super) fn replace_quantity(&self, quantity: u64) {
        self.quantity.set(quantity);
    }

    /// Detaches the order from its book: clears `queued`, the back
    /// reference and both location handles.
    pub(super) fn clear_book_state(&self) {
        self.queued.set(false);
        self.book.set(None);
        self.level.set(None);
        self.handle.set(None);
    }
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Order")
            .field("id", &self.id)
            .field("side", &self.side)
            .field("price", &self.price)
            .field("quantity", &self.quantity.get())
            .field("flags", &self.flags)
            .field("queued", &self.queued.get())
            .field("book", &self.book.get())
            .finish()
    }
}
