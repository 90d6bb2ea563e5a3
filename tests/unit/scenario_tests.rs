//! End-to-end book scenarios driven through the public API.

use matchbook::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn capture_trades(book: &mut Book) -> Rc<RefCell<Vec<Trade>>> {
    let log: Rc<RefCell<Vec<Trade>>> = Rc::default();
    let sink = log.clone();
    book.set_trade_listener(Rc::new(move |trade: &Trade| {
        sink.borrow_mut().push(trade.clone());
    }));
    log
}

/// FIFO within a level: the older resident at the best price fills first.
#[test]
fn test_fifo_within_level() {
    let mut book = Book::new("TEST");

    let first = Order::new(Side::Bid, 100, 5);
    let second = Order::new(Side::Bid, 100, 5);
    book.insert(&first);
    book.insert(&second);
    book.insert(Order::new(Side::Ask, 100, 5));

    assert_eq!(first.quantity(), 0);
    assert!(!first.is_queued());
    assert_eq!(second.quantity(), 5);
    assert!(second.is_queued());
    assert_eq!(book.market_price(), Some(100));
    assert_eq!(book.best_bid(), Some(100));
    assert_eq!(book.level(Side::Bid, 100).unwrap().quantity, 5);
}

/// Best-price walk: an aggressive ask sweeps the bid side top-down and
/// each fill prices at the resting level.
#[test]
fn test_best_price_walk() {
    let mut book = Book::new("TEST");
    let trades = capture_trades(&mut book);

    book.insert(Order::new(Side::Bid, 99, 10));
    book.insert(Order::new(Side::Bid, 100, 5));
    book.insert(Order::new(Side::Ask, 98, 12));

    let observed: Vec<_> = trades
        .borrow()
        .iter()
        .map(|trade| (trade.price, trade.quantity))
        .collect();
    assert_eq!(observed, vec![(100, 5), (99, 7)]);
    assert_eq!(book.best_bid(), Some(99));
    assert_eq!(book.level(Side::Bid, 99).unwrap().quantity, 3);
    assert_eq!(book.market_price(), Some(99));
    assert_eq!(book.best_ask(), None);
}

/// An immediate-or-cancel residual on an empty book cancels in full.
#[test]
fn test_ioc_residual_cancel() {
    struct ExpectFullCancel;
    impl OrderEvents for ExpectFullCancel {
        fn on_canceled(&self, _book: &mut Book, order: &OrderRef) {
            assert_eq!(order.quantity(), 10);
        }
    }

    let mut book = Book::new("TEST");
    let order = Order::with_events(
        Side::Bid,
        100,
        10,
        OrderFlags::IMMEDIATE_OR_CANCEL,
        Rc::new(ExpectFullCancel),
    );
    book.insert(&order);

    assert_eq!(order.quantity(), 10);
    assert!(!order.is_queued());
    assert!(book.is_empty());
}

/// An infeasible all-or-nothing bid rests; later ask liquidity at the same
/// price triggers the re-check cascade and executes it in full.
#[test]
fn test_aon_rests_then_cascade_fires() {
    let mut book = Book::new("TEST");

    book.insert(Order::new(Side::Ask, 100, 6));
    let aon_bid = Order::with_flags(Side::Bid, 100, 10, OrderFlags::ALL_OR_NOTHING);
    book.insert(&aon_bid);
    assert!(aon_bid.is_queued());
    assert_eq!(aon_bid.quantity(), 10);

    book.insert(Order::new(Side::Ask, 100, 4));

    assert_eq!(aon_bid.quantity(), 0);
    assert!(!aon_bid.is_queued());
    assert_eq!(book.market_price(), Some(100));
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
    assert!(book.is_empty());
}

/// A fired trigger submits an order from its callback; the deferral queue
/// runs it after the outer insertion, preserving callback order.
#[test]
fn test_trigger_cascade_via_callback() {
    struct SellAtHundred {
        order: RefCell<Option<OrderRef>>,
        fired_after_trade: Rc<RefCell<bool>>,
    }
    impl TriggerEvents for SellAtHundred {
        fn on_triggered(&self, book: &mut Book, _trigger: &TriggerRef) {
            // The outer trade has already been applied when we fire.
            assert_eq!(book.market_price(), Some(105));
            *self.fired_after_trade.borrow_mut() = true;
            if let Some(order) = self.order.borrow_mut().take() {
                book.insert(order);
            }
        }
    }

    let mut book = Book::new("TEST");
    let trades = capture_trades(&mut book);

    let resting_bid = Order::new(Side::Bid, 100, 20);
    book.insert(&resting_bid);
    book.insert(Order::new(Side::Ask, 105, 1));

    let stop_sell = Order::new(Side::Ask, 100, 3);
    let fired_after_trade = Rc::new(RefCell::new(false));
    let trigger = Trigger::with_events(
        Side::Ask,
        105,
        Rc::new(SellAtHundred {
            order: RefCell::new(Some(stop_sell.clone())),
            fired_after_trade: fired_after_trade.clone(),
        }),
    );
    book.insert(&trigger);

    book.insert(Order::new(Side::Bid, 105, 1));

    assert!(*fired_after_trade.borrow());
    assert!(!trigger.is_queued());
    assert_eq!(stop_sell.quantity(), 0);
    assert_eq!(resting_bid.quantity(), 17);
    let observed: Vec<_> = trades
        .borrow()
        .iter()
        .map(|trade| (trade.price, trade.quantity))
        .collect();
    assert_eq!(observed, vec![(105, 1), (100, 3)]);
    assert_eq!(book.market_price(), Some(100));
}

/// Cancelling one of many resting orders through its handle leaves the
/// rest of the book untouched.
#[test]
fn test_cancel_among_many_levels() {
    let mut book = Book::new("TEST");

    let orders: Vec<_> = (0..1000)
        .map(|index| Order::new(Side::Bid, 1000 + index as u128, 10))
        .collect();
    for order in &orders {
        book.insert(order);
    }
    assert_eq!(book.best_bid(), Some(1999));
    assert_eq!(book.level_count(Side::Bid), 1000);

    assert!(book.cancel_order(&orders[0]));
    assert_eq!(book.best_bid(), Some(1999));
    assert_eq!(book.level_count(Side::Bid), 999);
    assert_eq!(book.level(Side::Bid, 1000), None);
    assert_eq!(book.order_count(Side::Bid), 999);
}

/// Insert-then-cancel leaves the book exactly as it was, provided the
/// order did not trade.
#[test]
fn test_insert_cancel_round_trip() {
    let mut book = Book::new("TEST");
    book.insert(Order::new(Side::Bid, 100, 5));
    book.insert(Order::new(Side::Ask, 104, 5));
    let before = book.snapshot();

    let order = Order::with_flags(Side::Bid, 101, 7, OrderFlags::empty());
    book.insert(&order);
    assert!(book.cancel_order(&order));

    assert_eq!(book.snapshot(), before);

    // And the snapshot itself survives a JSON round trip.
    let json = before.to_json().unwrap();
    assert_eq!(BookSnapshot::from_json(&json).unwrap(), before);
}

/// Destroying the book detaches every resting entity without callbacks.
#[test]
fn test_book_drop_detaches_entities() {
    let order = Order::new(Side::Bid, 100, 5);
    let trigger = Trigger::new(Side::Ask, 105);
    {
        let mut book = Book::new("TEST");
        book.insert(&order);
        book.insert(&trigger);
        assert!(order.is_queued());
        assert!(trigger.is_queued());
    }
    assert!(!order.is_queued());
    assert!(order.book_id().is_none());
    assert_eq!(order.quantity(), 5);
    assert!(!trigger.is_queued());
    assert!(trigger.book_id().is_none());
}
