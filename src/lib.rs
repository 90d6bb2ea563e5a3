//! # Price–Time-Priority Matching Engine
//!
//! A limit order matching engine for a single trading instrument. The book
//! keeps bids and asks in price-keyed maps with FIFO time priority inside
//! each level, matches crossable orders against the resting side, and
//! reports every lifecycle transition through per-entity callbacks.
//!
//! ## Key Features
//!
//! - **Price–time priority**: best price first; strict arrival order within
//!   a level.
//! - **Immediate-or-cancel**: crossable quantity executes immediately, the
//!   residual is discarded instead of resting.
//! - **All-or-nothing**: a feasibility pre-check simulates the walk without
//!   mutation; infeasible orders rest and are re-evaluated whenever the
//!   opposing side's liquidity grows at a reachable price.
//! - **Price triggers**: one-shot event handles that fire when the
//!   last-trade price crosses their level; their handlers typically submit
//!   orders of their own.
//! - **Re-entrant submission**: lifecycle callbacks may call
//!   [`Book::insert`] recursively. A deferral counter parks such
//!   submissions on a FIFO and processes them, in order, after the outer
//!   insertion's trade walk and trigger cascade complete.
//! - **O(1) cancellation**: resting entities carry two stable generational
//!   handles, one locating their price level in its arena and one locating
//!   their slot in the level's FIFO.
//!
//! Prices are `u128` ticks and quantities `u64` lots; callers canonicalize
//! to fixed point at the edge.
//!
//! ## Threading
//!
//! The engine is single-threaded and synchronous by design: no operation
//! blocks, no callback is deferred to another thread, and the types are
//! intentionally `!Send`/`!Sync`. Callers serialize access externally.
//!
//! ## Example
//!
//! ```rust
//! use matchbook::prelude::*;
//!
//! let mut book = Book::new("BTC/USD");
//! book.insert(Order::new(Side::Bid, 100, 5));
//! book.insert(Order::new(Side::Ask, 100, 3));
//!
//! assert_eq!(book.market_price(), Some(100));
//! assert_eq!(book.best_bid(), Some(100));
//! assert_eq!(book.level(Side::Bid, 100).map(|level| level.quantity), Some(2));
//! ```

pub mod orderbook;

pub mod prelude;

pub use orderbook::{
    Book, BookId, BookSnapshot, EntityId, LevelSnapshot, Order, OrderEvents, OrderFlags, OrderRef,
    RejectReason, Side, Submission, Trade, TradeListener, Trigger, TriggerEvents, TriggerRef,
};
