//! Order book error types

use thiserror::Error;

/// Why a submission was rejected.
///
/// Rejections are surfaced through the `on_rejected` lifecycle callback of
/// the submitted entity; `Book::insert` itself always returns normally.
/// An immediate-or-cancel residual is not a rejection (it surfaces as
/// `on_canceled`), and a non-crossing limit order simply rests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RejectReason {
    /// The order was submitted with zero quantity.
    #[error("order quantity must be positive")]
    ZeroQuantity,

    /// The same entity instance is already resting in a book.
    #[error("entity is already queued in a book")]
    AlreadyQueued,
}
