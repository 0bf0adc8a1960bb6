//! Orders domain module.
//!
//! An order is created once from a cart by checkout, then moves through a
//! caller-directed status lifecycle:
//!
//! ```text
//! created ──▶ paid ──▶ shipped ──▶ delivered
//!    │          │          │
//!    └──────────┴──────────┴──▶ cancelled
//! ```
//!
//! Line items are frozen snapshots of product data taken at checkout time.

pub mod filter;
pub mod order;
pub mod status;
pub mod types;

pub use filter::OrderFilter;
pub use order::{
    AddLineItem, ChangeLineItemQuantity, ChangeStatus, LineItemAdded, LineItemQuantityChanged,
    LineItemRemoved, Order, OrderCommand, OrderEvent, OrderId, OrderPlaced, PaymentInfoSet,
    PlaceOrder, RemoveLineItem, SetPaymentInfo, SetTrackingInfo, StatusChanged, TrackingInfoSet,
};
pub use status::OrderStatus;
pub use types::{LineItem, PaymentInfo, PaymentStatus, ShippingInfo, StatusChange, TrackingInfo};
