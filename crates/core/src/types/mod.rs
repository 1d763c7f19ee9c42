//! Core types for the order-hold app.

pub mod address;
pub mod gid;
pub mod hold_duration;

pub use address::ShippingAddress;
pub use gid::ShopifyGid;
pub use hold_duration::{HOLD_DURATION_OPTIONS, HoldDuration, HoldDurationError};
