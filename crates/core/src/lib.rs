//! Order Hold Core - Shared domain types.
//!
//! This crate provides the pure domain vocabulary used by the server:
//! - [`types`] - Shopify GIDs, hold durations, shipping addresses
//! - [`edit_window`] - the address-edit-window policy
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Everything here is deterministic and
//! trivially testable.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod edit_window;
pub mod types;

pub use types::*;
