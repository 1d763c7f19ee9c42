//! Domain workflows.
//!
//! - [`address_updates`] - merchant-facing shipping address changes
//! - [`holds`] - the fulfillment-order hold lifecycle
//! - [`compliance`] - data request / redaction handling

pub mod address_updates;
pub mod compliance;
pub mod holds;

pub use address_updates::{AddressUpdateOutcome, AddressUpdateService};
pub use compliance::ComplianceService;
pub use holds::HoldService;
