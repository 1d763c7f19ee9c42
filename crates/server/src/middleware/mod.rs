//! Request middleware and extractors.

pub mod session_token;

pub use session_token::CurrentShop;
