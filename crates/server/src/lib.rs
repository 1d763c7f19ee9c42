//! Order Hold server library.
//!
//! A Shopify app backend that holds fulfillment of newly placed orders so
//! customers can edit their shipping address within a configurable window.
//!
//! # Architecture
//!
//! - Axum web framework (webhooks + the extension-facing API)
//! - Shopify Admin GraphQL API for hold/release/address mutations
//! - `PostgreSQL` for shops, order projections and the deferred-job queue
//! - A polling job runner for holds, releases and compliance erasure

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
