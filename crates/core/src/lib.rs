//! Bistro Core - Shared types library.
//!
//! This crate provides common types used by the Bistro server:
//! type-safe entity IDs, the order fulfillment status machine, and the
//! shipping address shape shared between requests and order snapshots.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
