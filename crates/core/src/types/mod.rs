//! Core types for Bistro.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod status;

pub use address::Address;
pub use id::*;
pub use status::OrderStatus;
