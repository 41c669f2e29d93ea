//! Blisora Core - Shared types library.
//!
//! This crate provides common types used across all Blisora components:
//! - `storefront` - The storefront core (API client, saga stages, persistence)
//! - `integration-tests` - End-to-end saga tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, status enums, the
//!   audience filter, and slug derivation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
