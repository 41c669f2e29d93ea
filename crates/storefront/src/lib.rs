//! Blisora Storefront core.
//!
//! The storefront is a thin presentation layer over a remote commerce API;
//! everything that is not pixels lives here. This crate owns:
//!
//! - the HTTP client for the commerce backend ([`api`])
//! - browser-equivalent local persistence with versioned keys ([`store`])
//! - one controller per page of the guest checkout saga ([`pages`]):
//!   catalog, product detail, cart, checkout, payment, confirmation and
//!   tracking
//!
//! The rendering shell (design system, router) consumes the typed view state
//! each controller exposes and executes the [`pages::NavigationTarget`]
//! intents the controllers return. No stage holds a reference to another's
//! in-memory state; the saga is held together by the shared remote cart and
//! the persisted local keys, so every page survives a full reload.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod pages;
pub mod store;
pub mod telemetry;
