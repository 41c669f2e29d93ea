//! Core types for Blisora.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod audience;
pub mod id;
pub mod slug;
pub mod status;

pub use audience::Audience;
pub use id::*;
pub use slug::{looks_like_object_id, slugify};
pub use status::*;
