//! Shared foundational types used across the configuration cache.
//!
//! This crate provides content hashing, scope (project) paths, and the
//! internal error type that signals a bug rather than an invalidation.

#![warn(missing_docs)]

pub mod hash;
pub mod result;
pub mod scope;

pub use hash::{ContentHash, ContentHasher};
pub use result::{CacheResult, InternalError};
pub use scope::{ParseScopePathError, ScopePath};
