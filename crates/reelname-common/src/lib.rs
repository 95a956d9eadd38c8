//! Reelname-Common: Shared types and utilities.
//!
//! This crate provides common functionality used across reelname:
//!
//! - **Typed IDs**: Type-safe UUID wrapper for files in a rename batch
//! - **Core Types**: The media kind a metadata parent belongs to
//! - **Path Utilities**: Hidden-entry detection, common base directories and
//!   filesystem-safe path components
//!
//! # Examples
//!
//! ```
//! use reelname_common::{FileId, MediaKind};
//! use reelname_common::paths::sanitize_component;
//!
//! let id = FileId::new();
//! assert_ne!(id, FileId::new());
//!
//! assert_eq!(MediaKind::Series.to_string(), "series");
//! assert_eq!(sanitize_component("Law: Order"), "Law Order");
//! ```

pub mod ids;
pub mod paths;
pub mod types;

pub use ids::*;
pub use types::*;
