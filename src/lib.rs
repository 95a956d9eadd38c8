//! Reelname - batch renamer for TV episodes and movies
//!
//! This library crate exposes the rename pipeline for the binary and for
//! integration testing:
//!
//! - [`context`]: typed template variables per file
//! - [`template`]: per-component path templates
//! - [`file`]: the per-file state machine
//! - [`source`]: metadata sources, registry and auth refresh
//! - [`batch`]: discovery, match assignment and rename application

pub mod batch;
pub mod config;
pub mod context;
pub mod file;
pub mod probe;
pub mod session;
pub mod source;
pub mod template;
