//! # Thumb Interface Library
//!
//! This library provides the interface definitions shared between the
//! operator console and the remote thumb backend services:
//!
//! - [`joints`] - the canonical joint state model and its invariants
//! - [`cmd`] - console commands and trial presets
//! - [`backend`] - wire types for the backend HTTP endpoints
//! - [`net`] - HTTP/JSON networking abstractions

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod backend;
pub mod cmd;
pub mod joints;
pub mod net;
