//! # Console library.
//!
//! This library allows other crates in the workspace (and the integration
//! tests) to access items defined inside the console crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Animation interpolator - drives the current joint state towards the target
pub mod anim;

/// Backend client - talks to the interpretation/force/voltage services
pub mod backend_client;

/// Backend worker - runs the blocking backend calls off the main loop
pub mod backend_worker;

/// Command pipeline - turns console commands into targets and transcript entries
pub mod cmd_pipeline;

/// Console input - interactive operator prompt on a reader thread
pub mod console_input;

/// Data store - the single owner of all mutable console state
pub mod data_store;

/// Forward kinematics - projects a joint state into a screen-space pose
pub mod fk;

/// Parameters for the console executable
pub mod params;

/// Transcript - the bounded operator/assistant message log
pub mod transcript;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Target period of one cycle.
pub const CYCLE_PERIOD_S: f64 = 1.0 / 60.0;

/// Number of cycles per second
pub const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;
