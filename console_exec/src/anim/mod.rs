//! Animation interpolator module
//!
//! Drives the current joint state towards the commanded target, one blend
//! step per cycle, until convergence or timeout.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during AnimInterp operation.
#[derive(Debug, thiserror::Error)]
pub enum AnimError {
    #[error("Cycle delta time must be finite and non-negative, got {0}")]
    InvalidDeltaTime(f64),
}
