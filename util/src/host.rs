//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with locating the software root.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (THUMB_SW_ROOT) is not set")]
    SwRootNotSet,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Retrieve the software root directory.
///
/// The root is given by the `THUMB_SW_ROOT` environment variable and is the
/// directory containing `params/` and `sessions/`.
pub fn get_thumb_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var("THUMB_SW_ROOT") {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::SwRootNotSet),
    }
}
