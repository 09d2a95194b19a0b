//! # Console Executable Parameters
//!
//! This module provides parameters for the console executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConsoleExecParams {
    /// Bound on the number of retained transcript entries.
    pub transcript_max_entries: usize,

    /// Nominal actuator coil resistance, used to derive the power draw
    /// telemetry from the backend's voltage estimates.
    ///
    /// Units: ohms
    pub actuator_nominal_resistance_ohm: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ConsoleExecParams {
    fn default() -> Self {
        Self {
            transcript_max_entries: crate::transcript::DEFAULT_MAX_ENTRIES,
            actuator_nominal_resistance_ohm: 8.0,
        }
    }
}
