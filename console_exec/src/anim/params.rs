//! Parameters structure for AnimInterp

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the animation interpolator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- BLENDING ----
    /// Blend factor applied per reference frame of elapsed time.
    ///
    /// The per-cycle factor is `blend_factor * dt_ms / reference_frame_ms`,
    /// keeping the interpolation speed independent of the cycle rate.
    pub blend_factor: f64,

    /// The frame duration the blend factor is calibrated against.
    ///
    /// Units: milliseconds
    pub reference_frame_ms: f64,

    /// Upper bound on the per-cycle blend factor, protects against huge
    /// steps after a stalled cycle.
    pub max_blend_factor: f64,

    // ---- TERMINATION ----
    /// Maximum per-channel error at which the interpolation is considered
    /// converged and snapped onto the target.
    ///
    /// Units: degrees
    pub convergence_epsilon_deg: f64,

    /// Wall-clock bound on a single interpolation run. When exceeded the
    /// current state is forced onto the target and the run ends with a
    /// timed-out report.
    ///
    /// Units: seconds
    pub timeout_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            blend_factor: 0.15,
            reference_frame_ms: 50.0,
            max_blend_factor: 0.5,
            convergence_epsilon_deg: 0.1,
            timeout_s: 5.0,
        }
    }
}
