//! Parameters structure for the forward kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the forward kinematics projection.
///
/// Lengths and positions are in model units (the screen-space unit of the
/// rendering surface); projection constants are calibration values, not
/// physically derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Length of the metacarpal link (CMC -> MCP).
    pub metacarpal_length: f64,

    /// Length of the proximal link (MCP -> IP).
    pub proximal_length: f64,

    /// Length of the distal link (IP -> tip).
    pub distal_length: f64,

    /// Rendered link width at each joint of the chain, base to tip.
    pub joint_widths: [f64; 4],

    /// Position of the CMC base joint on the rendering surface.
    pub base_position: [f64; 3],

    // ---- CONVENTION ----
    /// Pitch of the chain at rest.
    ///
    /// Units: degrees. -90 points the thumb "up" (towards -Y, screen axes).
    pub rest_pitch_deg: f64,

    /// Fraction of the net opposition angle contributing to the base yaw.
    pub opposition_yaw_gain: f64,

    // ---- PROJECTION ----
    /// Oblique projection X factor: `screen_x = x + k1 * z`.
    pub projection_k1: f64,

    /// Oblique projection Y factor: `screen_y = y - k2 * z`.
    pub projection_k2: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Calibrated defaults matching the thumb's 50/30/20 mm segment lengths.
    fn default() -> Self {
        Self {
            metacarpal_length: 50.0,
            proximal_length: 30.0,
            distal_length: 20.0,
            joint_widths: [22.0, 20.0, 18.0, 14.0],
            base_position: [200.0, 250.0, 0.0],
            rest_pitch_deg: -90.0,
            opposition_yaw_gain: 0.5,
            projection_k1: 0.5,
            projection_k2: 0.3,
        }
    }
}
