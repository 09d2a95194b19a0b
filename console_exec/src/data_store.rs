//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    anim::{self, AnimInterp},
    fk,
    transcript::Transcript,
};
use thumb_if::backend::{ActuatorForces, ActuatorVoltages};
use thumb_if::joints::JointState;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Telemetry derived from the latest command round trip.
///
/// Overwritten whole on each round trip, never accumulated.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PerformanceMetrics {
    /// Time the backend took to interpret the last command.
    ///
    /// Units: milliseconds
    pub response_time_ms: f64,

    /// Interpretation confidence of the last command, as a percentage.
    pub accuracy_pct: f64,

    /// Estimated electrical power drawn at the last commanded pose.
    ///
    /// Units: milliwatts
    pub power_draw_mw: f64,
}

/// Global data store for the executable.
///
/// The data store is the single owner of all mutable console state. It is
/// only ever touched from the main loop; worker threads hand results back
/// over channels and never see this struct.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    // Joint state
    /// The joint state as animated this cycle.
    pub current_angles: JointState,

    /// The commanded target joint state.
    pub target_angles: JointState,

    // Animation
    pub anim_interp: AnimInterp,
    pub anim_input: anim::InputData,
    pub anim_report: anim::StatusReport,

    // Kinematics
    pub fk_params: fk::Params,
    pub pose: Option<fk::SkeletalPose>,

    // Operator-facing state
    pub transcript: Transcript,
    pub metrics: PerformanceMetrics,

    // Latest best-effort backend telemetry
    pub forces: Option<ActuatorForces>,
    pub voltages: Option<ActuatorVoltages>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive backend interpretation failures
    pub num_consec_backend_failures: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and
    /// sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64, dt_s: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128) == 0;

        self.anim_input = anim::InputData {
            cmd: None,
            dt_s,
        };
    }
}
