//! Implementations for the AnimInterp state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::Serialize;

// Internal
use super::{AnimError, Params};
use thumb_if::joints::{ActChannel, JointState};
use util::{
    archive::{Archived, Archiver},
    maths,
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Animation interpolator module state.
///
/// The interpolator owns the current joint state and mutates it once per
/// cycle while a run is active. At most one interpolation run is ever in
/// flight: commanding a new target cancels the previous run (and its timeout
/// clock) before starting the new one.
#[derive(Default)]
pub struct AnimInterp {
    pub(crate) params: Params,

    report: StatusReport,
    arch_report: Archiver,

    current: JointState,
    arch_current: Archiver,

    target: JointState,

    mode: AnimMode,

    /// Time accumulated since the active run started.
    ///
    /// Built from the injected cycle delta times rather than a wall clock so
    /// the module is fully deterministic under test.
    elapsed_s: f64,
}

/// Input data to the animation interpolator.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// The animation command to execute, or `None` if there is no new
    /// command on this cycle.
    pub cmd: Option<AnimCmd>,

    /// Time elapsed since the previous cycle.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Status report for AnimInterp processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The mode the interpolator is in after this cycle.
    pub mode: AnimMode,

    /// Maximum per-channel distance to the target after this cycle.
    ///
    /// Units: degrees
    pub max_err_deg: f64,

    /// The run converged on this cycle and the state was snapped onto the
    /// target.
    pub converged: bool,

    /// The run exceeded its timeout on this cycle and the state was forced
    /// onto the target. Recoverable, the console surfaces it as a warning.
    pub timed_out: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Commands accepted by the interpolator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimCmd {
    /// Begin interpolating towards the given target.
    SetTarget(JointState),

    /// Immediately snap both current and target onto the given state.
    SnapTo(JointState),

    /// Cancel any active run, freezing the current state where it is.
    Cancel,
}

/// The interpolator's two modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AnimMode {
    Idle,
    Animating,
}

impl Default for AnimMode {
    fn default() -> Self {
        AnimMode::Idle
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for AnimInterp {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = JointState;
    type StatusReport = StatusReport;
    type ProcError = AnimError;

    /// Initialise the AnimInterp module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(e),
        };

        // Initialise the archivers
        self.arch_report = Archiver::from_path(session, "anim/status_report.csv").unwrap();
        self.arch_current = Archiver::from_path(session, "anim/current_angles.csv").unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the animation interpolator.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        if !input_data.dt_s.is_finite() || input_data.dt_s < 0.0 {
            return Err(AnimError::InvalidDeltaTime(input_data.dt_s));
        }

        // Check to see if there's a new command
        if let Some(cmd) = input_data.cmd {
            match cmd {
                AnimCmd::SetTarget(target) => self.set_target(target),
                AnimCmd::SnapTo(state) => self.snap_to(state),
                AnimCmd::Cancel => self.cancel(),
            }
        }

        if self.mode == AnimMode::Animating {
            self.elapsed_s += input_data.dt_s;

            self.step(input_data.dt_s);

            let max_err_deg = self.current.max_abs_diff(&self.target);

            if max_err_deg <= self.params.convergence_epsilon_deg {
                // Snap exactly onto the target so no residual error lingers
                self.current = self.target;
                self.mode = AnimMode::Idle;
                self.report.converged = true;

                debug!("Animation converged after {:.3} s", self.elapsed_s);
            } else if self.elapsed_s >= self.params.timeout_s {
                warn!(
                    "Animation timed out after {:.3} s with {:.3} deg residual, \
                     forcing onto target",
                    self.elapsed_s, max_err_deg
                );

                self.current = self.target;
                self.mode = AnimMode::Idle;
                self.report.timed_out = true;
            }
        }

        self.report.mode = self.mode;
        self.report.max_err_deg = self.current.max_abs_diff(&self.target);

        Ok((self.current, self.report))
    }
}

impl Archived for AnimInterp {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;
        self.arch_current.serialise(self.current)?;

        Ok(())
    }
}

impl AnimInterp {
    /// The current joint state snapshot.
    pub fn current(&self) -> JointState {
        self.current
    }

    /// The target of the active (or last) run.
    pub fn target(&self) -> JointState {
        self.target
    }

    /// The interpolator's mode.
    pub fn mode(&self) -> AnimMode {
        self.mode
    }

    /// Begin a run towards `target`.
    ///
    /// Cancels any run already active (including its timeout clock). A target
    /// already within the convergence epsilon of the current state is a
    /// no-op, the interpolator snaps and stays idle.
    fn set_target(&mut self, target: JointState) {
        self.elapsed_s = 0.0;

        if self.current.max_abs_diff(&target) <= self.params.convergence_epsilon_deg {
            self.current = target;
            self.target = target;
            self.mode = AnimMode::Idle;
            return;
        }

        self.target = target;
        self.mode = AnimMode::Animating;
    }

    /// Snap both current and target onto `state` and go idle.
    fn snap_to(&mut self, state: JointState) {
        self.current = state;
        self.target = state;
        self.mode = AnimMode::Idle;
        self.elapsed_s = 0.0;
    }

    /// Cancel any active run, freezing the current state.
    fn cancel(&mut self) {
        if self.mode == AnimMode::Animating {
            debug!("Animation cancelled after {:.3} s", self.elapsed_s);
        }

        self.target = self.current;
        self.mode = AnimMode::Idle;
        self.elapsed_s = 0.0;
    }

    /// Blend every channel one step towards the target.
    ///
    /// The factor scales with the cycle delta time so convergence speed does
    /// not depend on the cycle rate.
    fn step(&mut self, dt_s: f64) {
        let factor = maths::clamp(
            &(self.params.blend_factor * (dt_s * 1000.0) / self.params.reference_frame_ms),
            &0.0,
            &self.params.max_blend_factor,
        );

        for id in ActChannel::ALL.iter() {
            let blended = maths::lerp(self.current.channel(*id), self.target.channel(*id), factor);
            self.current.set_channel(*id, blended);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use thumb_if::cmd::TrialPreset;

    /// Cycle period used by the tests.
    const DT_S: f64 = 1.0 / 60.0;

    /// Tick the interpolator once with no new command.
    fn tick(interp: &mut AnimInterp, dt_s: f64) -> StatusReport {
        let input = InputData { cmd: None, dt_s };
        interp.proc(&input).unwrap().1
    }

    /// Issue a command and tick.
    fn command(interp: &mut AnimInterp, cmd: AnimCmd, dt_s: f64) -> StatusReport {
        let input = InputData {
            cmd: Some(cmd),
            dt_s,
        };
        interp.proc(&input).unwrap().1
    }

    #[test]
    fn test_converges_with_decreasing_error() {
        let mut interp = AnimInterp::default();
        let target = TrialPreset::Curl.joint_state();

        let mut report = command(&mut interp, AnimCmd::SetTarget(target), DT_S);
        let mut prev_err = report.max_err_deg;
        let mut ticks = 1;

        while report.mode == AnimMode::Animating {
            report = tick(&mut interp, DT_S);
            ticks += 1;

            if report.mode == AnimMode::Animating {
                assert!(
                    report.max_err_deg < prev_err,
                    "error must strictly decrease: {} -> {}",
                    prev_err,
                    report.max_err_deg
                );
            }
            prev_err = report.max_err_deg;

            assert!(ticks < 1000, "did not converge within 1000 ticks");
        }

        assert!(report.converged);
        assert!(!report.timed_out);
        assert_eq!(interp.current(), target);
        assert_eq!(report.max_err_deg, 0.0);

        // Converged well within the timeout
        assert!((ticks as f64) * DT_S < interp.params.timeout_s);
    }

    #[test]
    fn test_timeout_forces_target() {
        let mut interp = AnimInterp::default();
        interp.params.blend_factor = 1e-6;

        let target = TrialPreset::PowerGrip.joint_state();
        let mut report = command(&mut interp, AnimCmd::SetTarget(target), 0.1);

        let mut ticks = 1;
        while report.mode == AnimMode::Animating {
            report = tick(&mut interp, 0.1);
            ticks += 1;
            assert!(ticks < 100, "timeout did not fire");
        }

        assert!(report.timed_out);
        assert!(!report.converged);
        assert_eq!(interp.current(), target);
        assert_eq!(interp.mode(), AnimMode::Idle);
    }

    #[test]
    fn test_retarget_mid_flight_reaches_new_target() {
        let mut interp = AnimInterp::default();
        let t1 = TrialPreset::Curl.joint_state();
        let t2 = TrialPreset::ThumbsUp.joint_state();

        command(&mut interp, AnimCmd::SetTarget(t1), DT_S);
        for _ in 0..10 {
            tick(&mut interp, DT_S);
        }
        assert_eq!(interp.mode(), AnimMode::Animating);

        // Retarget while in flight
        let mut report = command(&mut interp, AnimCmd::SetTarget(t2), DT_S);
        let mut ticks = 0;
        while report.mode == AnimMode::Animating {
            report = tick(&mut interp, DT_S);
            ticks += 1;
            assert!(ticks < 1000, "did not converge on the new target");
        }

        assert_eq!(interp.current(), t2);
        assert_ne!(interp.current(), t1);
    }

    #[test]
    fn test_equal_target_is_noop() {
        let mut interp = AnimInterp::default();

        let report = command(
            &mut interp,
            AnimCmd::SetTarget(JointState::rest()),
            DT_S,
        );

        assert_eq!(report.mode, AnimMode::Idle);
        assert_eq!(interp.current(), JointState::rest());
    }

    #[test]
    fn test_cancel_freezes_current() {
        let mut interp = AnimInterp::default();
        let target = TrialPreset::Curl.joint_state();

        command(&mut interp, AnimCmd::SetTarget(target), DT_S);
        for _ in 0..10 {
            tick(&mut interp, DT_S);
        }

        let mid_flight = interp.current();
        assert_ne!(mid_flight, target);

        let report = command(&mut interp, AnimCmd::Cancel, DT_S);

        assert_eq!(report.mode, AnimMode::Idle);
        assert_eq!(interp.current(), mid_flight);
        assert_eq!(interp.target(), mid_flight);
    }

    #[test]
    fn test_snap_is_immediate() {
        let mut interp = AnimInterp::default();
        let state = TrialPreset::Pinch.joint_state();

        let report = command(&mut interp, AnimCmd::SnapTo(state), DT_S);

        assert_eq!(report.mode, AnimMode::Idle);
        assert_eq!(interp.current(), state);
        assert_eq!(interp.target(), state);
    }

    #[test]
    fn test_frame_rate_independent() {
        let target = TrialPreset::Curl.joint_state();

        // Converge the same run at 100 Hz and at 20 Hz
        let elapsed_at = |dt_s: f64| {
            let mut interp = AnimInterp::default();
            let mut report = command(&mut interp, AnimCmd::SetTarget(target), dt_s);
            let mut elapsed = dt_s;

            while report.mode == AnimMode::Animating {
                report = tick(&mut interp, dt_s);
                elapsed += dt_s;
                assert!(elapsed < 10.0, "did not converge");
            }

            elapsed
        };

        let fast = elapsed_at(0.01);
        let slow = elapsed_at(0.05);

        // Same wall-clock convergence time to within half a second
        assert!(
            (fast - slow).abs() < 0.5,
            "convergence time depends on frame rate: {} vs {}",
            fast,
            slow
        );
    }

    #[test]
    fn test_invalid_dt_rejected() {
        let mut interp = AnimInterp::default();

        let input = InputData {
            cmd: None,
            dt_s: -0.1,
        };
        assert!(interp.proc(&input).is_err());

        let input = InputData {
            cmd: None,
            dt_s: f64::NAN,
        };
        assert!(interp.proc(&input).is_err());
    }
}
