//! # Command pipeline module
//!
//! The command pipeline turns console commands into animation targets and
//! transcript entries. Presets resolve synchronously; natural language goes
//! through the backend interpreter on the worker thread, with at most one
//! command in flight at a time (further submissions are rejected while busy,
//! never queued).
//!
//! Every backend failure is recovered here: it becomes a plain-language
//! transcript entry and a warning, the commanded target is never changed by
//! a failed round trip.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use crate::{
    anim::AnimCmd,
    backend_worker::{BackendWorker, WorkerRequest, WorkerResponse},
    data_store::{DataStore, PerformanceMetrics},
    params::ConsoleExecParams,
    transcript::Role,
};
use thumb_if::{
    backend::InterpResponse,
    cmd::{ConsoleCmd, TrialPreset},
    joints::JointState,
    net::{NetError, NetParams},
};
use util::{maths, session};

use crate::backend_client::BackendClientError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Confidence reported for interpretations on backend revisions which do not
/// send one.
const DEFAULT_INTERP_CONFIDENCE: f64 = 0.95;

/// The command sent to the interpreter to re-zero its pose memory on reset.
const BACKEND_RESET_COMMAND: &str = "reset";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The command pipeline.
pub struct CmdPipeline {
    worker: BackendWorker,

    /// Monotonic token issued to every backend request. Responses carrying a
    /// token that no longer matches the expected slot are superseded and
    /// discarded.
    generation: u64,

    /// Generation of the interpretation in flight, if any. The pipeline is
    /// busy exactly while this is set.
    in_flight: Option<u64>,

    /// Generation of the pending post-reset reconcile request, if any.
    reconcile: Option<u64>,

    /// Generation of the latest derived telemetry refresh.
    derived: Option<u64>,

    /// Nominal actuator coil resistance for the power draw telemetry.
    ///
    /// Units: ohms
    nominal_resistance_ohm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CmdPipeline {
    /// Create a new pipeline, spawning the backend worker.
    pub fn new(net_params: &NetParams, exec_params: &ConsoleExecParams) -> Self {
        Self {
            worker: BackendWorker::new(net_params),
            generation: 0,
            in_flight: None,
            reconcile: None,
            derived: None,
            nominal_resistance_ohm: exec_params.actuator_nominal_resistance_ohm,
        }
    }

    /// Create a pipeline around an externally controlled worker handle.
    #[cfg(test)]
    pub(crate) fn with_worker(worker: BackendWorker, nominal_resistance_ohm: f64) -> Self {
        Self {
            worker,
            generation: 0,
            in_flight: None,
            reconcile: None,
            derived: None,
            nominal_resistance_ohm,
        }
    }

    /// True while an interpretation is in flight. New submissions are
    /// rejected until the round trip completes.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Execute a console command.
    ///
    /// Mutates the datastore: transcript, metrics, target angles and the
    /// animation input.
    pub fn exec(&mut self, ds: &mut DataStore, cmd: &ConsoleCmd) {
        match cmd {
            ConsoleCmd::Reset => self.reset(ds),

            ConsoleCmd::Preset(preset) => {
                ds.transcript.push(Role::User, preset.name(), None, None);

                if self.is_busy() {
                    self.reject_busy(ds);
                    return;
                }

                self.exec_preset(ds, *preset);
            }

            ConsoleCmd::Raw(text) => {
                ds.transcript.push(Role::User, text, None, None);

                if self.is_busy() {
                    self.reject_busy(ds);
                    return;
                }

                let generation = self.next_generation();
                self.in_flight = Some(generation);

                self.worker.send(WorkerRequest::Interpret {
                    generation,
                    command: text.clone(),
                });

                debug!(
                    "Dispatched command for interpretation (generation {})",
                    generation
                );
            }
        }
    }

    /// Process any backend responses which have arrived since the last
    /// cycle.
    pub fn poll(&mut self, ds: &mut DataStore) {
        for response in self.worker.drain_responses() {
            match response {
                WorkerResponse::Interpret {
                    generation,
                    result,
                    elapsed_ms,
                } => {
                    if Some(generation) == self.in_flight {
                        self.in_flight = None;
                        self.handle_interp(ds, result, elapsed_ms);
                    } else if Some(generation) == self.reconcile {
                        self.reconcile = None;
                        self.handle_reconcile(ds, result);
                    } else {
                        debug!(
                            "Discarding superseded interpretation (generation {})",
                            generation
                        );
                    }
                }

                WorkerResponse::Derived {
                    generation,
                    forces,
                    voltages,
                } => {
                    if Some(generation) == self.derived {
                        self.derived = None;
                        self.handle_derived(ds, forces, voltages);
                    } else {
                        debug!(
                            "Discarding superseded telemetry refresh (generation {})",
                            generation
                        );
                    }
                }
            }
        }
    }

    /// Reset the console: cancel anything in flight, snap the pose to rest,
    /// clear the transcript and re-zero the backend's pose memory.
    pub fn reset(&mut self, ds: &mut DataStore) {
        info!("Console reset requested");

        // Supersede any in-flight work, late responses will be discarded
        self.in_flight = None;
        self.derived = None;

        // Snap the pose to rest
        ds.anim_input.cmd = Some(AnimCmd::SnapTo(JointState::rest()));
        ds.current_angles = JointState::rest();
        ds.target_angles = JointState::rest();

        // Telemetry from the previous pose no longer applies
        ds.metrics = PerformanceMetrics::default();
        ds.forces = None;
        ds.voltages = None;
        ds.num_consec_backend_failures = 0;

        // Keep the old transcript in the session before clearing it
        session::save_with_timestamp("transcript/transcript.json", ds.transcript.snapshot());
        ds.transcript.reset();

        // Ask the backend to re-zero its pose memory, best effort. If it
        // reports a rest state differing from ours we reconcile on reply.
        let generation = self.next_generation();
        self.reconcile = Some(generation);
        self.worker.send(WorkerRequest::Interpret {
            generation,
            command: BACKEND_RESET_COMMAND.to_string(),
        });
    }

    // ---- PRIVATE ----

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Resolve a preset synchronously.
    fn exec_preset(&mut self, ds: &mut DataStore, preset: TrialPreset) {
        let mut resolved = preset.joint_state();

        let limit_report = resolved.apply_limits();
        if limit_report.any() {
            warn!("Preset '{}' exceeded anatomical limits, clamped", preset.name());
        }

        info!("Preset '{}' selected", preset.name());

        self.apply_target(
            ds,
            resolved,
            1.0,
            0.0,
            &format!("Moving to the '{}' trial pose.", preset.name()),
        );
    }

    /// Apply a successfully resolved joint state: transcript, metrics,
    /// animation target and derived telemetry refresh.
    fn apply_target(
        &mut self,
        ds: &mut DataStore,
        resolved: JointState,
        confidence: f64,
        response_time_ms: f64,
        text: &str,
    ) {
        ds.transcript
            .push(Role::Assistant, text, Some(resolved), Some(confidence));

        ds.target_angles = resolved;
        ds.anim_input.cmd = Some(AnimCmd::SetTarget(resolved));

        ds.metrics.response_time_ms = response_time_ms;
        ds.metrics.accuracy_pct = maths::lin_map(
            (0.0, 1.0),
            (0.0, 100.0),
            maths::clamp(&confidence, &0.0, &1.0),
        );

        ds.num_consec_backend_failures = 0;

        // Refresh the force/voltage telemetry against the new target
        let generation = self.next_generation();
        self.derived = Some(generation);
        self.worker.send(WorkerRequest::RefreshDerived {
            generation,
            angles: resolved,
        });
    }

    /// Handle the result of an interpretation round trip.
    fn handle_interp(
        &mut self,
        ds: &mut DataStore,
        result: Result<InterpResponse, BackendClientError>,
        elapsed_ms: f64,
    ) {
        ds.metrics.response_time_ms = elapsed_ms;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                ds.num_consec_backend_failures += 1;
                warn!("Interpretation failed: {}", e);

                ds.transcript
                    .push(Role::Assistant, &failure_text(&e), None, None);
                return;
            }
        };

        // Non-finite angles cannot be clamped meaningfully, reject the whole
        // response rather than corrupt the pose
        if let Err(e) = response.angles.validate() {
            ds.num_consec_backend_failures += 1;
            warn!("Interpretation rejected: {}", e);

            ds.transcript.push(
                Role::Assistant,
                &format!(
                    "The interpreter returned invalid joint data ({}). The pose is unchanged.",
                    e
                ),
                None,
                None,
            );
            return;
        }

        // The interpreter may answer sparsely, unchanged joints keep their
        // commanded value
        let mut resolved = ds.target_angles.merge(&response.angles);

        let limit_report = resolved.apply_limits();
        if limit_report.any() {
            warn!("Interpretation exceeded anatomical limits, clamped");
        }

        let confidence = maths::clamp(
            &response.confidence.unwrap_or(DEFAULT_INTERP_CONFIDENCE),
            &0.0,
            &1.0,
        );

        self.apply_target(
            ds,
            resolved,
            confidence,
            elapsed_ms,
            "Command interpreted, actuating.",
        );
    }

    /// Handle the backend's reply to the post-reset re-zero request.
    fn handle_reconcile(
        &mut self,
        ds: &mut DataStore,
        result: Result<InterpResponse, BackendClientError>,
    ) {
        let response = match result {
            Ok(r) => r,
            Err(e) => {
                // Best effort, the local rest state stands
                debug!("Backend reset reconcile failed: {}", e);
                return;
            }
        };

        if response.angles.validate().is_err() {
            debug!("Backend reset reconcile returned invalid data, ignored");
            return;
        }

        let reported = JointState::rest().merge(&response.angles);

        if reported.max_abs_diff(&JointState::rest()) > 0.0 {
            warn!("Backend rest state differs from local rest, reconciling");

            ds.transcript.push(
                Role::System,
                "Backend reports a non-zero rest state, reconciling.",
                None,
                None,
            );

            ds.target_angles = reported;
            ds.anim_input.cmd = Some(AnimCmd::SetTarget(reported));
        }
    }

    /// Handle a derived telemetry refresh. Both halves are best effort,
    /// failures leave the previous (stale) telemetry in place.
    fn handle_derived(
        &mut self,
        ds: &mut DataStore,
        forces: Result<thumb_if::backend::ActuatorForces, BackendClientError>,
        voltages: Result<thumb_if::backend::ActuatorVoltages, BackendClientError>,
    ) {
        match forces {
            Ok(f) => ds.forces = Some(f),
            Err(e) => warn!("Force telemetry refresh failed: {}", e),
        }

        match voltages {
            Ok(v) => {
                ds.metrics.power_draw_mw = v.power_draw_mw(self.nominal_resistance_ohm);
                ds.voltages = Some(v);
            }
            Err(e) => warn!("Voltage telemetry refresh failed: {}", e),
        }
    }

    /// Reject a submission arriving while an interpretation is in flight.
    fn reject_busy(&self, ds: &mut DataStore) {
        warn!("Command rejected, an interpretation is already in flight");

        ds.transcript.push(
            Role::System,
            "A command is already being interpreted, wait for it to finish.",
            None,
            None,
        );
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// A plain-language description of an interpretation failure for the
/// transcript.
fn failure_text(error: &BackendClientError) -> String {
    match error {
        BackendClientError::InterpretFailed(net) => match net {
            NetError::Timeout => {
                "The backend did not respond within the timeout. The pose is unchanged.".to_string()
            }
            NetError::NotReachable(_) => {
                "The backend could not be reached. Is the interpreter service running?".to_string()
            }
            NetError::BadStatus(code) => {
                format!("The backend rejected the command (status {}).", code)
            }
            NetError::DeserializeError(_) => {
                "The backend returned a malformed response. The pose is unchanged.".to_string()
            }
            other => format!("Command interpretation failed: {}.", other),
        },
        other => format!("Command interpretation failed: {}.", other),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::transcript::Role;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use thumb_if::joints::JointStateUpdate;

    /// A pipeline wired to channels the test controls instead of a worker
    /// thread.
    fn test_pipeline() -> (
        CmdPipeline,
        Receiver<WorkerRequest>,
        Sender<WorkerResponse>,
    ) {
        let (request_sender, request_receiver) = channel();
        let (response_sender, response_receiver) = channel();

        let worker = BackendWorker::from_channels(request_sender, response_receiver);

        (
            CmdPipeline::with_worker(worker, 8.0),
            request_receiver,
            response_sender,
        )
    }

    /// The generation of the next Interpret request in the channel.
    fn interp_generation(requests: &Receiver<WorkerRequest>) -> u64 {
        match requests.try_recv().expect("expected a request") {
            WorkerRequest::Interpret { generation, .. } => generation,
            other => panic!("expected an Interpret request, got {:?}", other),
        }
    }

    #[test]
    fn test_preset_resolves_synchronously() {
        let (mut pipeline, requests, _responses) = test_pipeline();
        let mut ds = DataStore::default();

        pipeline.exec(&mut ds, &ConsoleCmd::Preset(TrialPreset::Curl));

        assert!(!pipeline.is_busy());
        assert_eq!(ds.target_angles, TrialPreset::Curl.joint_state());
        assert!(matches!(ds.anim_input.cmd, Some(AnimCmd::SetTarget(_))));

        // Greeting + user + assistant
        assert_eq!(ds.transcript.len(), 3);
        let last = ds.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.angles, Some(TrialPreset::Curl.joint_state()));
        assert_eq!(last.confidence, Some(1.0));
        assert_eq!(ds.metrics.accuracy_pct, 100.0);

        // A derived telemetry refresh was dispatched
        assert!(matches!(
            requests.try_recv(),
            Ok(WorkerRequest::RefreshDerived { .. })
        ));
    }

    #[test]
    fn test_busy_rejects_second_submission() {
        let (mut pipeline, requests, _responses) = test_pipeline();
        let mut ds = DataStore::default();

        pipeline.exec(&mut ds, &ConsoleCmd::Raw("curl the thumb".to_string()));
        assert!(pipeline.is_busy());

        pipeline.exec(&mut ds, &ConsoleCmd::Raw("now pinch".to_string()));

        // The second submission was rejected with a system notice and no
        // second request reached the worker
        let last = ds.transcript.last().unwrap();
        assert_eq!(last.role, Role::System);

        assert!(matches!(
            requests.try_recv(),
            Ok(WorkerRequest::Interpret { .. })
        ));
        assert!(requests.try_recv().is_err());
    }

    #[test]
    fn test_success_merges_onto_target_and_clears_busy() {
        let (mut pipeline, requests, responses) = test_pipeline();
        let mut ds = DataStore::default();

        // Establish a non-zero target first
        pipeline.exec(&mut ds, &ConsoleCmd::Preset(TrialPreset::Curl));
        let _ = requests.try_recv();

        pipeline.exec(&mut ds, &ConsoleCmd::Raw("bend the tip more".to_string()));
        let generation = interp_generation(&requests);

        // The backend's actual wire shape: sparse channels + confidence
        let response: InterpResponse =
            serde_json::from_str(r#"{"IP_flex": 80.0, "confidence": 0.9}"#).unwrap();

        responses
            .send(WorkerResponse::Interpret {
                generation,
                result: Ok(response),
                elapsed_ms: 42.0,
            })
            .unwrap();

        pipeline.poll(&mut ds);

        assert!(!pipeline.is_busy());

        // Sparse response: IP updated, the rest of the curl pose retained
        assert_eq!(ds.target_angles.ip_flex, 80.0);
        assert_eq!(ds.target_angles.cmc_flex, 40.0);
        assert_eq!(ds.target_angles.mcp_flex, 60.0);

        assert_eq!(ds.metrics.response_time_ms, 42.0);
        assert!((ds.metrics.accuracy_pct - 90.0).abs() < 1e-9);

        let last = ds.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.angles.is_some());
    }

    #[test]
    fn test_failure_leaves_target_unchanged() {
        let (mut pipeline, requests, responses) = test_pipeline();
        let mut ds = DataStore::default();

        pipeline.exec(&mut ds, &ConsoleCmd::Preset(TrialPreset::Curl));
        let _ = requests.try_recv();
        let before = ds.target_angles;

        pipeline.exec(&mut ds, &ConsoleCmd::Raw("do a backflip".to_string()));
        let generation = interp_generation(&requests);

        responses
            .send(WorkerResponse::Interpret {
                generation,
                result: Err(BackendClientError::InterpretFailed(NetError::Timeout)),
                elapsed_ms: 5000.0,
            })
            .unwrap();

        pipeline.poll(&mut ds);

        assert!(!pipeline.is_busy());
        assert_eq!(ds.target_angles, before);
        assert_eq!(ds.num_consec_backend_failures, 1);

        let last = ds.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.angles.is_none());
    }

    #[test]
    fn test_reset_supersedes_in_flight_interpretation() {
        let (mut pipeline, requests, responses) = test_pipeline();
        let mut ds = DataStore::default();

        pipeline.exec(&mut ds, &ConsoleCmd::Raw("curl hard".to_string()));
        let stale_generation = interp_generation(&requests);

        pipeline.exec(&mut ds, &ConsoleCmd::Reset);

        assert!(!pipeline.is_busy());
        assert_eq!(ds.target_angles, JointState::rest());
        assert!(matches!(ds.anim_input.cmd, Some(AnimCmd::SnapTo(_))));
        assert_eq!(ds.transcript.len(), 1);

        // The stale interpretation lands after the reset and must not be
        // applied
        responses
            .send(WorkerResponse::Interpret {
                generation: stale_generation,
                result: Ok(InterpResponse {
                    angles: JointStateUpdate {
                        mcp_flex: Some(70.0),
                        ..JointStateUpdate::default()
                    },
                    confidence: None,
                }),
                elapsed_ms: 100.0,
            })
            .unwrap();

        pipeline.poll(&mut ds);

        assert_eq!(ds.target_angles, JointState::rest());
    }

    #[test]
    fn test_reset_reconcile_applies_non_zero_rest() {
        let (mut pipeline, requests, responses) = test_pipeline();
        let mut ds = DataStore::default();

        pipeline.exec(&mut ds, &ConsoleCmd::Reset);

        // The reconcile request went to the worker
        let generation = interp_generation(&requests);

        responses
            .send(WorkerResponse::Interpret {
                generation,
                result: Ok(InterpResponse {
                    angles: JointStateUpdate {
                        cmc_flex: Some(5.0),
                        ..JointStateUpdate::default()
                    },
                    confidence: None,
                }),
                elapsed_ms: 50.0,
            })
            .unwrap();

        pipeline.poll(&mut ds);

        // The console animates towards the backend's reported rest state
        assert_eq!(ds.target_angles.cmc_flex, 5.0);
        assert!(matches!(ds.anim_input.cmd, Some(AnimCmd::SetTarget(_))));
    }

    /// Drive the animation interpolator until it settles, the way the main
    /// loop does.
    fn settle(ds: &mut DataStore) {
        use util::module::State;

        let dt_s = 1.0 / 60.0;
        for _ in 0..2000 {
            ds.anim_input.dt_s = dt_s;
            let (current, report) = ds.anim_interp.proc(&ds.anim_input).unwrap();
            ds.current_angles = current;
            ds.anim_report = report;
            ds.anim_input.cmd = None;

            if report.mode == crate::anim::AnimMode::Idle && !report.converged {
                break;
            }
        }
    }

    #[test]
    fn test_rest_preset_scenario_settles_to_rest_pose() {
        let (mut pipeline, _requests, _responses) = test_pipeline();
        let mut ds = DataStore::default();

        // Curl first so rest is a real movement
        pipeline.exec(&mut ds, &ConsoleCmd::Preset(TrialPreset::Curl));
        settle(&mut ds);
        assert_eq!(ds.current_angles, TrialPreset::Curl.joint_state());

        pipeline.exec(&mut ds, &ConsoleCmd::Preset(TrialPreset::Rest));
        settle(&mut ds);

        assert_eq!(ds.current_angles, JointState::rest());

        // The settled pose is the rest pose: chain colinear up the surface
        let pose = crate::fk::compute_pose(&ds.current_angles, &ds.fk_params);
        let base = pose.base.position;
        assert!((pose.tip.position.x - base.x).abs() < 1e-9);
        assert!((pose.tip.position.z - base.z).abs() < 1e-9);
        assert!(pose.tip.position.y < base.y);
    }

    #[test]
    fn test_derived_refresh_updates_power_draw() {
        let (mut pipeline, requests, responses) = test_pipeline();
        let mut ds = DataStore::default();

        pipeline.exec(&mut ds, &ConsoleCmd::Preset(TrialPreset::Curl));

        let generation = match requests.try_recv().unwrap() {
            WorkerRequest::RefreshDerived { generation, .. } => generation,
            other => panic!("expected a RefreshDerived request, got {:?}", other),
        };

        let mut voltages = std::collections::HashMap::new();
        voltages.insert("cmc_flexor".to_string(), 4.0);

        responses
            .send(WorkerResponse::Derived {
                generation,
                forces: Ok(thumb_if::backend::ActuatorForces::default()),
                voltages: Ok(thumb_if::backend::ActuatorVoltages(voltages)),
            })
            .unwrap();

        pipeline.poll(&mut ds);

        // 16 V^2 / 8 ohm = 2 W = 2000 mW
        assert!((ds.metrics.power_draw_mw - 2000.0).abs() < 1e-9);
        assert!(ds.voltages.is_some());
        assert!(ds.forces.is_some());
    }
}
