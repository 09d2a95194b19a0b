//! Main console executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Command acquisition:
//!             - Interactive operator prompt, or
//!             - Trial script replay
//!         - Command pipeline processing (dispatch + backend responses)
//!         - Animation interpolator processing
//!         - Forward kinematics projection
//!         - Archive writing
//!
//! # Modules
//!
//! All cyclic modules (e.g. `anim`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use console_lib::{
    anim::AnimMode,
    cmd_pipeline::CmdPipeline,
    console_input::{ConsoleEvent, ConsoleInput},
    data_store::DataStore,
    fk,
    params::ConsoleExecParams,
    transcript::{Role, Transcript},
    CYCLE_FREQUENCY_HZ, CYCLE_PERIOD_S,
};
use thumb_if::{cmd::ConsoleCmd, net::NetParams};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    raise_error,
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("console_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Thumb Operator Console\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let exec_params: ConsoleExecParams =
        util::params::load("console_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE COMMAND SOURCE ----

    // The command source determines whether we're getting commands from a
    // trial script or from the interactive operator prompt.
    let mut cmd_source = CmdSource::None;

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    if args.len() == 2 {
        info!("Loading trial script from \"{}\"", &args[1]);

        // Load the script interpreter
        let si = ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

        // Display some info
        info!(
            "Loaded script lasts {:.02} s and contains {} commands\n",
            si.get_duration(),
            si.get_num_cmds()
        );

        // Set the interpreter in the source
        cmd_source = CmdSource::Script(si);
    }
    // If no arguments then setup the interactive prompt
    else if args.len() == 1 {
        info!("No script provided, the interactive operator prompt will be used\n");

        cmd_source = CmdSource::Interactive(ConsoleInput::new());
    } else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    }

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    ds.transcript = Transcript::new(exec_params.transcript_max_entries);

    ds.fk_params = util::params::load("fk.toml").wrap_err("Could not load FK params")?;

    // ---- INITIALISE MODULES ----

    ds.anim_interp
        .init("anim.toml", &session)
        .wrap_err("Failed to initialise AnimInterp")?;
    info!("AnimInterp init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE PIPELINE ----

    let mut pipeline = CmdPipeline::new(&net_params, &exec_params);

    info!("Command pipeline and backend worker initialised");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_cycle_start = Instant::now();
    let mut last_anim_mode = AnimMode::Idle;
    let mut end_of_script = false;

    'main: loop {
        // Get cycle start time and the delta since the previous cycle
        let cycle_start_instant = Instant::now();
        let dt_s = (cycle_start_instant - last_cycle_start).as_secs_f64();
        last_cycle_start = cycle_start_instant;

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ, dt_s);

        // ---- COMMAND PROCESSING ----

        // Branch depending on the source
        match cmd_source {
            // If no source no point in continuing so break
            CmdSource::None => raise_error!("No command source present"),

            CmdSource::Interactive(ref input) => {
                // Drain all lines the operator entered since the last cycle
                while let Some(event) = input.try_get_event() {
                    match event {
                        ConsoleEvent::Line(line) => match ConsoleCmd::from_line(&line) {
                            Ok(cmd) => pipeline.exec(&mut ds, &cmd),
                            // Empty lines are not commands
                            Err(_) => (),
                        },
                        ConsoleEvent::Quit => {
                            info!("Operator requested shutdown");
                            break 'main;
                        }
                    }
                }
            }

            CmdSource::Script(ref mut si) => match si.get_pending_cmds() {
                PendingCmds::None => (),
                PendingCmds::Some(cmd_vec) => {
                    for cmd in cmd_vec.iter() {
                        pipeline.exec(&mut ds, cmd);
                    }
                }
                // Exit once the script is done and the thumb has settled
                PendingCmds::EndOfScript => {
                    end_of_script = true;
                }
            },
        };

        // ---- BACKEND RESPONSE PROCESSING ----

        pipeline.poll(&mut ds);

        // ---- ANIMATION PROCESSING ----

        match ds.anim_interp.proc(&ds.anim_input) {
            Ok((current, report)) => {
                ds.current_angles = current;
                ds.anim_report = report;
            }
            Err(e) => {
                // AnimInterp errors mean a bad cycle delta, skip the cycle
                warn!("Error during AnimInterp processing: {}", e)
            }
        };

        if ds.anim_report.timed_out {
            ds.transcript.push(
                Role::System,
                "Animation timed out before convergence, pose forced to target.",
                None,
                None,
            );
        }

        // Surface mode transitions to the operator
        if ds.anim_report.mode != last_anim_mode {
            match ds.anim_report.mode {
                AnimMode::Animating => info!("ACTUATING"),
                AnimMode::Idle => info!("IDLE"),
            }
            last_anim_mode = ds.anim_report.mode;
        }

        // ---- KINEMATICS ----

        // The pose is recomputed fresh every cycle from the current angles
        ds.pose = Some(fk::compute_pose(&ds.current_angles, &ds.fk_params));

        if ds.anim_report.converged {
            if let Some(ref pose) = ds.pose {
                let screen = pose.project(&ds.fk_params);
                info!(
                    "Pose settled, tip at ({:.1}, {:.1})",
                    screen.points[3].x, screen.points[3].y
                );
            }
        }

        // ---- WRITE ARCHIVES ----

        if ds.is_1_hz_cycle {
            if let Err(e) = ds.anim_interp.write() {
                warn!("Could not write archives: {}", e);
            }
        }

        // ---- SCRIPT TERMINATION ----

        if end_of_script && !pipeline.is_busy() && ds.anim_report.mode == AnimMode::Idle {
            info!("End of trial script reached, stopping");
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    // Keep the final transcript with the session
    session.save("transcript/final_transcript.json", ds.transcript.snapshot());

    info!("End of execution");

    session.exit();

    Ok(())
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the commands incoming to the exec.
#[allow(dead_code)]
enum CmdSource {
    None,
    Interactive(ConsoleInput),
    Script(ScriptInterpreter),
}
