//! # Trial script interpreter module
//!
//! This module provides an interpreter for console trial scripts, allowing
//! timed sequences of console commands (presets, natural language, resets) to
//! be replayed against the session clock without an operator at the prompt.
//!
//! Script format is one command per line:
//!
//! ```text
//! 0.0: curl;
//! 5.0: flex the thumb a little more;
//! 12.5: reset;
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;
use thumb_if::cmd::{CmdParseError, ConsoleCmd};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
pub struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The console command to run
    cmd: ConsoleCmd,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_cmds` to acquire a list of commands that need executing.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, CmdParseError),
}

pub enum PendingCmds {
    None,
    Some(Vec<ConsoleCmd>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_str().unwrap_or("<non-utf8 path>").to_string(),
            ));
        }

        // Load the script into a string
        let script = match fs::read_to_string(script_path) {
            Ok(s) => s,
            Err(e) => return Err(ScriptError::ScriptLoadError(e)),
        };

        // Empty queue of commands
        let mut cmd_queue: VecDeque<Command> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .unwrap();

        let mut num_caps = 0;

        for cap in re.captures_iter(&script) {
            // Parse the exec time
            let exec_time_s: f64 = match cap.get(1).unwrap().as_str().parse() {
                Ok(t) => t,
                Err(e) => return Err(ScriptError::InvalidTimestamp(format!("{}", e))),
            };

            // Parse the command from the payload
            let cmd = match ConsoleCmd::from_line(cap.get(3).unwrap().as_str()) {
                Ok(c) => c,
                Err(e) => return Err(ScriptError::InvalidCmd(exec_time_s, e)),
            };

            // Build command from the match
            cmd_queue.push_back(Command { exec_time_s, cmd });

            num_caps += 1;
        }

        if num_caps == 0 {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            _script_path: path,
            cmds: cmd_queue,
        })
    }

    /// Return a vector of pending commands, or `None` if no commands need
    /// executing now.
    pub fn get_pending_cmds(&mut self) -> PendingCmds {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript;
        }

        let mut cmd_vec: Vec<ConsoleCmd> = vec![];

        let current_time_s = get_elapsed_seconds();

        // Peek items from the queue, if the head's exec time is lower than
        // the current time add it to the vector, and keep adding commands
        // until the exec times are larger than the current time.
        while self.cmds.len() > 0 && self.cmds.front().unwrap().exec_time_s < current_time_s {
            cmd_vec.push(self.cmds.pop_front().unwrap().cmd);
        }

        // If the vector is longer than 0 return Some, otherwise None
        if cmd_vec.len() > 0 {
            PendingCmds::Some(cmd_vec)
        } else {
            PendingCmds::None
        }
    }

    /// Get the number of commands in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    /// Write a script to a temp file and parse it back.
    fn interpreter_from(name: &str, script: &str) -> Result<ScriptInterpreter, ScriptError> {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}.prs", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(script.as_bytes()).unwrap();
        ScriptInterpreter::new(&path)
    }

    #[test]
    fn test_parse_script() {
        let si = interpreter_from(
            "trial_script_parse",
            "0.0: curl;\n\
             5.0: flex the thumb 30 degrees;\n\
             12.5: reset;\n",
        )
        .unwrap();

        assert_eq!(si.get_num_cmds(), 3);
        assert_eq!(si.get_duration(), 12.5);
    }

    #[test]
    fn test_empty_script_rejected() {
        assert!(matches!(
            interpreter_from("trial_script_empty", "this is not a script"),
            Err(ScriptError::ScriptEmpty)
        ));
    }
}
