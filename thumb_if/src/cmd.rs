//! # Console Command Module
//!
//! This module defines the commands an operator (or a trial script) can issue
//! to the console, and the named trial presets which resolve to a joint state
//! without a round trip to the backend interpreter.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::joints::JointState;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command issued to the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConsoleCmd {
    /// Return the thumb to rest, clear the transcript, and re-zero the
    /// backend interpreter's pose memory.
    Reset,

    /// Move to a named trial preset.
    Preset(TrialPreset),

    /// A natural language command, to be resolved by the backend interpreter.
    Raw(String),
}

/// Named trial poses.
///
/// Each preset is a constant joint state defined at process start. Values are
/// the calibrated trial poses of the backend interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialPreset {
    Rest,
    Curl,
    Pinch,
    ThumbsUp,
    Opposition,
    PowerGrip,
    FullExtension,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum CmdParseError {
    #[error("The command is empty")]
    EmptyCommand,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ConsoleCmd {
    /// Parse a console command from a line of input.
    ///
    /// `reset` resolves to [`ConsoleCmd::Reset`], a known preset name (case
    /// insensitive) resolves to that preset, and anything else is raw natural
    /// language for the backend interpreter. Only an empty line is an error.
    pub fn from_line(line: &str) -> Result<Self, CmdParseError> {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return Err(CmdParseError::EmptyCommand);
        }

        if trimmed.eq_ignore_ascii_case("reset") {
            return Ok(ConsoleCmd::Reset);
        }

        match TrialPreset::from_name(trimmed) {
            Some(preset) => Ok(ConsoleCmd::Preset(preset)),
            None => Ok(ConsoleCmd::Raw(trimmed.to_string())),
        }
    }
}

impl TrialPreset {
    /// All presets available to the console.
    pub const ALL: [TrialPreset; 7] = [
        TrialPreset::Rest,
        TrialPreset::Curl,
        TrialPreset::Pinch,
        TrialPreset::ThumbsUp,
        TrialPreset::Opposition,
        TrialPreset::PowerGrip,
        TrialPreset::FullExtension,
    ];

    /// The preset's display name.
    pub fn name(&self) -> &'static str {
        match self {
            TrialPreset::Rest => "rest",
            TrialPreset::Curl => "curl",
            TrialPreset::Pinch => "pinch",
            TrialPreset::ThumbsUp => "thumbs_up",
            TrialPreset::Opposition => "opposition",
            TrialPreset::PowerGrip => "power_grip",
            TrialPreset::FullExtension => "full_extension",
        }
    }

    /// Look a preset up by name, case insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();

        Self::ALL
            .iter()
            .find(|p| p.name() == lower)
            .copied()
    }

    /// The joint state this preset resolves to.
    pub fn joint_state(&self) -> JointState {
        match self {
            TrialPreset::Rest => JointState::rest(),
            TrialPreset::Curl => JointState {
                cmc_flex: 40.0,
                mcp_flex: 60.0,
                ip_flex: 60.0,
                ..JointState::rest()
            },
            TrialPreset::Pinch => JointState {
                cmc_flex: 30.0,
                cmc_abd: 20.0,
                cmc_opp: 25.0,
                mcp_flex: 40.0,
                ip_flex: 50.0,
                ..JointState::rest()
            },
            TrialPreset::ThumbsUp => JointState {
                cmc_abd: 30.0,
                ..JointState::rest()
            },
            TrialPreset::Opposition => JointState {
                cmc_flex: 30.0,
                cmc_abd: 25.0,
                cmc_opp: 35.0,
                ..JointState::rest()
            },
            TrialPreset::PowerGrip => JointState {
                cmc_flex: 60.0,
                cmc_abd: 10.0,
                cmc_opp: 15.0,
                mcp_flex: 70.0,
                ip_flex: 60.0,
                ..JointState::rest()
            },
            TrialPreset::FullExtension => JointState {
                cmc_ext: 20.0,
                mcp_ext: 25.0,
                ip_flex: 30.0,
                ip_ext: 15.0,
                ..JointState::rest()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_reset() {
        assert_eq!(ConsoleCmd::from_line("reset").unwrap(), ConsoleCmd::Reset);
        assert_eq!(ConsoleCmd::from_line(" RESET ").unwrap(), ConsoleCmd::Reset);
    }

    #[test]
    fn test_parse_preset() {
        assert_eq!(
            ConsoleCmd::from_line("curl").unwrap(),
            ConsoleCmd::Preset(TrialPreset::Curl)
        );
        assert_eq!(
            ConsoleCmd::from_line("Thumbs_Up").unwrap(),
            ConsoleCmd::Preset(TrialPreset::ThumbsUp)
        );
    }

    #[test]
    fn test_parse_raw_command() {
        assert_eq!(
            ConsoleCmd::from_line("flex the thumb 30 degrees").unwrap(),
            ConsoleCmd::Raw("flex the thumb 30 degrees".to_string())
        );
    }

    #[test]
    fn test_parse_empty_rejected() {
        assert!(matches!(
            ConsoleCmd::from_line("   "),
            Err(CmdParseError::EmptyCommand)
        ));
    }

    #[test]
    fn test_preset_values() {
        let curl = TrialPreset::Curl.joint_state();
        assert_eq!(curl.cmc_flex, 40.0);
        assert_eq!(curl.mcp_flex, 60.0);
        assert_eq!(curl.ip_flex, 60.0);
        assert_eq!(curl.cmc_ext, 0.0);

        assert_eq!(TrialPreset::Rest.joint_state(), JointState::rest());
    }

    #[test]
    fn test_preset_round_trip_names() {
        for preset in TrialPreset::ALL.iter() {
            assert_eq!(TrialPreset::from_name(preset.name()), Some(*preset));
        }
    }
}
