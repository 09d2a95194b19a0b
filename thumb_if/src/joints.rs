//! # Joint State Model
//!
//! The thumb is driven by 10 antagonistic soft actuator channels grouped into
//! three joints (CMC, MCP, IP). Each channel carries a non-negative angle
//! magnitude in degrees; the net motion of a joint axis is the difference
//! between the two members of its antagonist pair (e.g. `CMC_flex - CMC_ext`).
//!
//! Channel magnitudes are hard-clamped into [`CHANNEL_DOMAIN_DEG`] on every
//! construction path. Anatomical per-channel limits and antagonist
//! exclusivity are applied separately by [`JointState::apply_limits`] so that
//! callers can report limited channels as data-quality warnings.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of actuator channels on the thumb.
pub const NUM_ACT_CHANNELS: usize = 10;

/// The number of antagonist channel pairs.
pub const NUM_ANTAGONIST_PAIRS: usize = 5;

/// Hard domain for any channel magnitude. Values outside this range are
/// clamped and reported as data-quality warnings, never as fatal errors.
///
/// Units: degrees
pub const CHANNEL_DOMAIN_DEG: (f64, f64) = (0.0, 180.0);

/// Antagonist channel pairs, primary (flexion-like) channel first.
pub const ANTAGONIST_PAIRS: [(ActChannel, ActChannel); NUM_ANTAGONIST_PAIRS] = [
    (ActChannel::CmcFlex, ActChannel::CmcExt),
    (ActChannel::CmcAbd, ActChannel::CmcAdd),
    (ActChannel::CmcOpp, ActChannel::CmcRep),
    (ActChannel::McpFlex, ActChannel::McpExt),
    (ActChannel::IpFlex, ActChannel::IpExt),
];

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all actuator channels on the thumb.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ActChannel {
    CmcFlex,
    CmcExt,
    CmcAbd,
    CmcAdd,
    CmcOpp,
    CmcRep,
    McpFlex,
    McpExt,
    IpFlex,
    IpExt,
}

/// Joint axes with a derivable net angle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JointAxis {
    /// CMC flexion/extension
    CmcFlex,
    /// CMC abduction/adduction
    CmcAbd,
    /// CMC opposition/reposition
    CmcOpp,
    /// MCP flexion/extension
    McpFlex,
    /// IP flexion/extension
    IpFlex,
}

/// Possible errors raised when validating joint state data.
#[derive(Debug, thiserror::Error)]
pub enum JointStateError {
    #[error("Channel {0} has a non-finite value")]
    NonFiniteValue(ActChannel),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The canonical 10-channel actuator angle vector.
///
/// Field names follow the backend wire contract (`CMC_flex` etc.) through
/// serde renames. All values are magnitudes in degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct JointState {
    #[serde(rename = "CMC_flex")]
    pub cmc_flex: f64,
    #[serde(rename = "CMC_ext")]
    pub cmc_ext: f64,
    #[serde(rename = "CMC_abd")]
    pub cmc_abd: f64,
    #[serde(rename = "CMC_add")]
    pub cmc_add: f64,
    #[serde(rename = "CMC_opp")]
    pub cmc_opp: f64,
    #[serde(rename = "CMC_rep")]
    pub cmc_rep: f64,
    #[serde(rename = "MCP_flex")]
    pub mcp_flex: f64,
    #[serde(rename = "MCP_ext")]
    pub mcp_ext: f64,
    #[serde(rename = "IP_flex")]
    pub ip_flex: f64,
    #[serde(rename = "IP_ext")]
    pub ip_ext: f64,
}

/// A sparse joint state as reported by the backend interpreter.
///
/// Channels absent from the response are `None` and retain their prior value
/// when merged onto a base state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct JointStateUpdate {
    #[serde(rename = "CMC_flex")]
    pub cmc_flex: Option<f64>,
    #[serde(rename = "CMC_ext")]
    pub cmc_ext: Option<f64>,
    #[serde(rename = "CMC_abd")]
    pub cmc_abd: Option<f64>,
    #[serde(rename = "CMC_add")]
    pub cmc_add: Option<f64>,
    #[serde(rename = "CMC_opp")]
    pub cmc_opp: Option<f64>,
    #[serde(rename = "CMC_rep")]
    pub cmc_rep: Option<f64>,
    #[serde(rename = "MCP_flex")]
    pub mcp_flex: Option<f64>,
    #[serde(rename = "MCP_ext")]
    pub mcp_ext: Option<f64>,
    #[serde(rename = "IP_flex")]
    pub ip_flex: Option<f64>,
    #[serde(rename = "IP_ext")]
    pub ip_ext: Option<f64>,
}

/// Net angles derived from a [`JointState`], consumed by the kinematics.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct NetAngles {
    /// Net CMC flexion (`CMC_flex - CMC_ext`), degrees
    pub cmc_flex_net: f64,

    /// Net CMC abduction (`CMC_abd - CMC_add`), degrees
    pub cmc_abd_net: f64,

    /// Net CMC opposition (`CMC_opp - CMC_rep`), degrees
    pub cmc_opp_net: f64,

    /// Net MCP flexion (`MCP_flex - MCP_ext`), degrees
    pub mcp_flex_net: f64,

    /// Net IP flexion (`IP_flex - IP_ext`), degrees
    pub ip_flex_net: f64,
}

/// Report on which channels were modified by [`JointState::apply_limits`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitReport {
    /// Channels clamped into their anatomical range
    pub limited: [bool; NUM_ACT_CHANNELS],

    /// Antagonist pairs where both channels were active and the antagonist
    /// was zeroed
    pub exclusivity_resolved: [bool; NUM_ANTAGONIST_PAIRS],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActChannel {
    /// All channels, proximal to distal, primary channel of each pair first.
    pub const ALL: [ActChannel; NUM_ACT_CHANNELS] = [
        ActChannel::CmcFlex,
        ActChannel::CmcExt,
        ActChannel::CmcAbd,
        ActChannel::CmcAdd,
        ActChannel::CmcOpp,
        ActChannel::CmcRep,
        ActChannel::McpFlex,
        ActChannel::McpExt,
        ActChannel::IpFlex,
        ActChannel::IpExt,
    ];

    /// The channel's name on the backend wire contract.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ActChannel::CmcFlex => "CMC_flex",
            ActChannel::CmcExt => "CMC_ext",
            ActChannel::CmcAbd => "CMC_abd",
            ActChannel::CmcAdd => "CMC_add",
            ActChannel::CmcOpp => "CMC_opp",
            ActChannel::CmcRep => "CMC_rep",
            ActChannel::McpFlex => "MCP_flex",
            ActChannel::McpExt => "MCP_ext",
            ActChannel::IpFlex => "IP_flex",
            ActChannel::IpExt => "IP_ext",
        }
    }

    /// The channel's anatomical range.
    ///
    /// Units: degrees
    pub fn limit_deg(&self) -> (f64, f64) {
        match self {
            ActChannel::CmcFlex => (0.0, 90.0),
            ActChannel::CmcExt => (0.0, 20.0),
            ActChannel::CmcAbd => (0.0, 30.0),
            ActChannel::CmcAdd => (0.0, 30.0),
            ActChannel::CmcOpp => (0.0, 45.0),
            ActChannel::CmcRep => (0.0, 45.0),
            ActChannel::McpFlex => (0.0, 90.0),
            ActChannel::McpExt => (0.0, 25.0),
            ActChannel::IpFlex => (0.0, 90.0),
            ActChannel::IpExt => (0.0, 15.0),
        }
    }
}

impl fmt::Display for ActChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl JointState {
    /// The all-zero rest state.
    pub fn rest() -> Self {
        Self::default()
    }

    /// Get the magnitude of a channel.
    pub fn channel(&self, id: ActChannel) -> f64 {
        match id {
            ActChannel::CmcFlex => self.cmc_flex,
            ActChannel::CmcExt => self.cmc_ext,
            ActChannel::CmcAbd => self.cmc_abd,
            ActChannel::CmcAdd => self.cmc_add,
            ActChannel::CmcOpp => self.cmc_opp,
            ActChannel::CmcRep => self.cmc_rep,
            ActChannel::McpFlex => self.mcp_flex,
            ActChannel::McpExt => self.mcp_ext,
            ActChannel::IpFlex => self.ip_flex,
            ActChannel::IpExt => self.ip_ext,
        }
    }

    /// Set the magnitude of a channel.
    pub fn set_channel(&mut self, id: ActChannel, value_deg: f64) {
        match id {
            ActChannel::CmcFlex => self.cmc_flex = value_deg,
            ActChannel::CmcExt => self.cmc_ext = value_deg,
            ActChannel::CmcAbd => self.cmc_abd = value_deg,
            ActChannel::CmcAdd => self.cmc_add = value_deg,
            ActChannel::CmcOpp => self.cmc_opp = value_deg,
            ActChannel::CmcRep => self.cmc_rep = value_deg,
            ActChannel::McpFlex => self.mcp_flex = value_deg,
            ActChannel::McpExt => self.mcp_ext = value_deg,
            ActChannel::IpFlex => self.ip_flex = value_deg,
            ActChannel::IpExt => self.ip_ext = value_deg,
        }
    }

    /// Clamp every channel into [`CHANNEL_DOMAIN_DEG`].
    ///
    /// Returns `true` if any channel had to be clamped. Clamped channels are
    /// logged as warnings, out-of-domain input is a data-quality issue rather
    /// than a fault.
    pub fn clamp_to_domain(&mut self) -> bool {
        let (min, max) = CHANNEL_DOMAIN_DEG;
        let mut any_clamped = false;

        for id in ActChannel::ALL.iter() {
            let value = self.channel(*id);
            if value < min || value > max {
                warn!(
                    "Channel {} is outside [{}, {}] deg (got {}), clamping",
                    id, min, max, value
                );
                self.set_channel(*id, clamp_f64(value, min, max));
                any_clamped = true;
            }
        }

        any_clamped
    }

    /// Get the net angle of a joint axis.
    ///
    /// Units: degrees. May be negative (net extension/adduction/reposition).
    pub fn net_angle(&self, axis: JointAxis) -> f64 {
        match axis {
            JointAxis::CmcFlex => self.cmc_flex - self.cmc_ext,
            JointAxis::CmcAbd => self.cmc_abd - self.cmc_add,
            JointAxis::CmcOpp => self.cmc_opp - self.cmc_rep,
            JointAxis::McpFlex => self.mcp_flex - self.mcp_ext,
            JointAxis::IpFlex => self.ip_flex - self.ip_ext,
        }
    }

    /// Produce a new state with any channel present in `update` overriding
    /// this state's value, all other channels retained.
    ///
    /// The merged state is clamped into the channel domain.
    pub fn merge(&self, update: &JointStateUpdate) -> JointState {
        let mut merged = *self;

        for id in ActChannel::ALL.iter() {
            if let Some(value) = update.channel(*id) {
                merged.set_channel(*id, value);
            }
        }

        merged.clamp_to_domain();

        merged
    }

    /// Clamp every channel into its anatomical range and resolve antagonist
    /// exclusivity (both members of a pair active is a contradiction - the
    /// primary channel wins and the antagonist is zeroed).
    ///
    /// Returns a report of every modification made.
    pub fn apply_limits(&mut self) -> LimitReport {
        let mut report = LimitReport::default();

        for (i, id) in ActChannel::ALL.iter().enumerate() {
            let (min, max) = id.limit_deg();
            let value = self.channel(*id);

            if value < min || value > max {
                self.set_channel(*id, clamp_f64(value, min, max));
                report.limited[i] = true;
            }
        }

        for (i, (primary, antagonist)) in ANTAGONIST_PAIRS.iter().enumerate() {
            if self.channel(*primary) > 0.0 && self.channel(*antagonist) > 0.0 {
                self.set_channel(*antagonist, 0.0);
                report.exclusivity_resolved[i] = true;
            }
        }

        report
    }

    /// The maximum absolute per-channel difference to another state.
    ///
    /// Units: degrees
    pub fn max_abs_diff(&self, other: &JointState) -> f64 {
        ActChannel::ALL
            .iter()
            .map(|id| (self.channel(*id) - other.channel(*id)).abs())
            .fold(0.0, f64::max)
    }
}

impl JointStateUpdate {
    /// Get the updated magnitude of a channel, if present.
    pub fn channel(&self, id: ActChannel) -> Option<f64> {
        match id {
            ActChannel::CmcFlex => self.cmc_flex,
            ActChannel::CmcExt => self.cmc_ext,
            ActChannel::CmcAbd => self.cmc_abd,
            ActChannel::CmcAdd => self.cmc_add,
            ActChannel::CmcOpp => self.cmc_opp,
            ActChannel::CmcRep => self.cmc_rep,
            ActChannel::McpFlex => self.mcp_flex,
            ActChannel::McpExt => self.mcp_ext,
            ActChannel::IpFlex => self.ip_flex,
            ActChannel::IpExt => self.ip_ext,
        }
    }

    /// Check every present channel carries a finite value.
    ///
    /// Non-finite values cannot be clamped meaningfully and reject the whole
    /// update.
    pub fn validate(&self) -> Result<(), JointStateError> {
        for id in ActChannel::ALL.iter() {
            if let Some(value) = self.channel(*id) {
                if !value.is_finite() {
                    return Err(JointStateError::NonFiniteValue(*id));
                }
            }
        }

        Ok(())
    }
}

impl NetAngles {
    /// Derive the net angles from a joint state.
    pub fn from_state(state: &JointState) -> Self {
        Self {
            cmc_flex_net: state.net_angle(JointAxis::CmcFlex),
            cmc_abd_net: state.net_angle(JointAxis::CmcAbd),
            cmc_opp_net: state.net_angle(JointAxis::CmcOpp),
            mcp_flex_net: state.net_angle(JointAxis::McpFlex),
            ip_flex_net: state.net_angle(JointAxis::IpFlex),
        }
    }
}

impl LimitReport {
    /// True if any channel was limited or any pair resolved.
    pub fn any(&self) -> bool {
        self.limited.iter().any(|l| *l) || self.exclusivity_resolved.iter().any(|e| *e)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Clamp without pulling the maths utilities into the interface crate.
pub(crate) fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp_to_domain() {
        let mut state = JointState {
            cmc_flex: -10.0,
            ip_flex: 200.0,
            ..JointState::rest()
        };

        assert!(state.clamp_to_domain());
        assert_eq!(state.cmc_flex, 0.0);
        assert_eq!(state.ip_flex, 180.0);

        // A second pass has nothing left to clamp
        assert!(!state.clamp_to_domain());
    }

    #[test]
    fn test_net_angles() {
        let state = JointState {
            cmc_flex: 30.0,
            cmc_ext: 10.0,
            cmc_abd: 5.0,
            cmc_add: 15.0,
            cmc_opp: 20.0,
            mcp_flex: 40.0,
            ip_flex: 50.0,
            ip_ext: 15.0,
            ..JointState::rest()
        };

        assert_eq!(state.net_angle(JointAxis::CmcFlex), 20.0);
        assert_eq!(state.net_angle(JointAxis::CmcAbd), -10.0);
        assert_eq!(state.net_angle(JointAxis::CmcOpp), 20.0);
        assert_eq!(state.net_angle(JointAxis::McpFlex), 40.0);
        assert_eq!(state.net_angle(JointAxis::IpFlex), 35.0);

        let net = NetAngles::from_state(&state);
        assert_eq!(net.cmc_flex_net, 20.0);
        assert_eq!(net.cmc_abd_net, -10.0);
    }

    #[test]
    fn test_merge_overrides_present_channels_only() {
        let base = JointState {
            cmc_flex: 30.0,
            mcp_flex: 40.0,
            ..JointState::rest()
        };

        let update = JointStateUpdate {
            mcp_flex: Some(70.0),
            ip_flex: Some(20.0),
            ..JointStateUpdate::default()
        };

        let merged = base.merge(&update);

        assert_eq!(merged.cmc_flex, 30.0);
        assert_eq!(merged.mcp_flex, 70.0);
        assert_eq!(merged.ip_flex, 20.0);
    }

    #[test]
    fn test_merge_clamps() {
        let update = JointStateUpdate {
            cmc_flex: Some(-45.0),
            ..JointStateUpdate::default()
        };

        let merged = JointState::rest().merge(&update);
        assert_eq!(merged.cmc_flex, 0.0);
    }

    #[test]
    fn test_apply_limits_clamps_to_anatomical_range() {
        let mut state = JointState {
            cmc_ext: 45.0,
            ip_ext: 20.0,
            ..JointState::rest()
        };

        let report = state.apply_limits();

        assert_eq!(state.cmc_ext, 20.0);
        assert_eq!(state.ip_ext, 15.0);
        assert!(report.any());
    }

    #[test]
    fn test_apply_limits_resolves_antagonists() {
        let mut state = JointState {
            cmc_flex: 40.0,
            cmc_ext: 10.0,
            ..JointState::rest()
        };

        let report = state.apply_limits();

        // The primary (flexion) channel wins, the antagonist is zeroed
        assert_eq!(state.cmc_flex, 40.0);
        assert_eq!(state.cmc_ext, 0.0);
        assert!(report.exclusivity_resolved[0]);
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let update = JointStateUpdate {
            mcp_flex: Some(f64::NAN),
            ..JointStateUpdate::default()
        };

        assert!(matches!(
            update.validate(),
            Err(JointStateError::NonFiniteValue(ActChannel::McpFlex))
        ));
    }

    #[test]
    fn test_max_abs_diff() {
        let a = JointState {
            cmc_flex: 10.0,
            ip_flex: 50.0,
            ..JointState::rest()
        };
        let b = JointState {
            cmc_flex: 15.0,
            ip_flex: 30.0,
            ..JointState::rest()
        };

        assert_eq!(a.max_abs_diff(&b), 20.0);
        assert_eq!(b.max_abs_diff(&a), 20.0);
        assert_eq!(a.max_abs_diff(&a), 0.0);
    }

    #[test]
    fn test_wire_names_round_trip() {
        let json = r#"{"CMC_flex": 40.0, "MCP_flex": 60.0, "IP_flex": 60.0}"#;
        let update: JointStateUpdate = serde_json::from_str(json).unwrap();

        assert_eq!(update.cmc_flex, Some(40.0));
        assert_eq!(update.mcp_flex, Some(60.0));
        assert_eq!(update.cmc_ext, None);

        let state = JointState::rest().merge(&update);
        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back["CMC_flex"], 40.0);
        assert_eq!(back["IP_ext"], 0.0);
    }
}
