//! # Backend Wire Types
//!
//! Request and response bodies for the three backend HTTP endpoints. All
//! bodies are JSON; joint angle responses are tolerant of missing channels
//! (absent means unchanged, see [`crate::joints::JointStateUpdate`]).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::joints::{JointState, JointStateUpdate};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Body of `POST /api/process-command`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CommandRequest {
    /// The operator's natural language command.
    pub command: String,
}

/// Body of `POST /api/compute-forces` and `POST /api/compute-voltages`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnglesRequest {
    /// The joint angles to derive actuator data for.
    pub joint_angles: JointState,
}

/// Response of `POST /api/process-command`.
///
/// The interpreter returns the channels it resolved (sparse) and, on newer
/// backend revisions, a confidence score for the interpretation.
#[derive(Deserialize, Debug, Clone)]
pub struct InterpResponse {
    /// The resolved joint angle channels.
    #[serde(flatten)]
    pub angles: JointStateUpdate,

    /// Interpretation confidence in [0, 1], if the backend reports one.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Response of `POST /api/compute-forces`: per-actuator force.
///
/// Units: newtons
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct ActuatorForces(pub HashMap<String, f64>);

/// Response of `POST /api/compute-voltages`: per-actuator drive voltage.
///
/// Units: volts
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct ActuatorVoltages(pub HashMap<String, f64>);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuatorForces {
    /// Total force magnitude over all actuators.
    ///
    /// Units: newtons
    pub fn total_n(&self) -> f64 {
        self.0.values().map(|f| f.abs()).sum()
    }
}

impl ActuatorVoltages {
    /// Total electrical power drawn across all actuators, assuming a common
    /// nominal coil resistance.
    ///
    /// Units: milliwatts
    pub fn power_draw_mw(&self, nominal_resistance_ohm: f64) -> f64 {
        self.0
            .values()
            .map(|v| v * v / nominal_resistance_ohm)
            .sum::<f64>()
            * 1000.0
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_interp_response_parse() {
        let json = r#"{"CMC_flex": 30.0, "CMC_abd": 25.0, "CMC_opp": 35.0, "confidence": 0.9}"#;
        let resp: InterpResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.angles.cmc_flex, Some(30.0));
        assert_eq!(resp.angles.mcp_flex, None);
        assert_eq!(resp.confidence, Some(0.9));
    }

    #[test]
    fn test_interp_response_without_confidence() {
        let json = r#"{"IP_flex": 45.0}"#;
        let resp: InterpResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.angles.ip_flex, Some(45.0));
        assert_eq!(resp.confidence, None);
    }

    #[test]
    fn test_voltages_power_draw() {
        let mut map = HashMap::new();
        map.insert("cmc_flexor".to_string(), 2.0);
        map.insert("mcp_flexor".to_string(), 1.0);
        let voltages = ActuatorVoltages(map);

        // (4 + 1) / 10 ohm = 0.5 W = 500 mW
        assert!((voltages.power_draw_mw(10.0) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_angles_request_wire_shape() {
        let req = AnglesRequest {
            joint_angles: JointState {
                cmc_flex: 40.0,
                ..JointState::rest()
            },
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["joint_angles"]["CMC_flex"], 40.0);
    }
}
