//! # Backend Client
//!
//! This module provides the client used to talk to the remote thumb backend
//! services: command interpretation, force estimation and voltage estimation.
//! All calls are blocking and bounded by the timeouts in the network
//! parameters; the console drives this client from a worker thread so the
//! main loop never stalls on the network.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use thumb_if::{
    backend::{ActuatorForces, ActuatorVoltages, AnglesRequest, CommandRequest, InterpResponse},
    joints::JointState,
    net::{JsonClient, NetError, NetParams},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct BackendClient {
    client: JsonClient,

    params: NetParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum BackendClientError {
    #[error("Could not interpret the command: {0}")]
    InterpretFailed(NetError),

    #[error("Could not compute actuator forces: {0}")]
    ForcesFailed(NetError),

    #[error("Could not compute actuator voltages: {0}")]
    VoltagesFailed(NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BackendClient {
    /// Create a new instance of the backend client.
    pub fn new(params: &NetParams) -> Self {
        Self {
            client: JsonClient::new(params),
            params: params.clone(),
        }
    }

    /// Ask the interpretation service to resolve a natural language command
    /// into joint angles.
    ///
    /// Blocks for up to the configured request timeout.
    pub fn process_command(&self, command: &str) -> Result<InterpResponse, BackendClientError> {
        self.client
            .post_json(
                &self.params.process_command_endpoint,
                &CommandRequest {
                    command: command.to_string(),
                },
            )
            .map_err(BackendClientError::InterpretFailed)
    }

    /// Ask the force estimation service for per-actuator forces at the given
    /// joint angles.
    pub fn compute_forces(&self, angles: &JointState) -> Result<ActuatorForces, BackendClientError> {
        self.client
            .post_json(
                &self.params.compute_forces_endpoint,
                &AnglesRequest {
                    joint_angles: *angles,
                },
            )
            .map_err(BackendClientError::ForcesFailed)
    }

    /// Ask the voltage estimation service for per-actuator drive voltages at
    /// the given joint angles.
    pub fn compute_voltages(
        &self,
        angles: &JointState,
    ) -> Result<ActuatorVoltages, BackendClientError> {
        self.client
            .post_json(
                &self.params.compute_voltages_endpoint,
                &AnglesRequest {
                    joint_angles: *angles,
                },
            )
            .map_err(BackendClientError::VoltagesFailed)
    }
}
