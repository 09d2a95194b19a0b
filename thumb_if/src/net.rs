//! # Network Module
//!
//! This module provides the HTTP/JSON networking abstractions used to talk to
//! the backend services. All backend endpoints are simple `POST` + JSON
//! request/response pairs, bounded by the timeouts configured in
//! [`NetParams`]; a request that outlives its timeout is aborted and surfaced
//! as [`NetError::Timeout`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters for the console's backend connections.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NetParams {
    /// Endpoint URL for the command interpretation service
    pub process_command_endpoint: String,

    /// Endpoint URL for the force estimation service
    pub compute_forces_endpoint: String,

    /// Endpoint URL for the voltage estimation service
    pub compute_voltages_endpoint: String,

    /// Maximum time a whole request/response exchange may take.
    ///
    /// Units: milliseconds
    pub request_timeout_ms: u64,

    /// Maximum time to wait for the TCP connection to be established.
    ///
    /// Units: milliseconds
    pub connect_timeout_ms: u64,
}

/// A JSON-over-HTTP client with bounded timeouts.
///
/// Wraps a [`ureq::Agent`] configured from [`NetParams`]. The client is
/// blocking, callers which must not stall (the console's main loop) shall
/// drive it from a worker thread.
pub struct JsonClient {
    agent: ureq::Agent,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when exchanging JSON with a backend endpoint.
#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not reach the backend: {0}")]
    NotReachable(String),

    #[error("The request timed out")]
    Timeout,

    #[error("The backend returned status {0}")]
    BadStatus(u16),

    #[error("Could not serialize the request: {0}")]
    SerializeError(serde_json::Error),

    #[error("Could not deserialize the response from the backend: {0}")]
    DeserializeError(serde_json::Error),

    #[error("Could not read the response body: {0}")]
    ResponseReadError(std::io::Error),

    #[error("Transport error: {0}")]
    TransportError(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JsonClient {
    /// Create a new client with the timeouts given in `params`.
    pub fn new(params: &NetParams) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(params.connect_timeout_ms))
            .timeout(Duration::from_millis(params.request_timeout_ms))
            .build();

        Self { agent }
    }

    /// POST `body` as JSON to `endpoint` and parse the JSON response.
    pub fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, NetError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        // Serialize the body
        let body_str = serde_json::to_string(body).map_err(NetError::SerializeError)?;

        // Exchange with the endpoint
        let response = match self
            .agent
            .post(endpoint)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
        {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => return Err(NetError::BadStatus(code)),
            Err(ureq::Error::Transport(t)) => {
                return Err(match t.kind() {
                    ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
                        NetError::NotReachable(t.to_string())
                    }
                    // Read/write timeouts surface as IO errors
                    ureq::ErrorKind::Io => NetError::Timeout,
                    _ => NetError::TransportError(t.to_string()),
                })
            }
        };

        // Parse the response
        let resp_str = response
            .into_string()
            .map_err(NetError::ResponseReadError)?;

        serde_json::from_str(&resp_str).map_err(NetError::DeserializeError)
    }
}
