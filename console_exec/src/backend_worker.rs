//! Worker thread running the blocking backend calls so the main loop never
//! stalls on the network.
//!
//! The main loop sends [`WorkerRequest`]s and drains [`WorkerResponse`]s once
//! per cycle. Every request carries the generation token it was issued under;
//! the pipeline discards responses whose generation has been superseded, so a
//! late result can never overwrite a newer one.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{debug, warn};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Instant;

use crate::backend_client::{BackendClient, BackendClientError};
use thumb_if::{
    backend::{ActuatorForces, ActuatorVoltages, InterpResponse},
    joints::JointState,
    net::NetParams,
};

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Requests accepted by the worker.
#[derive(Debug)]
pub enum WorkerRequest {
    /// Interpret a natural language command.
    Interpret {
        generation: u64,
        command: String,
    },

    /// Refresh the derived force/voltage telemetry for the given angles.
    RefreshDerived {
        generation: u64,
        angles: JointState,
    },

    /// The worker should stop its operations.
    Stop,
}

/// Responses produced by the worker.
#[derive(Debug)]
pub enum WorkerResponse {
    /// Result of an interpretation request, with the measured round-trip
    /// time.
    Interpret {
        generation: u64,
        result: Result<InterpResponse, BackendClientError>,
        elapsed_ms: f64,
    },

    /// Result of a derived telemetry refresh. Both halves are best-effort.
    Derived {
        generation: u64,
        forces: Result<ActuatorForces, BackendClientError>,
        voltages: Result<ActuatorVoltages, BackendClientError>,
    },
}

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Handle to the backend worker thread.
pub struct BackendWorker {
    request_sender: Sender<WorkerRequest>,

    response_receiver: Receiver<WorkerResponse>,

    join_handle: Option<thread::JoinHandle<()>>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl BackendWorker {
    /// Spawn the worker thread with a client built from the given network
    /// parameters.
    pub fn new(net_params: &NetParams) -> Self {
        let (request_sender, request_receiver) = channel();
        let (response_sender, response_receiver) = channel();

        let client = BackendClient::new(net_params);

        let join_handle =
            thread::spawn(move || worker_thread(client, request_receiver, response_sender));

        Self {
            request_sender,
            response_receiver,
            join_handle: Some(join_handle),
        }
    }

    /// Build a worker handle around externally owned channels.
    ///
    /// Used by the pipeline tests to stand in for the real worker thread.
    #[cfg(test)]
    pub(crate) fn from_channels(
        request_sender: Sender<WorkerRequest>,
        response_receiver: Receiver<WorkerResponse>,
    ) -> Self {
        Self {
            request_sender,
            response_receiver,
            join_handle: None,
        }
    }

    /// Send a request to the worker.
    pub fn send(&self, request: WorkerRequest) {
        if let Err(e) = self.request_sender.send(request) {
            warn!("Could not send request to the backend worker: {}", e);
        }
    }

    /// Drain all responses the worker has produced since the last cycle.
    pub fn drain_responses(&self) -> Vec<WorkerResponse> {
        self.response_receiver.try_iter().collect()
    }
}

impl Drop for BackendWorker {
    fn drop(&mut self) {
        self.request_sender.send(WorkerRequest::Stop).ok();

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn worker_thread(
    client: BackendClient,
    request_receiver: Receiver<WorkerRequest>,
    response_sender: Sender<WorkerResponse>,
) {
    // Wait for requests from main
    while let Ok(request) = request_receiver.recv() {
        let response = match request {
            WorkerRequest::Stop => break,

            WorkerRequest::Interpret {
                generation,
                command,
            } => {
                let start = Instant::now();
                let result = client.process_command(&command);
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

                debug!(
                    "Interpretation (generation {}) finished in {:.1} ms",
                    generation, elapsed_ms
                );

                WorkerResponse::Interpret {
                    generation,
                    result,
                    elapsed_ms,
                }
            }

            WorkerRequest::RefreshDerived { generation, angles } => WorkerResponse::Derived {
                generation,
                forces: client.compute_forces(&angles),
                voltages: client.compute_voltages(&angles),
            },
        };

        // Main dropping its receiver means we're shutting down
        if response_sender.send(response).is_err() {
            break;
        }
    }
}
