//! # Console Input
//!
//! Interactive operator prompt. The rustyline editor blocks on the terminal,
//! so it runs on its own reader thread and hands completed lines to the main
//! loop over a channel; the main loop drains them without ever blocking.
//! While the pipeline is busy any submission is rejected there rather than
//! queued.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "thumb> ";

const HISTORY_FILE: &str = "history.txt";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Events produced by the reader thread.
#[derive(Debug)]
pub enum ConsoleEvent {
    /// The operator entered a line.
    Line(String),

    /// The operator asked to quit (ctrl-c/ctrl-d) or the prompt died.
    Quit,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to the interactive prompt thread.
pub struct ConsoleInput {
    receiver: Receiver<ConsoleEvent>,

    _join_handle: thread::JoinHandle<()>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ConsoleInput {
    /// Spawn the prompt thread.
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        let join_handle = thread::spawn(move || reader_thread(sender));

        Self {
            receiver,
            _join_handle: join_handle,
        }
    }

    /// Get the next pending event, if any. Never blocks.
    pub fn try_get_event(&self) -> Option<ConsoleEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            // The reader thread is gone, treat it as a quit
            Err(TryRecvError::Disconnected) => Some(ConsoleEvent::Quit),
        }
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn reader_thread(sender: Sender<ConsoleEvent>) {
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            warn!("Could not start the interactive prompt: {}", e);
            sender.send(ConsoleEvent::Quit).ok();
            return;
        }
    };

    // History is best effort
    let history_path = std::env::temp_dir().join(HISTORY_FILE);
    if editor.load_history(&history_path).is_err() {
        debug!("No prompt history found");
    }

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                editor.add_history_entry(line.as_str()).ok();

                if sender.send(ConsoleEvent::Line(line)).is_err() {
                    // Main loop is gone
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                sender.send(ConsoleEvent::Quit).ok();
                break;
            }
            Err(e) => {
                warn!("Prompt error: {:?}", e);
                sender.send(ConsoleEvent::Quit).ok();
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();
}
