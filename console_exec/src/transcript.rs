//! # Transcript Module
//!
//! The transcript is the console's append-only message log: operator
//! commands, interpreter responses and system notices. It is bounded to the
//! most recent N entries (oldest dropped on overflow) so a long trial session
//! cannot grow without bound.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// Internal
use thumb_if::joints::JointState;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default bound on the number of retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// The system entry a fresh (or reset) transcript starts with.
pub const GREETING: &str =
    "Natural language interface initialised. Ready to accept operator commands.";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Monotonically increasing entry id.
    pub id: u64,

    /// Who authored the entry.
    pub role: Role,

    /// The entry text.
    pub text: String,

    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,

    /// The joint angles carried by an interpretation result, if any.
    pub angles: Option<JointState>,

    /// The interpretation confidence in [0, 1], if any.
    pub confidence: Option<f64>,
}

/// The bounded transcript.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    entries: VecDeque<TranscriptEntry>,

    #[serde(skip_serializing)]
    next_id: u64,

    #[serde(skip_serializing)]
    max_entries: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Transcript {
    /// Create a new transcript bounded to `max_entries`, holding the initial
    /// system greeting.
    pub fn new(max_entries: usize) -> Self {
        let mut transcript = Self {
            entries: VecDeque::new(),
            next_id: 1,
            max_entries: max_entries.max(1),
        };

        transcript.push(Role::System, GREETING, None, None);

        transcript
    }

    /// Append an entry, dropping the oldest if the bound is exceeded.
    ///
    /// Returns the id of the appended entry.
    pub fn push(
        &mut self,
        role: Role,
        text: &str,
        angles: Option<JointState>,
        confidence: Option<f64>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.entries.push_back(TranscriptEntry {
            id,
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
            angles,
            confidence,
        });

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }

        id
    }

    /// Clear the transcript down to a single system greeting.
    ///
    /// Entry ids keep counting up across resets.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.push(Role::System, GREETING, None, None);
    }

    /// The number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.back()
    }

    /// An owned snapshot of the retained entries, for saving to the session.
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_starts_with_greeting() {
        let transcript = Transcript::new(10);

        assert_eq!(transcript.len(), 1);
        let entry = transcript.last().unwrap();
        assert_eq!(entry.role, Role::System);
        assert_eq!(entry.text, GREETING);
    }

    #[test]
    fn test_bound_never_exceeded() {
        let mut transcript = Transcript::new(5);

        for i in 0..20 {
            transcript.push(Role::User, &format!("command {}", i), None, None);
            assert!(transcript.len() <= 5);
        }

        assert_eq!(transcript.len(), 5);
    }

    #[test]
    fn test_oldest_dropped_first() {
        let mut transcript = Transcript::new(3);

        for i in 0..6 {
            transcript.push(Role::User, &format!("command {}", i), None, None);
        }

        // The greeting and the earliest commands were dropped
        let texts: Vec<&str> = transcript.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["command 3", "command 4", "command 5"]);
    }

    #[test]
    fn test_ids_monotonic_across_reset() {
        let mut transcript = Transcript::new(10);

        let a = transcript.push(Role::User, "first", None, None);
        transcript.reset();
        let b = transcript.push(Role::User, "second", None, None);

        assert!(b > a);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.iter().next().unwrap().role, Role::System);
    }
}
