//! Per-participant selection cursors.
//!
//! A participant → cursor map behind one mutex. Selection is purely
//! max-score and never reads or advances a cursor; only the reset
//! operation is exposed. Rotating across equally good machines is not
//! implemented.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Selection cursors keyed by participant id. Owned by a
/// [`crate::VmSelector`]; construct one per independent selector.
#[derive(Debug, Default)]
pub struct ParticipantSelectionState {
    cursors: Mutex<HashMap<String, usize>>,
}

impl ParticipantSelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove any cursor held for the participant. Idempotent.
    pub fn reset(&self, participant_id: &str) {
        let removed = self.lock().remove(participant_id);
        debug!(participant = participant_id, had_cursor = removed.is_some(), "selection state reset");
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self, participant_id: &str) -> Option<usize> {
        self.lock().get(participant_id).copied()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        // The map holds plain integers, so a poisoned guard is still consistent.
        self.cursors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
