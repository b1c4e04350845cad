use serde::{Deserialize, Serialize};

use crate::surveys::StoredResponse;
use crate::Severity;

/// Number of most recent responses that describe a person's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecencyWindow(usize);

impl RecencyWindow {
    pub const DEFAULT_SIZE: usize = 2;

    pub const fn new(size: usize) -> Self {
        Self(size)
    }

    pub const fn size(self) -> usize {
        self.0
    }

    /// Prefix of a most-recent-first list that falls inside the window.
    pub fn apply<T>(self, most_recent_first: &[T]) -> &[T] {
        &most_recent_first[..self.0.min(most_recent_first.len())]
    }
}

impl Default for RecencyWindow {
    fn default() -> Self {
        Self(Self::DEFAULT_SIZE)
    }
}

/// Severities of the `window` most recent responses. `history` must already be most recent
/// first; a window of zero selects nothing.
pub fn windowed_severities(history: &[StoredResponse], window: RecencyWindow) -> Vec<Severity> {
    window
        .apply(history)
        .iter()
        .map(StoredResponse::severity)
        .collect()
}

/// Sorts a history into most-recent-first order; equal timestamps fall back to the later id.
pub fn rank_history(history: &mut [StoredResponse]) {
    history.sort_by(|left, right| {
        right
            .submitted_at
            .cmp(&left.submitted_at)
            .then_with(|| right.id.cmp(&left.id))
    });
}
