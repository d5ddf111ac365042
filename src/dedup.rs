//! Deciding whether a problem was already forwarded.
//!
//! The default strategy keeps no local state: the problem's comment thread on
//! the Dynatrace side is the record, so restarts do not cause duplicates. It
//! is a substring test and is only approximate. Any comment mentioning the
//! marker counts, whoever wrote it, and a problem whose marking call failed is
//! forwarded again on the next poll.

use crate::dt_client::Problem;

/// Text whose presence in any comment flags a problem as forwarded.
pub const FORWARDED_MARKER: &str = "EDA";

pub trait DedupStrategy: Send + Sync {
    fn is_already_forwarded(&self, problem: &Problem) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct CommentMarker {
    marker: &'static str,
}

impl CommentMarker {
    #[must_use]
    pub const fn new(marker: &'static str) -> Self {
        Self { marker }
    }
}

impl Default for CommentMarker {
    fn default() -> Self {
        Self::new(FORWARDED_MARKER)
    }
}

impl DedupStrategy for CommentMarker {
    fn is_already_forwarded(&self, problem: &Problem) -> bool {
        problem
            .comments
            .iter()
            .any(|comment| comment.content.contains(self.marker))
    }
}
