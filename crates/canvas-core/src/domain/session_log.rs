//! SessionLog: the authoritative ordered history of drawn segments.
//!
//! # Ordering (for beginners)
//!
//! The log holds one *total order*: the order in which the coordinator
//! accepted segments, across all participants.  It is not an ordering per
//! author.  Because the coordinator handles one message at a time, "accepted
//! order" and "arrival order" are the same thing, and no locking or merge
//! logic is needed here.
//!
//! # Undo is global
//!
//! [`SessionLog::undo_last`] removes the most recently appended segment no
//! matter who drew it.  The log is one shared stack, not one stack per user.
//!
//! ```text
//! append(s1)  append(s2)  append(s3)   undo_last() -> s3
//! [s1]        [s1, s2]    [s1, s2, s3] [s1, s2]
//! ```

use crate::domain::geometry::Segment;

/// Ordered, mutable record of every accepted drawing segment.
///
/// The log is process-lifetime state: created empty at startup and lost when
/// the process exits.  It grows without bound for the length of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    segments: Vec<Segment>,
}

impl SessionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `segment` to the end of the log.  O(1) amortized.
    pub fn append(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Removes and returns the most recently appended segment.
    ///
    /// Returns `None` and leaves the log untouched when it is already empty;
    /// this never fails.
    pub fn undo_last(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    /// Resets the log to empty.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Returns the current contents in log order.
    ///
    /// The snapshot is an owned copy, so later mutation of the log never
    /// changes a snapshot that has already been handed out.
    pub fn snapshot(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    /// The most recently appended segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
