//! Shared types for ssort
//!
//! This crate contains data structures used by both the engine and the binary.

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default interval between timer-driven flushes
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Capacity of the input and output line queues
pub const QUEUE_CAPACITY: usize = 100;

/// Longest line the source accepts before reporting a read error
pub const MAX_LINE_LENGTH: usize = 10 * 1024 * 1024;

// ============================================================================
// Priority
// ============================================================================

/// Sort priority of a buffered line.
///
/// `Rank(n)` is the index of the matching filter; lower sorts first.
/// `Unmatched` always sorts after every rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Rank(usize),
    Unmatched,
}

impl From<Option<usize>> for Priority {
    fn from(rank: Option<usize>) -> Self {
        rank.map_or(Priority::Unmatched, Priority::Rank)
    }
}

// ============================================================================
// Line Types
// ============================================================================

/// A line held in the priority buffer until the next flush
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferedItem {
    /// Line exactly as read, color codes included
    pub raw: String,

    /// Normalized text used for matching and as the sort tie-break
    pub clean: String,

    pub priority: Priority,
}

impl BufferedItem {
    pub fn new(raw: String, clean: String, priority: Priority) -> Self {
        Self {
            raw,
            clean,
            priority,
        }
    }

    /// Sort key applied at flush time
    pub fn sort_key(&self) -> (Priority, &str) {
        (self.priority, self.clean.as_str())
    }
}

/// A line on its way to the output sink
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Emission {
    /// Ranked output (rank 0 or flushed); counts against the output budget
    Ranked(String),
    /// Unmatched line passed straight through; ignores the output budget
    Passthrough(String),
}

impl Emission {
    pub fn line(&self) -> &str {
        match self {
            Emission::Ranked(line) | Emission::Passthrough(line) => line,
        }
    }

    pub fn is_budgeted(&self) -> bool {
        matches!(self, Emission::Ranked(_))
    }
}

// ============================================================================
// Run Configuration
// ============================================================================

/// Where input lines come from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InputSource {
    #[default]
    Stdin,
    /// Program and arguments, already tokenized and expanded
    Command(Vec<String>),
}

/// Final merged configuration for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Ordered filters; position is rank
    pub filters: Vec<String>,
    pub ignore_case: bool,
    pub word_boundary: bool,
    /// Drop lines that match no filter
    pub only_matching: bool,
    /// Emit unmatched lines immediately instead of buffering them
    pub keep_unmatched: bool,
    /// Count-triggered flush threshold and output budget; 0 disables both
    pub limit: usize,
    pub timeout: Duration,
    /// Strip ANSI color codes before matching and sorting
    pub color: bool,
    pub source: InputSource,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            ignore_case: false,
            word_boundary: false,
            only_matching: false,
            keep_unmatched: false,
            limit: 0,
            timeout: DEFAULT_TIMEOUT,
            color: false,
            source: InputSource::Stdin,
        }
    }
}

impl RunConfig {
    pub fn with_filters<I, S>(filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filters: filters.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Remaining-output budget, if a limit is set
    pub fn output_budget(&self) -> Option<usize> {
        (self.limit > 0).then_some(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_sorts_last() {
        assert!(Priority::Rank(0) < Priority::Rank(1));
        assert!(Priority::Rank(usize::MAX) < Priority::Unmatched);
        assert_eq!(Priority::from(None), Priority::Unmatched);
        assert_eq!(Priority::from(Some(3)), Priority::Rank(3));
    }

    #[test]
    fn test_output_budget() {
        let mut config = RunConfig::default();
        assert_eq!(config.output_budget(), None);
        config.limit = 4;
        assert_eq!(config.output_budget(), Some(4));
    }
}
