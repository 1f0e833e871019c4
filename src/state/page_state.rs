//! Page state definitions for tracking traversal progress
//!
//! Every call into the traversal for a page ends in exactly one of these
//! states. Pages in flight are not represented; the visited set is what
//! guards against re-entry.

use std::fmt;

/// Represents the state of a page in the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Success States =====
    /// Page was rendered and its images and links were processed
    Visited,

    // ===== Skip States =====
    /// Page was already rendered earlier in this run
    AlreadyVisited,

    /// Page is deeper than the configured maximum depth
    DepthExceeded,

    /// No anchors or images appeared before the render timeout
    NoYield,

    /// The crawl was cancelled before the page was rendered
    Cancelled,

    // ===== Error States =====
    /// The render backend failed for this page
    Failed,
}

impl PageState {
    /// Returns true if this represents a successful render
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Visited)
    }

    /// Returns true if the page was skipped without being an error
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::AlreadyVisited | Self::DepthExceeded | Self::NoYield | Self::Cancelled
        )
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Stable lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visited => "visited",
            Self::AlreadyVisited => "already_visited",
            Self::DepthExceeded => "depth_exceeded",
            Self::NoYield => "no_yield",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Returns every state, in declaration order
    pub fn all_states() -> [PageState; 6] {
        [
            Self::Visited,
            Self::AlreadyVisited,
            Self::DepthExceeded,
            Self::NoYield,
            Self::Cancelled,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
