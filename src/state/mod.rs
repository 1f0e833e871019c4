//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `MemoSet`: shared claim-once set backing the visited-page, attempted-image
//!   and queued-link bookkeeping
//! - `PageState`: the state a page ends up in after a traversal visit

mod memo;
mod page_state;

// Re-export main types
pub use memo::MemoSet;
pub use page_state::PageState;
