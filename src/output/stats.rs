//! Crawl statistics
//!
//! [`CrawlStats`] is the live counter set the traversal updates while it runs.
//! [`CrawlStatistics`] is the plain snapshot handed to reports and the CLI.

use crate::state::PageState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

const PAGE_STATE_COUNT: usize = 6;

/// Live crawl counters
///
/// All updates are relaxed atomic increments; a snapshot taken while the
/// crawl is still running may mix counts from slightly different moments.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages: [AtomicU64; PAGE_STATE_COUNT],
    images_downloaded: AtomicU64,
    images_filtered: AtomicU64,
    images_failed: AtomicU64,
    images_duplicate: AtomicU64,
    links_rejected: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the terminal state of one traversal visit
    pub fn record_page(&self, state: PageState) {
        self.pages[state as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_downloaded(&self) {
        self.images_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_filtered(&self) {
        self.images_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_failed(&self) {
        self.images_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_duplicate(&self) {
        self.images_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_link_rejected(&self) {
        self.links_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters
    pub fn snapshot(&self) -> CrawlStatistics {
        let mut pages_by_state = HashMap::new();
        for state in PageState::all_states() {
            let count = self.pages[state as usize].load(Ordering::Relaxed);
            if count > 0 {
                pages_by_state.insert(state, count);
            }
        }

        CrawlStatistics {
            pages_by_state,
            images_downloaded: self.images_downloaded.load(Ordering::Relaxed),
            images_filtered: self.images_filtered.load(Ordering::Relaxed),
            images_failed: self.images_failed.load(Ordering::Relaxed),
            images_duplicate: self.images_duplicate.load(Ordering::Relaxed),
            links_rejected: self.links_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Count of traversal visits by terminal state (zero counts omitted)
    pub pages_by_state: HashMap<PageState, u64>,

    /// Images written to the output directory
    pub images_downloaded: u64,

    /// Images dropped by the minimum-size filter
    pub images_filtered: u64,

    /// Images whose fetch or conversion failed
    pub images_failed: u64,

    /// Image URLs seen again after their first attempt
    pub images_duplicate: u64,

    /// Links rejected as off-domain or outside the base URL
    pub links_rejected: u64,
}

impl CrawlStatistics {
    /// Number of visits that ended in the given state
    pub fn pages(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Pages handed to the render backend
    pub fn pages_rendered(&self) -> u64 {
        self.pages(PageState::Visited) + self.pages(PageState::NoYield) + self.pages(PageState::Failed)
    }

    /// Visits that ended without rendering anything new
    pub fn pages_skipped(&self) -> u64 {
        self.pages_by_state
            .iter()
            .filter(|(state, _)| state.is_skipped() && **state != PageState::NoYield)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn total_visits(&self) -> u64 {
        self.pages_by_state.values().sum()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Pages:");
    println!("  Rendered: {}", stats.pages_rendered());
    println!("  Skipped: {}", stats.pages_skipped());
    println!();

    println!("Visits by State:");
    let total = stats.total_visits();
    let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    for (state, count) in state_counts {
        let percentage = if total > 0 {
            (*count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    println!("Images:");
    println!("  Downloaded: {}", stats.images_downloaded);
    println!("  Below minimum size: {}", stats.images_filtered);
    println!("  Failed: {}", stats.images_failed);
    println!("  Duplicates skipped: {}", stats.images_duplicate);
    println!();

    println!("Links rejected (off-domain): {}", stats.links_rejected);
}
