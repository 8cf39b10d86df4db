//! Run statistics

use std::time::Duration;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Countries whose universities were discovered
    pub countries_processed: usize,

    /// University links found across all countries
    pub universities_found: usize,

    /// Records written to disk
    pub records_written: usize,

    /// Universities that could not be loaded or written
    pub failures: usize,
}

impl RunStats {
    /// Share of found universities that ended up on disk, in percent
    pub fn success_rate(&self) -> f64 {
        if self.universities_found == 0 {
            0.0
        } else {
            (self.records_written as f64 / self.universities_found as f64) * 100.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `elapsed` - Wall time of the run
/// * `listings_only` - Whether university pages were skipped
pub fn print_statistics(stats: &RunStats, elapsed: Duration, listings_only: bool) {
    println!("=== Scrape Statistics ===\n");

    println!("Overview:");
    println!("  Countries processed: {}", stats.countries_processed);
    println!("  Universities found: {}", stats.universities_found);
    if !listings_only {
        println!("  Records written: {}", stats.records_written);
        println!("  Failures: {}", stats.failures);
    }
    println!("  Elapsed: {:.1}s", elapsed.as_secs_f64());
    println!();

    if !listings_only {
        println!(
            "Success Rate: {:.1}% ({} / {} universities written)",
            stats.success_rate(),
            stats.records_written,
            stats.universities_found
        );
    }
}
