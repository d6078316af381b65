//! Progress reporting for the scan
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::pipeline::{ScanStats, ScanTotals};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Progress reporter that displays live scan counters
pub struct ProgressReporter {
    bar: ProgressBar,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start a reporter thread reading `stats` until finished.
    pub fn start(stats: Arc<ScanStats>, total_workers: usize) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let bar = bar.clone();
            let stop = Arc::clone(&stop);
            let start = Instant::now();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let totals = stats.totals();
                    let elapsed = start.elapsed().as_secs_f64();
                    let rate = if elapsed > 0.0 {
                        (totals.files + totals.dirs) as f64 / elapsed
                    } else {
                        0.0
                    };

                    bar.set_message(format!(
                        "Dirs: {} | Files: {} | Size: {} | Rate: {:.0}/s | Workers: {}",
                        format_number(totals.dirs),
                        format_number(totals.files),
                        format_size(totals.bytes, BINARY),
                        rate,
                        total_workers,
                    ));

                    thread::sleep(Duration::from_millis(100));
                }
            })
        };

        Self {
            bar,
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the reporter thread and clear the display.
    pub fn finish(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.bar.finish_and_clear();
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print the scan header
pub fn print_header(roots: &[std::path::PathBuf], workers: usize, started: &str) {
    eprintln!(
        "{} {} ({} workers, started {})",
        style("Scanning").bold().green(),
        roots
            .iter()
            .map(|r| r.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        workers,
        started,
    );
}

/// Print a summary of the scan results
pub fn print_summary(totals: ScanTotals, duration: Duration, completed: bool) {
    let status = if completed {
        style("Scan complete").bold().green()
    } else {
        style("Scan interrupted").bold().yellow()
    };

    eprintln!();
    eprintln!("{}", status);
    eprintln!("  Directories: {}", format_number(totals.dirs));
    eprintln!("  Files:       {}", format_number(totals.files));
    eprintln!("  Total size:  {}", format_size(totals.bytes, BINARY));
    eprintln!("  Elapsed:     {}", format_elapsed(duration));
}

/// Format a duration as h/m/s
pub fn format_elapsed(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1m5s");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "1h2m5s");
    }
}
