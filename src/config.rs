//! Configuration types for backup-walker
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Construction of the traversal filter from exclude patterns

use crate::error::{ConfigError, ConfigResult};
use crate::pipeline::EntryInfo;
use clap::Parser;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Minimum job queue capacity
const MIN_QUEUE_SIZE: usize = 1;

/// Concurrent filesystem scanner for a content-addressed backup store
#[derive(Parser, Debug, Clone)]
#[command(
    name = "backup-walker",
    version,
    about = "Scan filesystem trees the way a backup would cover them",
    long_about = "Walks one or more root paths through the concurrent traversal pipeline\n\
                  and reports every directory and regular file a backup run would\n\
                  process. No file contents are read.",
    after_help = "EXAMPLES:\n    \
        backup-walker /home/user\n    \
        backup-walker /etc /var/lib -w 16\n    \
        backup-walker /data --exclude '\\.cache' --exclude '\\.git$'\n    \
        backup-walker /data --split --timeout 300"
)]
pub struct CliArgs {
    /// Root paths to scan
    #[arg(value_name = "ROOT", required = true)]
    pub roots: Vec<PathBuf>,

    /// Number of scan worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Job queue capacity (buffering between traversal and workers)
    #[arg(long, default_value = "200", value_name = "NUM")]
    pub queue_size: usize,

    /// Skip entries whose path matches PATTERN (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Route files and directories onto separate worker pools
    #[arg(long)]
    pub split: bool,

    /// Abort the scan after SECS seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show skipped entries)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub roots: Vec<PathBuf>,
    pub worker_count: usize,
    pub queue_size: usize,
    pub excludes: Vec<Regex>,
    pub split: bool,
    pub timeout: Option<Duration>,
    pub show_progress: bool,
    pub verbose: bool,
}

impl ScanConfig {
    /// Validate CLI arguments into a runtime configuration.
    pub fn from_args(args: CliArgs) -> ConfigResult<Self> {
        if args.roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if args.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: args.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        let excludes = args
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|err| ConfigError::InvalidExcludePattern {
                    pattern: pattern.clone(),
                    reason: err.to_string(),
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            roots: args.roots,
            worker_count: args.workers,
            queue_size: args.queue_size,
            excludes,
            split: args.split,
            timeout: args.timeout.map(Duration::from_secs),
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }

    /// Build the traversal filter from the exclude patterns. An entry is
    /// skipped when any pattern matches its path; a skipped directory's
    /// subtree is never entered.
    pub fn filter(&self) -> impl Fn(&Path, &EntryInfo) -> bool + Send + Sync + 'static {
        let excludes = self.excludes.clone();
        move |path: &Path, _info: &EntryInfo| {
            let text = path.to_string_lossy();
            !excludes.iter().any(|re| re.is_match(&text))
        }
    }
}
