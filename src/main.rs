//! backup-walker - Filesystem Scan Front End
//!
//! Entry point for the CLI application. Wires the traversal pipeline to a
//! reference worker pool and reports what a backup run would cover.

use anyhow::{bail, Context, Result};
use backup_walker::cancel::cancellation;
use backup_walker::config::{CliArgs, ScanConfig};
use backup_walker::pipeline::{
    ack_channel, split, walk, Job, ScanTotals, SplitWorkerPool, WorkerPool,
};
use backup_walker::progress::{print_header, print_summary, ProgressReporter};
use clap::Parser;
use crossbeam_channel::bounded;
use std::process::ExitCode;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose);

    let config = ScanConfig::from_args(args).context("invalid configuration")?;

    if config.show_progress {
        let started = chrono::Local::now().format("%H:%M:%S").to_string();
        print_header(&config.roots, config.worker_count, &started);
    }

    let outcome = run_scan(&config)?;

    if config.show_progress {
        print_summary(outcome.totals, outcome.duration, !outcome.cancelled);
    }

    if outcome.cancelled {
        bail!("scan cancelled before completion");
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Result of one pipeline run
struct ScanOutcome {
    totals: ScanTotals,
    duration: Duration,
    cancelled: bool,
}

/// Either flavor of worker arrangement behind one join point
enum Workers {
    Plain(WorkerPool),
    Split(SplitWorkerPool, JoinHandle<()>),
}

impl Workers {
    fn stats(&self) -> std::sync::Arc<backup_walker::pipeline::ScanStats> {
        match self {
            Workers::Plain(pool) => pool.stats(),
            Workers::Split(pool, _) => pool.stats(),
        }
    }

    fn join(self) -> ScanTotals {
        match self {
            Workers::Plain(pool) => pool.join(),
            Workers::Split(pool, splitter) => {
                let _ = splitter.join();
                pool.join()
            }
        }
    }
}

fn run_scan(config: &ScanConfig) -> Result<ScanOutcome> {
    let start = Instant::now();
    let (token, cancel) = cancellation();

    // Timeouts are implemented purely as a timed cancellation.
    if let Some(timeout) = config.timeout {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(timeout);
            warn!(timeout_secs = timeout.as_secs(), "scan timeout reached, cancelling");
            token.cancel();
        });
    }

    let (jobs_tx, jobs_rx) = bounded::<Job>(config.queue_size);
    let (root_ack, root_res) = ack_channel();

    let workers = if config.split {
        let (dirs_tx, dirs_rx) = bounded(config.queue_size);
        let (files_tx, files_rx) = bounded(config.queue_size);

        let splitter = thread::Builder::new()
            .name("splitter".to_string())
            .spawn(move || split(jobs_rx, dirs_tx, files_tx))
            .context("failed to spawn splitter thread")?;

        let dir_workers = (config.worker_count / 2).max(1);
        let file_workers = config.worker_count.saturating_sub(dir_workers).max(1);
        Workers::Split(
            SplitWorkerPool::spawn(file_workers, dir_workers, files_rx, dirs_rx, cancel.clone())
                .context("failed to start worker pools")?,
            splitter,
        )
    } else {
        Workers::Plain(
            WorkerPool::spawn(config.worker_count, jobs_rx, cancel.clone())
                .context("failed to start worker pool")?,
        )
    };

    let reporter = config
        .show_progress
        .then(|| ProgressReporter::start(workers.stats(), config.worker_count));

    let filter = config.filter();
    let walk_result = walk(&config.roots, &filter, &cancel, &jobs_tx, root_ack);

    // Close the job stream so workers and splitter drain out.
    drop(jobs_tx);

    let cancelled = match walk_result {
        Ok(()) => match root_res.wait_with_cancel(&cancel) {
            Some(ok) => {
                if !ok {
                    warn!("some entries were not fully scanned");
                }
                false
            }
            None => true,
        },
        Err(err) if err.is_cancelled() => true,
        Err(err) => {
            token.cancel();
            workers.join();
            if let Some(reporter) = reporter {
                reporter.finish();
            }
            return Err(err.into());
        }
    };

    if cancelled {
        token.cancel();
    }

    let totals = workers.join();
    if let Some(reporter) = reporter {
        reporter.finish();
    }

    Ok(ScanOutcome {
        totals,
        duration: start.elapsed(),
        cancelled,
    })
}
