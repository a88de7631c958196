//! Stress runs for syncmeta sessions.
//!
//! These runs drive the cache and the nested lock under heavy load and
//! concurrent batches.

use crate::fixtures::TestSession;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use syncmeta_codec::ResourceSyncEntry;
use syncmeta_core::{CoreResult, Synchronizer};
use syncmeta_store::WorkspacePath;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of top-level projects the operations are spread over.
    pub projects: usize,
    /// Number of entry writes per batch.
    pub batch_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            projects: 4,
            batch_size: 50,
        }
    }
}

fn project(index: usize) -> String {
    format!("proj{index}")
}

fn file_entry(path: &WorkspacePath, revision: &str) -> ResourceSyncEntry {
    ResourceSyncEntry::file(path.name(), revision, None, "", None).expect("valid entry")
}

fn manage_projects(session: &TestSession, config: &StressConfig) {
    for p in 0..config.projects.max(1) {
        session.manage(&project(p));
    }
}

/// Runs one batch writing `count` entries into `dir` under a fresh context.
fn write_batch(
    sync: &Synchronizer,
    dir: &WorkspacePath,
    prefix: &str,
    start: usize,
    count: usize,
) -> CoreResult<()> {
    let ctx = sync.context();
    let batch = sync.begin(ctx, dir)?;
    for i in start..start + count {
        let path = dir.join(&format!("{prefix}{i}.c"));
        sync.set_resource_sync(ctx, &path, Some(file_entry(&path, "1.1")))?;
    }
    batch.finish()
}

/// Run a sequential stress test where every write is its own batch.
pub fn stress_sequential_writes(session: &TestSession, config: &StressConfig) -> StressTestResult {
    manage_projects(session, config);
    let ctx = session.context();

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let dir = WorkspacePath::new(&project(i % config.projects.max(1)));
        let path = dir.join(&format!("f{}.c", i % 512));
        let revision = format!("1.{}", i + 1);
        match session.set_resource_sync(ctx, &path, Some(file_entry(&path, &revision))) {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a stress test where writes are grouped into nested batches.
pub fn stress_nested_batches(session: &TestSession, config: &StressConfig) -> StressTestResult {
    manage_projects(session, config);
    run_batches(session, config)
}

fn run_batches(session: &TestSession, config: &StressConfig) -> StressTestResult {
    let batch_size = config.batch_size.max(1);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for batch in 0..(config.operations / batch_size) {
        let dir = WorkspacePath::new(&project(batch % config.projects.max(1)));
        match write_batch(&session.sync, &dir, "n", batch * batch_size, batch_size) {
            Ok(()) => successful += batch_size,
            Err(_) => failed += batch_size,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run batches from several threads at once, each with its own context.
///
/// Batches on different projects contend for the same lock, so every
/// batch must run to completion before another context gets in.
pub fn stress_concurrent_batches(session: &TestSession, config: &StressConfig) -> StressTestResult {
    manage_projects(session, config);
    let batch_size = config.batch_size.max(1);
    let threads = config.threads.max(1);
    let batches_per_thread = config.operations / batch_size / threads;

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let sync = Arc::clone(&session.sync);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let dir = WorkspacePath::new(&project(t % config.projects.max(1)));

            thread::spawn(move || {
                let prefix = format!("t{t}_");
                for b in 0..batches_per_thread {
                    match write_batch(&sync, &dir, &prefix, b * batch_size, batch_size) {
                        Ok(()) => successful.fetch_add(batch_size, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(batch_size, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run lock-free readers against one writer.
///
/// Counts reads only; a read fails if it errors or sees an entry other
/// than the ones the writer produces.
pub fn stress_concurrent_reads(session: &TestSession, config: &StressConfig) -> StressTestResult {
    session.manage("shared");
    let dir = WorkspacePath::new("shared");
    let files = 64;
    for i in 0..files {
        session.track(&format!("shared/r{i}.c"), "1.1", 1_000);
    }

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let readers = config.threads.max(1);
    let reads_per_thread = config.operations / readers;

    let start = Instant::now();

    let writer = {
        let sync = Arc::clone(&session.sync);
        let dir = dir.clone();
        let rounds = reads_per_thread / files;
        thread::spawn(move || {
            let ctx = sync.context();
            for round in 0..rounds {
                let path = dir.join(&format!("r{}.c", round % files));
                let _ = sync.set_resource_sync(ctx, &path, Some(file_entry(&path, "1.2")));
            }
        })
    };

    let handles: Vec<_> = (0..readers)
        .map(|t| {
            let sync = Arc::clone(&session.sync);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let dir = dir.clone();

            thread::spawn(move || {
                for i in 0..reads_per_thread {
                    let path = dir.join(&format!("r{}.c", (t + i) % files));
                    match sync.get_resource_sync(&path) {
                        Ok(Some(entry)) if matches!(entry.revision(), Some("1.1" | "1.2")) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    writer.join().expect("Thread panicked");
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run batches where every other project refuses writes.
pub fn stress_flush_failures(session: &TestSession, config: &StressConfig) -> StressTestResult {
    let config = StressConfig {
        projects: config.projects.max(2),
        ..config.clone()
    };
    manage_projects(session, &config);
    for p in (1..config.projects).step_by(2) {
        session.fail_writes_for(&project(p));
    }
    run_batches(session, &config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_writes() {
        let session = TestSession::memory();
        let config = StressConfig {
            operations: 1_000,
            ..Default::default()
        };

        let result = stress_sequential_writes(&session, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1_000);
    }

    #[test]
    fn test_nested_batches() {
        let session = TestSession::memory();
        let config = StressConfig {
            operations: 1_000,
            batch_size: 100,
            ..Default::default()
        };

        let result = stress_nested_batches(&session, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(
            session
                .cache()
                .get_children_sync(&WorkspacePath::new("proj0"))
                .unwrap()
                .len(),
            300
        );
    }

    #[test]
    fn test_concurrent_batches() {
        let session = TestSession::memory();
        let config = StressConfig {
            operations: 1_600,
            threads: 4,
            projects: 2,
            batch_size: 40,
        };

        let result = stress_concurrent_batches(&session, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1_600);
        assert!(!session.lock().is_held());
        assert_eq!(
            session
                .cache()
                .get_children_sync(&WorkspacePath::new("proj1"))
                .unwrap()
                .len(),
            800
        );
    }

    #[test]
    fn test_concurrent_reads() {
        let session = TestSession::memory();
        let config = StressConfig {
            operations: 2_000,
            threads: 4,
            ..Default::default()
        };

        let result = stress_concurrent_reads(&session, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 2_000);
    }

    #[test]
    fn test_flush_failures() {
        let session = TestSession::memory();
        let config = StressConfig {
            operations: 400,
            projects: 2,
            batch_size: 50,
            ..Default::default()
        };

        let result = stress_flush_failures(&session, &config);
        // Batches alternate between the healthy and the failing project.
        assert_eq!(result.successful_ops, 200);
        assert_eq!(result.failed_ops, 200);
        assert!(!session.lock().is_held());
    }
}
