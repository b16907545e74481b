use super::AutomationTask;
use anyhow::{anyhow, Result};
use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

/// Anything that accepts collection tasks without blocking the caller
pub trait TaskSubmitter {
    fn submit(&self, task: AutomationTask);
}

/// Bounded worker pool for long-running work (automation, Agitel, file tools).
///
/// Backed by a multi-thread tokio runtime with a fixed worker count; blocking
/// jobs go through `spawn_blocking`.
pub struct WorkerPool {
    runtime: Runtime,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("coleta-worker")
            .enable_all()
            .build()
            .map_err(|e| anyhow!("Failed to create worker pool: {}", e))?;
        tracing::info!("Worker pool started with {} thread(s)", threads);
        Ok(Self { runtime, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    pub fn spawn_blocking<F, R>(&self, job: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.runtime.spawn_blocking(job)
    }

    /// Wait for a future on the calling thread. Only used during shutdown.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl TaskSubmitter for WorkerPool {
    fn submit(&self, task: AutomationTask) {
        tracing::debug!("Submitting {} task with {} row(s)", task.carrier(), task.rows().len());
        self.runtime.spawn(task.run());
    }
}
