//! Generic async job handling for GUI operations
//!
//! Background file jobs (merge, organize, replace) run on their own thread and
//! report back once through a std channel that the UI polls every frame.

use anyhow::{anyhow, Result};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Helper struct for async jobs - polls a background task
pub struct AsyncJob<T> {
    receiver: Option<Receiver<Result<T>>>,
}

impl<T> AsyncJob<T> {
    /// Create a new async job with the given receiver
    pub fn new(receiver: Receiver<Result<T>>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Poll the job for completion
    /// Returns Some(result) if the job has completed, None if still running
    pub fn poll(&mut self) -> Option<Result<T>> {
        if let Some(rx) = &self.receiver {
            match rx.try_recv() {
                Ok(res) => {
                    self.receiver = None;
                    return Some(res);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.receiver = None;
                    return Some(Err(anyhow!("A tarefa em segundo plano foi interrompida")));
                }
            }
        }
        None
    }

    /// Check if the job is still running
    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Run a blocking job on a named thread and hand back its pollable result
pub fn spawn_job<T, F>(name: &str, job: F) -> AsyncJob<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("coleta-{}", name))
        .spawn(move || {
            let _ = tx.send(job());
        });
    if let Err(e) = spawned {
        tracing::error!("Failed to start {} job: {}", name, e);
    }
    // A thread that never started drops its sender, so poll() reports the failure
    AsyncJob::new(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait<T>(job: &mut AsyncJob<T>) -> Result<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(res) = job.poll() {
                return res;
            }
            assert!(Instant::now() < deadline, "job did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_spawn_job_delivers_result_once() {
        let mut job = spawn_job("test", || Ok(21 * 2));
        assert_eq!(wait(&mut job).unwrap(), 42);
        assert!(!job.is_running());
        assert!(job.poll().is_none());
    }

    #[test]
    fn test_spawn_job_delivers_error() {
        let mut job: AsyncJob<()> = spawn_job("test", || Err(anyhow!("falhou")));
        assert_eq!(wait(&mut job).unwrap_err().to_string(), "falhou");
    }

    #[test]
    fn test_disconnected_sender_is_error() {
        let (tx, rx) = mpsc::channel::<Result<()>>();
        let mut job = AsyncJob::new(rx);
        assert!(job.is_running());
        assert!(job.poll().is_none());

        drop(tx);

        assert!(job.poll().unwrap().is_err());
        assert!(!job.is_running());
    }
}
