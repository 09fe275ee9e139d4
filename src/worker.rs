//! Worker trait and poll-loop driver
//!
//! Each pipeline stage processes one job per step. The driver runs a
//! step loop around it: processed steps continue immediately, idle steps
//! and errors sleep for the configured delay. Stopping happens between
//! iterations — no mid-job cancellation is needed because all job state
//! lives in the queue item itself.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

/// Result of a single worker step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A job was consumed; poll again immediately
    Processed,
    /// Nothing to do; the driver should back off before retrying
    Idle,
}

/// A pipeline stage driven by the poll loop
#[async_trait]
pub trait Worker: Send {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Process at most one job
    async fn step(&mut self) -> Result<Outcome>;
}

/// Drive a worker until the shutdown signal turns true
///
/// Step errors are logged and the loop continues after the idle delay —
/// infrastructure-level recovery (reconnects, restarts) belongs to the
/// process supervisor, not this loop. Dropping the shutdown sender also
/// stops the worker.
pub async fn run<W: Worker>(
    worker: &mut W,
    idle_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(worker = worker.name(), "Worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let pause = match worker.step().await {
            Ok(Outcome::Processed) => None,
            Ok(Outcome::Idle) => Some(idle_delay),
            Err(e) => {
                tracing::error!(worker = worker.name(), error = %e, "Worker step failed");
                Some(idle_delay)
            }
        };

        if let Some(pause) = pause {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    tracing::info!(worker = worker.name(), "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;

    /// Scripted worker that flips the shutdown switch after a set number
    /// of steps
    struct ScriptedWorker {
        steps: usize,
        stop_after: usize,
        result: fn() -> Result<Outcome>,
        shutdown: watch::Sender<bool>,
    }

    #[async_trait]
    impl Worker for ScriptedWorker {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn step(&mut self) -> Result<Outcome> {
            self.steps += 1;
            if self.steps >= self.stop_after {
                self.shutdown.send(true).unwrap();
            }
            (self.result)()
        }
    }

    #[tokio::test]
    async fn test_preset_shutdown_runs_zero_steps() {
        let (tx, rx) = watch::channel(true);
        let mut worker = ScriptedWorker {
            steps: 0,
            stop_after: 100,
            result: || Ok(Outcome::Processed),
            shutdown: tx,
        };

        run(&mut worker, Duration::from_millis(1), rx).await;
        assert_eq!(worker.steps, 0);
    }

    #[tokio::test]
    async fn test_processed_steps_loop_until_shutdown() {
        let (tx, rx) = watch::channel(false);
        let mut worker = ScriptedWorker {
            steps: 0,
            stop_after: 3,
            result: || Ok(Outcome::Processed),
            shutdown: tx,
        };

        run(&mut worker, Duration::from_millis(1), rx).await;
        assert_eq!(worker.steps, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_steps_sleep_and_continue() {
        let (tx, rx) = watch::channel(false);
        let mut worker = ScriptedWorker {
            steps: 0,
            stop_after: 3,
            result: || Ok(Outcome::Idle),
            shutdown: tx,
        };

        run(&mut worker, Duration::from_secs(1), rx).await;
        assert_eq!(worker.steps, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_errors_do_not_kill_the_loop() {
        let (tx, rx) = watch::channel(false);
        let mut worker = ScriptedWorker {
            steps: 0,
            stop_after: 2,
            result: || Err(ChannelError::Queue("unavailable".to_string())),
            shutdown: tx,
        };

        run(&mut worker, Duration::from_secs(1), rx).await;
        assert_eq!(worker.steps, 2);
    }
}
