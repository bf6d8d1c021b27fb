//! Concurrency primitives for the probing pipeline.
//!
//! This module provides the admission gate that caps in-flight tasks, the
//! coordinator that tracks outstanding tasks, the bounded result channel,
//! the closer task, and the printer loop draining results in arrival order.

use crate::error::MailProbeError;
use crate::types::ResultUnit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Slots in the result channel. A single slot keeps finished-but-unprinted
/// results from piling up while the printer is busy.
pub const RESULT_CHANNEL_CAPACITY: usize = 1;

/// Bounded admission control: at most `capacity` holders at any time.
#[derive(Debug, Clone)]
pub struct TaskGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held gate slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl TaskGate {
    /// Create a gate with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot and take it.
    pub async fn acquire(&self) -> Result<GatePermit, MailProbeError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| MailProbeError::internal(format!("task gate closed: {}", e)))?;
        Ok(GatePermit { _permit: permit })
    }

    /// Number of slots not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Counts outstanding tasks and wakes waiters when the count drops to zero.
#[derive(Debug, Clone, Default)]
pub struct WorkCoordinator {
    state: Arc<CoordinatorState>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Registration of one task. Dropping it marks the task done, which also
/// happens while a panicking task unwinds.
#[derive(Debug)]
pub struct WorkGuard {
    state: Arc<CoordinatorState>,
}

impl WorkCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Call before the task is spawned.
    pub fn register(&self) -> WorkGuard {
        self.state.outstanding.fetch_add(1, Ordering::AcqRel);
        WorkGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Resolve once every registered task is done. Returns immediately when
    /// nothing is registered.
    pub async fn wait(&self) {
        loop {
            let idle = self.state.idle.notified();
            tokio::pin!(idle);
            // Register interest before reading the counter so a wakeup between
            // the check and the await is not lost.
            idle.as_mut().enable();

            if self.state.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::Acquire)
    }
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if self.state.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.idle.notify_waiters();
        }
    }
}

/// Create the bounded channel carrying results from workers to the printer.
pub fn result_channel() -> (mpsc::Sender<ResultUnit>, mpsc::Receiver<ResultUnit>) {
    mpsc::channel(RESULT_CHANNEL_CAPACITY)
}

/// Spawn the task that closes the result channel once all work is done.
///
/// `sender` is the last handle not owned by a worker; dropping it after
/// `wait()` lets the printer observe end-of-stream once workers have
/// dropped theirs.
pub fn spawn_closer(
    coordinator: WorkCoordinator,
    sender: mpsc::Sender<ResultUnit>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        coordinator.wait().await;
        drop(sender);
        tracing::debug!("All tasks finished, result channel closed");
    })
}

/// Write every result to `out` as it arrives until the channel is closed
/// and empty. Returns how many results were written.
pub async fn drain<W>(
    mut results: mpsc::Receiver<ResultUnit>,
    out: &mut W,
) -> Result<usize, MailProbeError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0usize;

    while let Some(unit) = results.recv().await {
        out.write_all(unit.as_str().as_bytes()).await?;
        out.flush().await?;
        written += 1;
    }

    Ok(written)
}
