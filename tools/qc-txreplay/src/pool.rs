//! # Rate-Limited Worker Pool
//!
//! N independent submission workers. Each worker owns a bounded FIFO queue,
//! its own timer and its own counters; workers share nothing but the
//! submitter.
//!
//! ## Pacing
//!
//! After every submission (success or failure) a worker waits for its next
//! timer tick. The first tick fires one delay after start, so a worker that
//! is handed `k` transactions needs at least `k × delay`. Aggregate throughput
//! is bounded by `workers / delay`.
//!
//! ## Backpressure
//!
//! [`WorkerPool::submit`] waits while the target queue is full. Nothing is
//! dropped and nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::{ConfigError, PoolError};
use crate::ports::RemoteSubmitter;

/// Submission counters (one slot or the whole pool).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Accepted by the node
    pub sent: u64,
    /// Rejected or failed in transport
    pub failed: u64,
}

struct Slot {
    sender: Option<mpsc::Sender<String>>,
    stats: Arc<RwLock<PoolStats>>,
    handle: Option<JoinHandle<()>>,
}

/// Pool of rate-limited submission workers.
pub struct WorkerPool {
    slots: Vec<Slot>,
    cursor: usize,
}

impl WorkerPool {
    /// Spawn `config.workers` workers on the current tokio runtime.
    ///
    /// A zero `delay` disables pacing.
    pub fn start(
        config: &PoolConfig,
        delay: Duration,
        submitter: Arc<dyn RemoteSubmitter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let slots = (0..config.workers)
            .map(|index| {
                let (sender, receiver) = mpsc::channel(config.queue_capacity);
                let stats = Arc::new(RwLock::new(PoolStats::default()));
                let handle = tokio::spawn(run_worker(
                    index,
                    receiver,
                    Arc::clone(&submitter),
                    Arc::clone(&stats),
                    delay,
                ));
                Slot {
                    sender: Some(sender),
                    stats,
                    handle: Some(handle),
                }
            })
            .collect();

        debug!(
            "[qc-txreplay] Started {} workers (delay {:?}, queue {})",
            config.workers, delay, config.queue_capacity
        );
        Ok(Self { slots, cursor: 0 })
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Enqueue one raw transaction on worker `slot`, waiting while its queue is full.
    pub async fn submit(&self, raw_tx_hex: String, slot: usize) -> Result<(), PoolError> {
        let target = self.slots.get(slot).ok_or(PoolError::InvalidSlot {
            slot,
            size: self.slots.len(),
        })?;
        let sender = target.sender.as_ref().ok_or(PoolError::Closed)?;
        sender.send(raw_tx_hex).await.map_err(|_| PoolError::Closed)
    }

    /// Enqueue a batch round-robin. The rotation continues where the previous
    /// batch stopped.
    pub async fn submit_round_robin<I>(&mut self, batch: I) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = String>,
    {
        for raw_tx_hex in batch {
            self.submit(raw_tx_hex, self.cursor).await?;
            self.cursor = (self.cursor + 1) % self.slots.len();
        }
        Ok(())
    }

    /// Close every queue. Workers exit once their queue is drained.
    pub fn close_all(&mut self) {
        for slot in &mut self.slots {
            slot.sender = None;
        }
    }

    /// Close every queue and wait for all workers to drain.
    pub async fn await_completion(&mut self) -> Result<PoolStats, PoolError> {
        self.close_all();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(handle) = slot.handle.take() {
                handle.await.map_err(|e| PoolError::WorkerFailed {
                    slot: index,
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(self.snapshot_stats())
    }

    /// Totals across workers, each read under that worker's lock.
    pub fn snapshot_stats(&self) -> PoolStats {
        self.slots.iter().fold(PoolStats::default(), |acc, slot| {
            let stats = slot.stats.read();
            PoolStats {
                sent: acc.sent + stats.sent,
                failed: acc.failed + stats.failed,
            }
        })
    }

    /// Per-worker counters, in slot order.
    pub fn slot_stats(&self) -> Vec<PoolStats> {
        self.slots.iter().map(|slot| *slot.stats.read()).collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                handle.abort();
            }
        }
    }
}

async fn run_worker(
    index: usize,
    mut queue: mpsc::Receiver<String>,
    submitter: Arc<dyn RemoteSubmitter>,
    stats: Arc<RwLock<PoolStats>>,
    delay: Duration,
) {
    let mut ticker = (!delay.is_zero()).then(|| {
        let mut ticker = interval_at(Instant::now() + delay, delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    while let Some(raw_tx_hex) = queue.recv().await {
        match submitter.submit(&raw_tx_hex).await {
            Ok(()) => stats.write().sent += 1,
            Err(e) => {
                warn!(
                    "[qc-txreplay] Worker {} failed to send tx {}: {}",
                    index,
                    abbreviate(&raw_tx_hex),
                    e
                );
                stats.write().failed += 1;
            }
        }
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }
    }

    debug!("[qc-txreplay] Worker {} drained", index);
}

fn abbreviate(raw: &str) -> &str {
    const MAX: usize = 64;
    raw.get(..MAX).unwrap_or(raw)
}
