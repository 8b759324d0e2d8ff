//! Worker pool pacing and backpressure on a paused clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use qc_txreplay::error::RpcError;
use qc_txreplay::ports::{BlockRef, RemoteSubmitter};
use qc_txreplay::{PoolConfig, WorkerPool};

/// Fails every third submission.
#[derive(Default)]
struct FlakyNode {
    calls: AtomicU64,
}

#[async_trait]
impl RemoteSubmitter for FlakyNode {
    async fn count(&self) -> Result<u32, RpcError> {
        Ok(0)
    }

    async fn fetch_block(&self, _block: BlockRef) -> Result<Vec<u8>, RpcError> {
        Err(RpcError::Parse("not served".into()))
    }

    async fn submit(&self, _raw_tx_hex: &str) -> Result<(), RpcError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call % 3 == 2 {
            return Err(RpcError::Remote {
                code: 43001,
                desc: "rejected".into(),
            });
        }
        Ok(())
    }
}

async fn replay(messages: usize, workers: usize, delay: Duration, capacity: usize) -> Duration {
    let node = Arc::new(FlakyNode::default());
    let config = PoolConfig {
        workers,
        queue_capacity: capacity,
    };
    let mut pool = WorkerPool::start(&config, delay, node.clone()).unwrap();

    let started = Instant::now();
    pool.submit_round_robin((0..messages).map(|i| format!("{i:04x}")))
        .await
        .unwrap();
    let stats = pool.await_completion().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(stats.sent + stats.failed, messages as u64);
    assert_eq!(stats.failed, (messages / 3) as u64);
    assert_eq!(node.calls.load(Ordering::SeqCst), messages as u64);
    elapsed
}

#[tokio::test(start_paused = true)]
async fn test_lower_bound_single_worker() {
    let delay = Duration::from_millis(100);
    let elapsed = replay(10, 1, delay, 1024).await;
    assert!(elapsed >= delay * 10, "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_lower_bound_uneven_split() {
    // 10 messages over 4 workers: the busiest worker gets ceil(10 / 4) = 3.
    let delay = Duration::from_millis(40);
    let elapsed = replay(10, 4, delay, 1024).await;
    assert!(elapsed >= delay * 3, "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_blocks_submitter() {
    let delay = Duration::from_millis(10);
    let node = Arc::new(FlakyNode::default());
    let config = PoolConfig {
        workers: 1,
        queue_capacity: 2,
    };
    let mut pool = WorkerPool::start(&config, delay, node).unwrap();

    let started = Instant::now();
    pool.submit_round_robin((0..8).map(|i| i.to_string()))
        .await
        .unwrap();
    // Enqueueing 8 into a queue of 2 cannot finish before the worker has
    // worked through most of them.
    assert!(started.elapsed() >= delay * 5, "elapsed {:?}", started.elapsed());

    let stats = pool.await_completion().await.unwrap();
    assert_eq!(stats.sent + stats.failed, 8);
}

#[tokio::test(start_paused = true)]
async fn test_zero_delay_is_unpaced() {
    let elapsed = replay(30, 2, Duration::ZERO, 1024).await;
    assert_eq!(elapsed, Duration::ZERO);
}
