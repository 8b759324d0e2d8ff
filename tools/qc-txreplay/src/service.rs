//! # Replay Driver
//!
//! Streams an export file line by line, groups transactions into per-block
//! batches and hands each completed batch to a [`BatchDispatcher`].
//!
//! ```text
//! AwaitingHeader ──header──► AccumulatingBatch ──header / EOF──► dispatch
//!        ▲                                                          │
//!        └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every declared `num` is checked against the transaction lines that
//! follow it. Batch boundaries are paced with the configured delay.

use std::path::Path;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::domain::{Batch, BatchEntry, ExportLine, SectionHeader};
use crate::error::ReplayError;
use crate::ports::BatchDispatcher;
use crate::Result;

/// Outcome of a completed replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Block headers read
    pub sections: u64,
    /// Transaction lines read
    pub transactions_read: u64,
    /// Transactions sent (RPC mode) or packed into blocks (direct mode)
    pub sent_or_packed: u64,
    /// Failed submissions or dropped duplicates
    pub errors: u64,
    /// Blocks committed (direct mode)
    pub blocks_committed: u64,
    /// Ledger height after the replay (direct mode)
    pub final_height: Option<u32>,
}

/// Section currently being accumulated.
struct OpenSection {
    header: SectionHeader,
    line_no: usize,
    line: String,
    batch: Batch,
}

impl OpenSection {
    fn check_count(&self) -> Result<()> {
        let read = self.batch.len() as u64;
        if read != u64::from(self.header.count) {
            return Err(ReplayError::input_format(
                self.line_no,
                &self.line,
                format!(
                    "block {} declares {} transactions but {} were read",
                    self.header.height, self.header.count, read
                ),
            ));
        }
        Ok(())
    }
}

/// Drives one replay through a dispatcher.
pub struct ReplayDriver<D: BatchDispatcher> {
    dispatcher: D,
    delay: Duration,
}

impl<D: BatchDispatcher> ReplayDriver<D> {
    /// Driver feeding `dispatcher`, pausing `delay` between batches.
    pub fn new(dispatcher: D, delay: Duration) -> Self {
        Self { dispatcher, delay }
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Consume the driver, returning the dispatcher.
    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    /// Replay the export file at `path`.
    pub async fn run_file(&mut self, path: &Path) -> Result<ReplaySummary> {
        let file = File::open(path).await?;
        info!(
            "[qc-txreplay] 🚀 Replaying {} ({} mode)",
            path.display(),
            self.dispatcher.mode()
        );
        self.run(BufReader::new(file)).await
    }

    /// Replay an export stream.
    ///
    /// Fails on the first malformed line, count mismatch, construction or
    /// commit error. Blocks committed before the failure stay committed.
    pub async fn run<R>(&mut self, input: R) -> Result<ReplaySummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut pacer = self.pacer();
        let mut lines = input.lines();
        let mut line_no = 0usize;
        let mut section: Option<OpenSection> = None;
        let mut sections = 0u64;
        let mut transactions_read = 0u64;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let parsed =
                ExportLine::parse(&line).map_err(|e| ReplayError::input_format(line_no, &line, e))?;

            match parsed {
                None => continue,
                Some(ExportLine::Header(header)) => {
                    if let Some(done) = section.take() {
                        done.check_count()?;
                        self.dispatch(done.batch).await?;
                        if let Some(pacer) = pacer.as_mut() {
                            pacer.tick().await;
                        }
                    }
                    debug!(
                        "[qc-txreplay] Block {} declares {} txs",
                        header.height, header.count
                    );
                    sections += 1;
                    section = Some(OpenSection {
                        batch: Batch::new(header.height, header.count as usize),
                        header,
                        line_no,
                        line,
                    });
                }
                Some(ExportLine::Transaction(record)) => {
                    let open = section.as_mut().ok_or_else(|| {
                        ReplayError::input_format(line_no, &line, "transaction before any block header")
                    })?;
                    if open.batch.len() as u64 >= u64::from(open.header.count) {
                        return Err(ReplayError::input_format(
                            line_no,
                            &line,
                            format!(
                                "block {} declares only {} transactions",
                                open.header.height, open.header.count
                            ),
                        ));
                    }
                    let transaction = record
                        .decode()
                        .map_err(|e| ReplayError::input_format(line_no, &line, e))?;
                    open.batch.entries.push(BatchEntry {
                        hash: record.hash,
                        raw_hex: record.raw_hex,
                        transaction,
                    });
                    transactions_read += 1;
                }
            }
        }

        if let Some(done) = section.take() {
            done.check_count()?;
            self.dispatch(done.batch).await?;
        }
        self.dispatcher.finish().await?;

        let stats = self.dispatcher.stats();
        let summary = ReplaySummary {
            sections,
            transactions_read,
            sent_or_packed: stats.delivered,
            errors: stats.errors,
            blocks_committed: stats.blocks_committed,
            final_height: stats.chain_height,
        };
        info!(
            "[qc-txreplay] ✅ Replay complete: {} blocks, {} txs read, {} {}, {} errors",
            summary.sections,
            summary.transactions_read,
            summary.sent_or_packed,
            self.delivered_label(),
            summary.errors
        );
        Ok(summary)
    }

    async fn dispatch(&mut self, batch: Batch) -> Result<()> {
        let source_height = batch.source_height;
        let size = batch.len();
        self.dispatcher.dispatch(batch).await?;

        let stats = self.dispatcher.stats();
        info!(
            "[qc-txreplay] Block {} ({} txs) handed over: {} {}, {} errors",
            source_height,
            size,
            stats.delivered,
            self.delivered_label(),
            stats.errors
        );
        Ok(())
    }

    fn delivered_label(&self) -> &'static str {
        match self.dispatcher.mode() {
            "direct" => "packed",
            _ => "sent",
        }
    }

    fn pacer(&self) -> Option<Interval> {
        if self.delay.is_zero() {
            return None;
        }
        let mut pacer = interval_at(Instant::now() + self.delay, self.delay);
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(pacer)
    }
}
