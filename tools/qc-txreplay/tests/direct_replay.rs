//! Direct-mode replay into an on-disk ledger.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use shared_crypto::{verify_signature, Ed25519KeyPair};
use shared_types::{Block, Transaction};
use tempfile::TempDir;

use qc_txreplay::adapters::{
    load_wallets, BlockArchiveReader, CompressionScheme, KdfParams, LocalCommitDispatcher,
    LocalLedger, WalletFile,
};
use qc_txreplay::domain::{build_genesis_block, ExportWriter, DEFAULT_GENESIS_TIMESTAMP};
use qc_txreplay::ports::{BlockSigner, ChainState};
use qc_txreplay::{ReplayDriver, ReplayError, ReplaySummary, WalletsConfig};

const BOOKKEEPERS: usize = 3;

const LIGHT_KDF: KdfParams = KdfParams {
    log_n: 10,
    r: 8,
    p: 1,
};

fn tx(nonce: u64) -> Transaction {
    Transaction {
        version: 0,
        nonce,
        payer: [9; 20],
        payload: nonce.to_be_bytes().to_vec(),
        signature: vec![],
    }
}

/// Writes wallets plus a `wallets.json` listing them with relative paths.
fn write_wallets(dir: &Path) -> Vec<Arc<dyn BlockSigner>> {
    let mut entries = Vec::new();
    for i in 0..BOOKKEEPERS {
        let name = format!("bookkeeper-{i}.json");
        let password = format!("pw-{i}");
        WalletFile::seal_with_kdf(
            format!("bk-{i}"),
            &Ed25519KeyPair::generate(),
            &password,
            LIGHT_KDF,
        )
        .unwrap()
        .save(&dir.join(&name))
        .unwrap();
        entries.push(format!(r#"{{"Path":"{name}","Password":"{password}"}}"#));
    }
    let list = dir.join("wallets.json");
    std::fs::write(&list, format!(r#"{{"Wallets":[{}]}}"#, entries.join(","))).unwrap();

    load_wallets(&WalletsConfig::load(&list).unwrap()).unwrap()
}

fn write_export(path: &Path, sections: &[(u32, Vec<Transaction>)]) {
    let mut writer = ExportWriter::new(Vec::new());
    for (height, txs) in sections {
        writer.write_section(*height, txs).unwrap();
    }
    std::fs::write(path, writer.finish().unwrap()).unwrap();
}

fn open_ledger(dir: &Path, signers: &[Arc<dyn BlockSigner>]) -> LocalLedger {
    let keys: Vec<_> = signers.iter().map(|s| s.public_key()).collect();
    LocalLedger::open(
        &dir.join("chain"),
        build_genesis_block(&keys, DEFAULT_GENESIS_TIMESTAMP),
    )
    .unwrap()
}

async fn replay(
    dir: &Path,
    signers: &[Arc<dyn BlockSigner>],
    export: &Path,
) -> (Result<ReplaySummary, ReplayError>, LocalLedger) {
    let dispatcher = LocalCommitDispatcher::new(
        open_ledger(dir, signers),
        signers.to_vec(),
        dir.join("replay.qcba"),
    );
    let mut driver = ReplayDriver::new(dispatcher, Duration::ZERO);
    let result = driver.run_file(export).await;
    let ledger = driver.into_dispatcher().into_chain();
    (result, ledger)
}

struct Fixture {
    dir: TempDir,
    signers: Vec<Arc<dyn BlockSigner>>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let signers = write_wallets(dir.path());
        Self { dir, signers }
    }

    fn export(&self, sections: &[(u32, Vec<Transaction>)]) -> std::path::PathBuf {
        let path = self.dir.path().join("txs.dat");
        write_export(&path, sections);
        path
    }
}

#[tokio::test]
async fn test_two_transaction_block_then_empty_section() {
    let fixture = Fixture::new();
    let export = fixture.export(&[(100, vec![tx(1), tx(2)]), (101, vec![])]);

    let (result, ledger) = replay(fixture.dir.path(), &fixture.signers, &export).await;
    let summary = result.unwrap();

    let archived: Vec<_> = BlockArchiveReader::open(&fixture.dir.path().join("replay.qcba"))
        .unwrap()
        .map(|block| block.unwrap().hash())
        .collect();
    let committed: Vec<_> = (0..=1).map(|h| ledger.block_at(h).unwrap().hash()).collect();
    assert_eq!(archived, committed);

    assert_eq!(summary.sections, 2);
    assert_eq!(summary.transactions_read, 2);
    assert_eq!(summary.sent_or_packed, 2);
    assert_eq!(summary.blocks_committed, 1);
    assert_eq!(summary.final_height, Some(1));

    let block = ledger.block_at(1).unwrap();
    assert_eq!(block.transactions, vec![tx(1), tx(2)]);
    assert_eq!(block.header.prev_block_hash, ledger.block_at(0).unwrap().hash());
}

#[tokio::test]
async fn test_every_bookkeeper_signs_in_order() {
    let fixture = Fixture::new();
    let export = fixture.export(&[(5, vec![tx(1)])]);

    let (result, ledger) = replay(fixture.dir.path(), &fixture.signers, &export).await;
    result.unwrap();

    let block = ledger.tip();
    let hash = block.hash();
    assert_eq!(block.header.sig_data.len(), BOOKKEEPERS);
    for (i, signer) in fixture.signers.iter().enumerate() {
        assert_eq!(block.header.bookkeepers[i], signer.public_key());
        verify_signature(&block.header.bookkeepers[i], &hash, &block.header.sig_data[i]).unwrap();
    }

    let decoded = Block::from_bytes(&block.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.hash(), hash);
}

#[tokio::test]
async fn test_blocks_chain_by_previous_hash() {
    let fixture = Fixture::new();
    let sections: Vec<_> = (0..5u64)
        .map(|i| (200 + i as u32, vec![tx(i * 2), tx(i * 2 + 1)]))
        .collect();
    let export = fixture.export(&sections);

    let (result, ledger) = replay(fixture.dir.path(), &fixture.signers, &export).await;
    assert_eq!(result.unwrap().blocks_committed, 5);

    for height in 1..=5 {
        let block = ledger.block_at(height).unwrap();
        let parent = ledger.block_at(height - 1).unwrap();
        assert_eq!(block.height(), parent.height() + 1);
        assert_eq!(block.header.prev_block_hash, parent.hash());
        assert!(block.header.timestamp > parent.header.timestamp);
    }
}

#[tokio::test]
async fn test_second_pass_commits_nothing() {
    let fixture = Fixture::new();
    let export = fixture.export(&[(1, vec![tx(1), tx(2)]), (2, vec![tx(3)])]);

    let (first, _) = replay(fixture.dir.path(), &fixture.signers, &export).await;
    assert_eq!(first.unwrap().blocks_committed, 2);

    let (second, ledger) = replay(fixture.dir.path(), &fixture.signers, &export).await;
    let summary = second.unwrap();
    assert_eq!(summary.blocks_committed, 0);
    assert_eq!(summary.sent_or_packed, 0);
    assert_eq!(summary.errors, 3);
    assert_eq!(summary.final_height, Some(2));
    assert_eq!(ledger.current_height(), 2);
}

#[tokio::test]
async fn test_count_mismatch_is_fatal() {
    let fixture = Fixture::new();
    let export = fixture.export(&[(9, vec![tx(1), tx(2)])]);
    let text = std::fs::read_to_string(&export).unwrap();
    std::fs::write(&export, text.replace("Block 9 num 2", "Block 9 num 3")).unwrap();

    let (result, ledger) = replay(fixture.dir.path(), &fixture.signers, &export).await;
    match result {
        Err(ReplayError::InputFormat { line, .. }) => assert_eq!(line, 1),
        other => panic!("expected input format error, got {other:?}"),
    }
    assert_eq!(ledger.current_height(), 0);
}

#[tokio::test]
async fn test_failure_keeps_committed_blocks() {
    let fixture = Fixture::new();
    let export = fixture.export(&[(1, vec![tx(1)]), (2, vec![tx(2)])]);
    let mut text = std::fs::read_to_string(&export).unwrap();
    text.push_str("not a record\n");
    std::fs::write(&export, text).unwrap();

    let (result, _) = replay(fixture.dir.path(), &fixture.signers, &export).await;
    assert!(matches!(result, Err(ReplayError::InputFormat { line: 5, .. })));

    let reopened = open_ledger(fixture.dir.path(), &fixture.signers);
    assert_eq!(reopened.current_height(), 1);
}

#[tokio::test]
async fn test_archive_matches_ledger() {
    let fixture = Fixture::new();
    let export = fixture.export(&[(1, vec![tx(1)]), (2, vec![]), (3, vec![tx(2), tx(3)])]);
    let archive = fixture.dir.path().join("chain.qcba");

    let dispatcher = LocalCommitDispatcher::new(
        open_ledger(fixture.dir.path(), &fixture.signers),
        fixture.signers.clone(),
        archive.clone(),
    )
    .with_compression(CompressionScheme::Zstd);
    let mut driver = ReplayDriver::new(dispatcher, Duration::ZERO);
    driver.run_file(&export).await.unwrap();

    let reader = BlockArchiveReader::open(&archive).unwrap();
    assert_eq!(reader.metadata().start_height, 0);
    assert_eq!(reader.metadata().end_height, 2);
    let ledger = driver.dispatcher().chain();
    for block in reader {
        let block = block.unwrap();
        assert_eq!(block.hash(), ledger.block_at(block.height()).unwrap().hash());
    }
}
