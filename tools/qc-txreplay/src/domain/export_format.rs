//! # Export Record Format
//!
//! Line-oriented text, one section per original block:
//!
//! ```text
//! Block <height> num <count>
//! <tx-hash-hex> <raw-tx-hex>     (repeated <count> times)
//! ```
//!
//! Parsing is per line; section bookkeeping (count checks) belongs to the
//! replay driver.

use std::io::{self, Write};

use shared_types::{hash_from_hex, hash_to_hex, Hash, Transaction};

const HEADER_TAG: &str = "Block";
const COUNT_TAG: &str = "num";

/// Section header: original block height and number of records that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Height of the block the transactions came from
    pub height: u32,
    /// Number of transaction records in the section
    pub count: u32,
}

/// One transaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    /// Hash as written in the file
    pub hash: Hash,
    /// Raw transaction encoding, hex
    pub raw_hex: String,
}

impl TxRecord {
    /// Decode the raw encoding and check it hashes to the recorded hash.
    pub fn decode(&self) -> Result<Transaction, String> {
        let raw = hex::decode(&self.raw_hex).map_err(|e| format!("invalid raw hex: {e}"))?;
        let tx = Transaction::decode(&raw).map_err(|e| format!("undecodable transaction: {e}"))?;
        let actual = tx.hash();
        if actual != self.hash {
            return Err(format!(
                "hash mismatch: recorded {}, computed {}",
                hash_to_hex(&self.hash),
                hash_to_hex(&actual)
            ));
        }
        Ok(tx)
    }
}

/// A parsed, non-blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportLine {
    /// `Block <height> num <count>`
    Header(SectionHeader),
    /// `<hash-hex> <raw-hex>`
    Transaction(TxRecord),
}

impl ExportLine {
    /// Parse one line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Ok(None);
        }
        if line.starts_with("Block ") {
            return parse_header(line).map(|h| Some(ExportLine::Header(h)));
        }
        parse_record(line).map(|r| Some(ExportLine::Transaction(r)))
    }
}

fn parse_header(line: &str) -> Result<SectionHeader, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [HEADER_TAG, height, COUNT_TAG, count] => {
            let height = height
                .parse()
                .map_err(|_| format!("invalid block height {height:?}"))?;
            let count = count
                .parse()
                .map_err(|_| format!("invalid transaction count {count:?}"))?;
            Ok(SectionHeader { height, count })
        }
        _ => Err("expected `Block <height> num <count>`".to_string()),
    }
}

fn parse_record(line: &str) -> Result<TxRecord, String> {
    let (hash_hex, raw_hex) = line
        .split_once(' ')
        .ok_or_else(|| "expected `<hash-hex> <raw-tx-hex>`".to_string())?;
    let raw_hex = raw_hex.trim();
    if raw_hex.is_empty() || raw_hex.contains(char::is_whitespace) {
        return Err("expected exactly two fields".to_string());
    }
    let hash = hash_from_hex(hash_hex).map_err(|e| format!("invalid transaction hash: {e}"))?;
    Ok(TxRecord {
        hash,
        raw_hex: raw_hex.to_string(),
    })
}

/// Writes export sections in the format [`ExportLine::parse`] reads.
///
/// The replay commands only consume exports. This is the encoder for whatever
/// produces them: a chain exporter, or fixtures for replay runs.
pub struct ExportWriter<W: Write> {
    out: W,
    sections: u64,
    transactions: u64,
}

impl<W: Write> ExportWriter<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self {
            out,
            sections: 0,
            transactions: 0,
        }
    }

    /// Write one section for the block at `height`.
    pub fn write_section(&mut self, height: u32, transactions: &[Transaction]) -> io::Result<()> {
        writeln!(
            self.out,
            "{HEADER_TAG} {height} {COUNT_TAG} {}",
            transactions.len()
        )?;
        for tx in transactions {
            let raw = tx
                .encode_hex()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(self.out, "{} {}", hash_to_hex(&tx.hash()), raw)?;
        }
        self.sections += 1;
        self.transactions += transactions.len() as u64;
        Ok(())
    }

    /// Sections written so far.
    pub fn sections(&self) -> u64 {
        self.sections
    }

    /// Transactions written so far.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Flush and return the inner stream.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
