//! # Block Archive
//!
//! Compressed bulk export of a block range, written after a direct-mode
//! replay so the rebuilt chain can be shipped as one file.
//!
//! ## Layout
//!
//! ```text
//! "QCBA"                       magic
//! [len:u32 LE][metadata]       bincode ArchiveMetadata
//! [len:u32 LE][block]          compressed block bytes, one per height
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared_types::Block;
use tracing::info;

use crate::adapters::compression::{BlockCompressor, CompressionScheme};
use crate::error::ArchiveError;
use crate::ports::ChainState;

/// File magic.
pub const ARCHIVE_MAGIC: &[u8; 4] = b"QCBA";

/// Current format version.
pub const ARCHIVE_VERSION: u32 = 1;

/// Archive header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Format version
    pub version: u32,
    /// Per-block compression
    pub compression: CompressionScheme,
    /// First archived height
    pub start_height: u32,
    /// Last archived height (inclusive)
    pub end_height: u32,
}

impl ArchiveMetadata {
    /// Number of blocks in the archive.
    pub fn block_count(&self) -> u64 {
        u64::from(self.end_height) - u64::from(self.start_height) + 1
    }
}

fn write_record<W: Write>(out: &mut W, bytes: &[u8]) -> Result<(), ArchiveError> {
    out.write_all(&(bytes.len() as u32).to_le_bytes())?;
    out.write_all(bytes)?;
    Ok(())
}

/// Read one length-prefixed record. The buffer grows with the bytes actually
/// present, never to the untrusted prefix.
fn read_record<R: Read>(input: &mut R, what: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut len = [0u8; 4];
    input.read_exact(&mut len).map_err(|e| truncated(e, what))?;
    let len = u64::from(u32::from_le_bytes(len));

    let mut bytes = Vec::new();
    input.by_ref().take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(ArchiveError::Truncated(format!(
            "{what} declares {len} bytes, {} present",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn truncated(e: std::io::Error, what: &str) -> ArchiveError {
    if e.kind() == ErrorKind::UnexpectedEof {
        ArchiveError::Truncated(format!("unexpected end of file in {what}"))
    } else {
        ArchiveError::Io(e)
    }
}

/// Streams blocks into an archive.
pub struct BlockArchiveWriter<W: Write> {
    out: W,
    compressor: Box<dyn BlockCompressor>,
    metadata: ArchiveMetadata,
    next_height: u32,
}

impl<W: Write> BlockArchiveWriter<W> {
    /// Write the archive header for heights `start_height..=end_height`.
    pub fn new(
        mut out: W,
        compression: CompressionScheme,
        start_height: u32,
        end_height: u32,
    ) -> Result<Self, ArchiveError> {
        let metadata = ArchiveMetadata {
            version: ARCHIVE_VERSION,
            compression,
            start_height,
            end_height,
        };
        out.write_all(ARCHIVE_MAGIC)?;
        let encoded =
            bincode::serialize(&metadata).map_err(|e| ArchiveError::Codec(e.to_string()))?;
        write_record(&mut out, &encoded)?;

        Ok(Self {
            out,
            compressor: compression.compressor(),
            metadata,
            next_height: start_height,
        })
    }

    /// Append the next block. Blocks must arrive in height order.
    pub fn append(&mut self, block: &Block) -> Result<(), ArchiveError> {
        if block.height() != self.next_height || block.height() > self.metadata.end_height {
            return Err(ArchiveError::MissingBlock(self.next_height));
        }
        let compressed = self.compressor.compress(&block.to_bytes()?)?;
        write_record(&mut self.out, &compressed)?;
        self.next_height = self.next_height.saturating_add(1);
        Ok(())
    }

    /// Flush and return the output, checking the declared range is complete.
    pub fn finish(mut self) -> Result<(ArchiveMetadata, W), ArchiveError> {
        if u64::from(self.next_height) != u64::from(self.metadata.end_height) + 1 {
            return Err(ArchiveError::MissingBlock(self.next_height));
        }
        self.out.flush()?;
        Ok((self.metadata, self.out))
    }
}

/// Write heights `0..=tip` of `chain` to `path`.
///
/// The archive is written to a temporary sibling and renamed into place.
pub fn write_chain_archive<C>(
    chain: &C,
    path: &Path,
    compression: CompressionScheme,
) -> Result<ArchiveMetadata, ArchiveError>
where
    C: ChainState + ?Sized,
{
    let end_height = chain.current_height();
    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path)?;
    let mut writer = BlockArchiveWriter::new(BufWriter::new(file), compression, 0, end_height)?;

    for height in 0..=end_height {
        let block = chain
            .block_at(height)
            .ok_or(ArchiveError::MissingBlock(height))?;
        writer.append(block)?;
    }

    let (metadata, out) = writer.finish()?;
    let file = out
        .into_inner()
        .map_err(|e| ArchiveError::Io(e.into_error()))?;
    file.sync_all()?;
    std::fs::rename(&temp_path, path)?;

    info!(
        "[qc-txreplay] 📦 Archived blocks 0..={} to {} ({})",
        end_height,
        path.display(),
        compression
    );
    Ok(metadata)
}

/// Reads blocks back from an archive.
pub struct BlockArchiveReader<R: Read> {
    input: R,
    metadata: ArchiveMetadata,
    compressor: Box<dyn BlockCompressor>,
    remaining: u64,
}

impl BlockArchiveReader<BufReader<File>> {
    /// Open an archive file.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> BlockArchiveReader<R> {
    /// Read and check the archive header.
    pub fn new(mut input: R) -> Result<Self, ArchiveError> {
        let mut magic = [0u8; 4];
        input
            .read_exact(&mut magic)
            .map_err(|e| truncated(e, "magic"))?;
        if &magic != ARCHIVE_MAGIC {
            return Err(ArchiveError::BadMagic);
        }

        let encoded = read_record(&mut input, "metadata")?;
        let metadata: ArchiveMetadata =
            bincode::deserialize(&encoded).map_err(|e| ArchiveError::Codec(e.to_string()))?;
        if metadata.version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(metadata.version));
        }
        if metadata.end_height < metadata.start_height {
            return Err(ArchiveError::Codec("end height before start height".to_string()));
        }

        Ok(Self {
            compressor: metadata.compression.compressor(),
            remaining: metadata.block_count(),
            metadata,
            input,
        })
    }

    /// Archive header.
    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    fn read_block(&mut self) -> Result<Block, ArchiveError> {
        let compressed = read_record(&mut self.input, "block record")?;
        let bytes = self.compressor.decompress(&compressed)?;
        Ok(Block::from_bytes(&bytes)?)
    }
}

impl<R: Read> Iterator for BlockArchiveReader<R> {
    type Item = Result<Block, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let result = self.read_block();
        if result.is_err() {
            self.remaining = 0;
        }
        Some(result)
    }
}
