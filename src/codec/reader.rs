use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::buffer::{compress_bound, CompressedBlock};
use super::header::{ArchiveHeader, BlockHeader, SIZE_BLOCK_HEADER, SIZE_HEADER};
use super::settings::{CompressionSettings, DatasetType};
use crate::error::{HeaderError, ReadError, Result};

/// Streaming access to the blocks of an open archive
///
/// This is the read side of the codec gateway. A source hands out one compressed
/// block at a time into a caller-owned [`CompressedBlock`] and reports the immutable
/// properties needed to decode those blocks with [`decode_block`](super::decode_block).
pub trait BlockSource {
    /// Fills `block` with the next compressed block
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If a block was read
    /// * `Ok(false)` - If the archive has no blocks left
    /// * `Err(_)` - If the next block is truncated or its header is invalid
    fn next_block(&mut self, block: &mut CompressedBlock) -> Result<bool>;

    /// Dataset type of the records stored in the archive
    fn dataset_type(&self) -> DatasetType;

    /// Settings the archive's blocks were compressed with
    fn compression_settings(&self) -> CompressionSettings;

    /// Capacity needed for the decoded text of any block
    fn text_capacity(&self) -> usize {
        self.compression_settings().block_size()
    }

    /// Capacity needed for the compressed bytes of any block
    fn block_capacity(&self) -> usize {
        compress_bound(self.text_capacity())
    }

    /// Finishes reading and releases the archive
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

/// Memory-mapped reader over an archive file
///
/// The file is mapped once on open and its blocks are handed out sequentially.
/// Only the block currently being decoded is copied out of the map, so memory use
/// stays bounded by the block buffers regardless of archive size.
///
/// # Examples
///
/// ```rust,no_run
/// use seqarc::codec::{decode_block, ArchiveReader, BlockSource, CompressedBlock, DecodedBlock};
///
/// let mut reader = ArchiveReader::open_for_read("reads.sqa").unwrap();
/// let mut block = CompressedBlock::new(reader.block_capacity());
/// let mut text = DecodedBlock::new(reader.text_capacity());
/// let settings = reader.compression_settings();
/// while reader.next_block(&mut block).unwrap() {
///     decode_block(reader.dataset_type(), &settings, &block, &mut text).unwrap();
///     print!("{}", text.to_text().unwrap());
/// }
/// reader.finish().unwrap();
/// ```
pub struct ArchiveReader {
    /// Path of the archive
    path: PathBuf,

    /// Memory-mapped file contents
    mmap: Mmap,

    /// Parsed file header
    header: ArchiveHeader,

    /// Current cursor position in the file (in bytes)
    pos: usize,

    /// Number of blocks handed out so far
    blocks: usize,
}
impl ArchiveReader {
    /// Opens an archive, maps it and validates its header
    ///
    /// # Errors
    ///
    /// * I/O errors if the file can't be opened or memory-mapped
    /// * `ReadError::InvalidFileType` if the path doesn't point to a regular file
    /// * `HeaderError::Truncated` if the file is shorter than a header
    /// * Header validation errors from [`ArchiveHeader::from_bytes`]
    pub fn open_for_read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(ReadError::InvalidFileType.into());
        }
        let len = metadata.len() as usize;
        if len < SIZE_HEADER {
            return Err(HeaderError::Truncated(len).into());
        }

        // Safety: the file is opened read-only and is not modified while mapped
        let mmap = unsafe { Mmap::map(&file)? };

        let header = {
            let mut header_bytes = [0u8; SIZE_HEADER];
            header_bytes.copy_from_slice(&mmap[..SIZE_HEADER]);
            ArchiveHeader::from_bytes(&header_bytes)?
        };
        log::debug!(
            "opened archive {} ({} bytes, block size {})",
            path.as_ref().display(),
            len,
            header.block_size()
        );

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            mmap,
            header,
            pos: SIZE_HEADER,
            blocks: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> ArchiveHeader {
        self.header
    }

    #[must_use]
    pub fn blocks_read(&self) -> usize {
        self.blocks
    }
}

impl BlockSource for ArchiveReader {
    fn next_block(&mut self, block: &mut CompressedBlock) -> Result<bool> {
        block.clear();

        if self.pos == self.mmap.len() {
            return Ok(false);
        }
        if self.pos + SIZE_BLOCK_HEADER > self.mmap.len() {
            return Err(ReadError::UnexpectedEndOfFile(self.pos).into());
        }
        let mut header_bytes = [0u8; SIZE_BLOCK_HEADER];
        header_bytes.copy_from_slice(&self.mmap[self.pos..self.pos + SIZE_BLOCK_HEADER]);
        let header = BlockHeader::from_bytes(&header_bytes, self.pos)?;
        self.pos += SIZE_BLOCK_HEADER;

        // The size field is untrusted and may be arbitrarily large
        let remaining = self.mmap.len() - self.pos;
        let size = match usize::try_from(header.size) {
            Ok(size) if size <= remaining => size,
            _ => return Err(ReadError::UnexpectedEndOfFile(self.pos).into()),
        };
        block.fill(header, &self.mmap[self.pos..self.pos + size])?;
        self.pos += size;
        self.blocks += 1;

        log::trace!(
            "block {} of {}: {} compressed bytes, {} records",
            self.blocks,
            self.path.display(),
            size,
            header.records
        );
        Ok(true)
    }

    fn dataset_type(&self) -> DatasetType {
        self.header.dataset
    }

    fn compression_settings(&self) -> CompressionSettings {
        self.header.settings
    }

    fn finish(self) -> Result<()> {
        if self.pos < self.mmap.len() {
            log::debug!(
                "closing {} with {} unread bytes",
                self.path.display(),
                self.mmap.len() - self.pos
            );
        } else {
            log::debug!("finished {} after {} blocks", self.path.display(), self.blocks);
        }
        Ok(())
    }
}
