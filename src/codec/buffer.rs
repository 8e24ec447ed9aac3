use super::header::BlockHeader;
use crate::error::{ReadError, Result};

/// Worst-case growth of a ZSTD frame over its input, plus the frame header
///
/// Mirrors `ZSTD_COMPRESSBOUND` closely enough to size the compressed block buffer.
#[must_use]
pub fn compress_bound(size: usize) -> usize {
    size + (size >> 8) + 1024
}

/// Reusable buffer holding exactly one block's compressed bytes
///
/// The buffer has a fixed capacity chosen when the archive is opened. It is filled
/// by [`BlockSource::next_block`](super::BlockSource::next_block) and consumed by
/// [`decode_block`](super::decode_block); clearing it keeps the allocation.
#[derive(Debug)]
pub struct CompressedBlock {
    header: BlockHeader,
    data: Vec<u8>,
    capacity: usize,
}
impl CompressedBlock {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            header: BlockHeader::default(),
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Replaces the contents with one block's header and payload
    ///
    /// # Errors
    ///
    /// * `ReadError::BlockExceedsCapacity` if the payload does not fit
    pub fn fill(&mut self, header: BlockHeader, payload: &[u8]) -> Result<()> {
        self.clear();
        if payload.len() > self.capacity {
            return Err(ReadError::BlockExceedsCapacity {
                size: payload.len(),
                capacity: self.capacity,
            }
            .into());
        }
        self.header = header;
        self.data.extend_from_slice(payload);
        Ok(())
    }

    #[must_use]
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resets to empty, retaining the allocation
    pub fn clear(&mut self) {
        self.header = BlockHeader::default();
        self.data.clear();
    }
}

/// Reusable buffer holding exactly one block's decoded text
#[derive(Debug)]
pub struct DecodedBlock {
    data: Vec<u8>,
    capacity: usize,
}
impl DecodedBlock {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resets to empty, retaining the allocation
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Copies the decoded text out as an owned string
    pub fn to_text(&self) -> Result<String> {
        Ok(std::str::from_utf8(&self.data)?.to_owned())
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}
