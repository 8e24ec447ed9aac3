//! # File and Block Header Definitions
//!
//! An archive consists of one fixed-size file header followed by a series of blocks,
//! each introduced by a fixed-size block header:
//!
//! ```text
//! ┌───────────────────┐
//! │    File Header    │ 32 bytes
//! ├───────────────────┤
//! │   Block Header    │ 32 bytes
//! ├───────────────────┤
//! │  Block Payload    │ compressed size (from the block header)
//! ├───────────────────┤
//! │   Block Header    │ 32 bytes
//! ├───────────────────┤
//! │  Block Payload    │
//! └───────────────────┘
//! ```
//!
//! Both headers include magic numbers to validate file integrity.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian};

use super::settings::{validate_quality_offset, CompressionSettings, DatasetType};
use crate::error::{HeaderError, ReadError, Result};

/// Magic number for file identification: "SQAR" in ASCII (0x52415153)
const MAGIC: u32 = 0x5241_5153;

/// Magic number for block identification: "SQABLOCK" in ASCII (0x4B434F4C42415153)
const BLOCK_MAGIC: u64 = 0x4B43_4F4C_4241_5153;

/// Current format version number
const FORMAT: u8 = 1;

/// Size of the file header in bytes
pub const SIZE_HEADER: usize = 32;

/// Size of the block header in bytes
pub const SIZE_BLOCK_HEADER: usize = 32;

/// Reserved bytes for future use in the file header
pub const RESERVED_BYTES: [u8; 12] = [42; 12];

const MIB: u64 = 1024 * 1024;

/// File header of an archive
///
/// # Layout
///
/// * `magic` - "SQAR" (4 bytes)
/// * `format` - format version (1 byte)
/// * `quality_offset` - 33 or 64 (1 byte)
/// * `plus_repetition` - boolean (1 byte)
/// * `checksum` - boolean (1 byte)
/// * `level` - ZSTD level, `i32` (4 bytes)
/// * `block` - block size in bytes, `u64` (8 bytes)
/// * `reserved` - (12 bytes)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub magic: u32,
    pub format: u8,
    pub dataset: DatasetType,
    pub settings: CompressionSettings,
    pub reserved: [u8; 12],
}
impl Default for ArchiveHeader {
    fn default() -> Self {
        Self::new(DatasetType::default(), CompressionSettings::default())
    }
}
impl ArchiveHeader {
    #[must_use]
    pub fn new(dataset: DatasetType, settings: CompressionSettings) -> Self {
        Self {
            magic: MAGIC,
            format: FORMAT,
            dataset,
            settings,
            reserved: RESERVED_BYTES,
        }
    }

    /// Block size in bytes
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.settings.block_size()
    }

    /// Parses and validates a header from a 32-byte buffer
    ///
    /// # Errors
    ///
    /// * `HeaderError::InvalidMagicNumber` - If the magic number doesn't match "SQAR"
    /// * `HeaderError::InvalidFormatVersion` - If the format version is unsupported
    /// * `HeaderError::InvalidQualityOffset` - If the quality offset is neither 33 nor 64
    /// * `HeaderError::InvalidBlockSize` - If the block size is not a supported whole number of MB
    pub fn from_bytes(buffer: &[u8; SIZE_HEADER]) -> Result<Self> {
        let magic = LittleEndian::read_u32(&buffer[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagicNumber(magic).into());
        }
        let format = buffer[4];
        if format != FORMAT {
            return Err(HeaderError::InvalidFormatVersion(format).into());
        }
        let quality_offset = buffer[5];
        if validate_quality_offset(quality_offset).is_err() {
            return Err(HeaderError::InvalidQualityOffset(quality_offset).into());
        }
        let plus_repetition = buffer[6] != 0;
        let checksum = buffer[7] != 0;
        let level = LittleEndian::read_i32(&buffer[8..12]);
        let block = LittleEndian::read_u64(&buffer[12..20]);
        if block == 0 || block % MIB != 0 || block / MIB > u64::from(u32::MAX) {
            return Err(HeaderError::InvalidBlockSize(block).into());
        }
        let settings = CompressionSettings::from_parts(level, (block / MIB) as u32, checksum)?;

        let mut reserved = [0u8; 12];
        reserved.copy_from_slice(&buffer[20..32]);

        Ok(Self {
            magic,
            format,
            dataset: DatasetType {
                quality_offset,
                plus_repetition,
            },
            settings,
            reserved,
        })
    }

    /// Serializes the header into its 32-byte layout and writes it
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_HEADER];
        LittleEndian::write_u32(&mut buffer[0..4], self.magic);
        buffer[4] = self.format;
        buffer[5] = self.dataset.quality_offset;
        buffer[6] = u8::from(self.dataset.plus_repetition);
        buffer[7] = u8::from(self.settings.checksum());
        LittleEndian::write_i32(&mut buffer[8..12], self.settings.level());
        LittleEndian::write_u64(&mut buffer[12..20], self.block_size() as u64);
        buffer[20..32].copy_from_slice(&self.reserved);
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Reads 32 bytes from a reader and parses them into a header
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_HEADER];
        reader.read_exact(&mut buffer)?;
        Self::from_bytes(&buffer)
    }
}

/// Block header preceding every compressed block payload
///
/// # Layout
///
/// * `magic` - "SQABLOCK" (8 bytes)
/// * `size` - compressed payload size (8 bytes)
/// * `raw` - length of the stored text once decompressed (8 bytes)
/// * `records` - number of FASTQ records in the block (4 bytes)
/// * `checksum` - xxh32 of the stored text, 0 when disabled (4 bytes)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub magic: u64,
    pub size: u64,
    pub raw: u64,
    pub records: u32,
    pub checksum: u32,
}
impl BlockHeader {
    #[must_use]
    pub fn new(size: u64, raw: u64, records: u32, checksum: u32) -> Self {
        Self {
            magic: BLOCK_MAGIC,
            size,
            raw,
            records,
            checksum,
        }
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_BLOCK_HEADER];
        LittleEndian::write_u64(&mut buffer[0..8], self.magic);
        LittleEndian::write_u64(&mut buffer[8..16], self.size);
        LittleEndian::write_u64(&mut buffer[16..24], self.raw);
        LittleEndian::write_u32(&mut buffer[24..28], self.records);
        LittleEndian::write_u32(&mut buffer[28..32], self.checksum);
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Parses a block header, validating its magic number
    ///
    /// # Parameters
    ///
    /// * `buffer` - The 32 header bytes
    /// * `pos` - Byte position of the header in the archive, used for error reporting
    pub fn from_bytes(buffer: &[u8; SIZE_BLOCK_HEADER], pos: usize) -> Result<Self> {
        let magic = LittleEndian::read_u64(&buffer[0..8]);
        if magic != BLOCK_MAGIC {
            return Err(ReadError::InvalidBlockMagicNumber(magic, pos).into());
        }
        let size = LittleEndian::read_u64(&buffer[8..16]);
        let raw = LittleEndian::read_u64(&buffer[16..24]);
        let records = LittleEndian::read_u32(&buffer[24..28]);
        let checksum = LittleEndian::read_u32(&buffer[28..32]);
        Ok(Self::new(size, raw, records, checksum))
    }
}
