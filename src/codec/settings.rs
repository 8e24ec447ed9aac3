//! # Archive configuration
//!
//! Two immutable property sets travel with every archive and are needed to decode
//! each of its blocks:
//!
//! * [`DatasetType`] describes the FASTQ flavour of the records (quality offset and
//!   whether `+` lines repeat the record title).
//! * [`CompressionSettings`] describes how blocks were produced (ZSTD level, block
//!   size and whether blocks carry checksums).
//!
//! Both are written into the archive header and read back when the archive is opened.

use crate::error::{Result, SettingsError};

/// Smallest accepted ZSTD compression level
pub const MIN_COMPRESSION_LEVEL: i32 = 1;

/// Largest accepted ZSTD compression level
pub const MAX_COMPRESSION_LEVEL: i32 = 22;

/// Default ZSTD compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Smallest accepted block size in megabytes
pub const MIN_BLOCK_SIZE_MB: u32 = 1;

/// Largest accepted block size in megabytes
pub const MAX_BLOCK_SIZE_MB: u32 = 1024;

/// Default block size in megabytes
pub const DEFAULT_BLOCK_SIZE_MB: u32 = 8;

/// Phred+33 quality encoding (Sanger / Illumina 1.8+)
pub const QUALITY_OFFSET_33: u8 = 33;

/// Phred+64 quality encoding (Illumina 1.3 - 1.7)
pub const QUALITY_OFFSET_64: u8 = 64;

/// Description of the records stored in an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetType {
    /// ASCII offset of quality scores (33 or 64)
    pub quality_offset: u8,

    /// Whether every `+` line repeats the title of its record
    ///
    /// When set, the title is stripped from `+` lines on write and restored on decode.
    pub plus_repetition: bool,
}
impl Default for DatasetType {
    fn default() -> Self {
        Self {
            quality_offset: QUALITY_OFFSET_33,
            plus_repetition: false,
        }
    }
}
impl DatasetType {
    pub fn new(quality_offset: u8, plus_repetition: bool) -> Result<Self> {
        validate_quality_offset(quality_offset)?;
        Ok(Self {
            quality_offset,
            plus_repetition,
        })
    }
}

pub(crate) fn validate_quality_offset(offset: u8) -> Result<()> {
    match offset {
        QUALITY_OFFSET_33 | QUALITY_OFFSET_64 => Ok(()),
        _ => Err(SettingsError::InvalidQualityOffset(offset).into()),
    }
}

/// Parameters used to compress the blocks of an archive
///
/// Fields are private so every value is range-checked by its setter.
///
/// # Examples
///
/// ```
/// use seqarc::CompressionSettings;
///
/// let mut settings = CompressionSettings::default();
/// settings.set_level(9).unwrap();
/// settings.set_block_size_mb(4).unwrap();
/// assert_eq!(settings.block_size(), 4 * 1024 * 1024);
///
/// assert!(settings.set_level(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    level: i32,
    block_size_mb: u32,
    checksum: bool,
}
impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
            block_size_mb: DEFAULT_BLOCK_SIZE_MB,
            checksum: true,
        }
    }
}
impl CompressionSettings {
    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn set_level(&mut self, level: i32) -> Result<()> {
        if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&level) {
            return Err(SettingsError::InvalidCompressionLevel(
                level,
                MIN_COMPRESSION_LEVEL,
                MAX_COMPRESSION_LEVEL,
            )
            .into());
        }
        self.level = level;
        Ok(())
    }

    #[must_use]
    pub fn block_size_mb(&self) -> u32 {
        self.block_size_mb
    }

    pub fn set_block_size_mb(&mut self, block_size_mb: u32) -> Result<()> {
        if !(MIN_BLOCK_SIZE_MB..=MAX_BLOCK_SIZE_MB).contains(&block_size_mb) {
            return Err(SettingsError::InvalidBlockSize(
                block_size_mb,
                MIN_BLOCK_SIZE_MB,
                MAX_BLOCK_SIZE_MB,
            )
            .into());
        }
        self.block_size_mb = block_size_mb;
        Ok(())
    }

    /// Block size in bytes: the maximum decoded text held by one block
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size_mb as usize * 1024 * 1024
    }

    #[must_use]
    pub fn checksum(&self) -> bool {
        self.checksum
    }

    pub fn set_checksum(&mut self, checksum: bool) {
        self.checksum = checksum;
    }

    /// Builds settings from raw header values, validating each of them
    pub(crate) fn from_parts(level: i32, block_size_mb: u32, checksum: bool) -> Result<Self> {
        let mut settings = Self {
            checksum,
            ..Self::default()
        };
        settings.set_level(level)?;
        settings.set_block_size_mb(block_size_mb)?;
        Ok(settings)
    }
}
