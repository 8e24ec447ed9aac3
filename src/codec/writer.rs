//! Writer implementation for archives
//!
//! The writer packs whole FASTQ records into blocks whose decoded text never exceeds
//! the block size of the archive, so every block boundary is also a record (and line)
//! boundary. Each block is compressed independently with ZSTD.
//!
//! # Example
//!
//! ```rust,no_run
//! use seqarc::codec::ArchiveWriterBuilder;
//! use seqarc::FastqRecord;
//! use std::fs::File;
//!
//! let file = File::create("example.sqa").unwrap();
//! let mut writer = ArchiveWriterBuilder::default().build(file).unwrap();
//!
//! let record = FastqRecord::new("read1", "ACGTACGT", "", "IIIIFFFF");
//! writer.write_record(&record).unwrap();
//!
//! // Writer will automatically finish when dropped
//! writer.finish().unwrap();
//! ```

use std::io::Write;

use xxhash_rust::xxh32::xxh32;
use zstd::Encoder as ZstdEncoder;

use super::decode::CHECKSUM_SEED;
use super::header::{ArchiveHeader, BlockHeader};
use super::settings::{CompressionSettings, DatasetType};
use crate::error::{Result, WriteError};
use crate::record::{FastqRecord, LINES_PER_RECORD};

/// A builder for creating configured [`ArchiveWriter`] instances
#[derive(Default)]
pub struct ArchiveWriterBuilder {
    /// Dataset type recorded in the header
    dataset: Option<DatasetType>,
    /// Compression settings recorded in the header
    settings: Option<CompressionSettings>,
}
impl ArchiveWriterBuilder {
    #[must_use]
    pub fn dataset(mut self, dataset: DatasetType) -> Self {
        self.dataset = Some(dataset);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: CompressionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Builds the writer and writes the archive header to `inner`
    pub fn build<W: Write>(self, inner: W) -> Result<ArchiveWriter<W>> {
        ArchiveWriter::new(
            inner,
            ArchiveHeader::new(
                self.dataset.unwrap_or_default(),
                self.settings.unwrap_or_default(),
            ),
        )
    }
}

/// Writer for archive files
///
/// Records are buffered into the current block until the next one would push the
/// block's decoded text past the block size, at which point the block is compressed
/// and written out. Call [`ArchiveWriter::finish`] to flush the last block; dropping
/// the writer finishes it as well but can only log a failure.
pub struct ArchiveWriter<W: Write> {
    /// Inner Writer
    inner: W,

    /// Header of the file
    header: ArchiveHeader,

    /// Pending block
    cblock: BlockWriter,

    /// Number of records accepted so far
    records: usize,

    /// Number of blocks written so far
    blocks: usize,
}
impl<W: Write> ArchiveWriter<W> {
    pub fn new(mut inner: W, header: ArchiveHeader) -> Result<Self> {
        header.write_bytes(&mut inner)?;
        Ok(Self {
            inner,
            header,
            cblock: BlockWriter::new(&header),
            records: 0,
            blocks: 0,
        })
    }

    #[must_use]
    pub fn header(&self) -> ArchiveHeader {
        self.header
    }

    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records
    }

    #[must_use]
    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    /// Adds a record to the current block, flushing the block first if the record
    /// would not fit
    ///
    /// # Errors
    ///
    /// * `WriteError::EmbeddedNewline` if a field contains a line break
    /// * `WriteError::InvalidQuality` if a quality byte is below the quality offset
    /// * `WriteError::PlusLineMismatch` if the dataset repeats titles on `+` lines and
    ///   this record's `+` line is neither empty nor its title
    /// * `WriteError::RecordSizeExceedsBlockSize` if the record alone is larger than a block
    pub fn write_record(&mut self, record: &FastqRecord) -> Result<()> {
        self.validate(record)?;

        let record_size = record.byte_size();
        if self.cblock.exceeds_block_size(record_size)? {
            self.flush_block()?;
        }
        self.cblock.write_record(record, self.header.dataset.plus_repetition);
        self.records += 1;
        Ok(())
    }

    /// Flushes any pending records and writes `text` verbatim as a block of its own
    ///
    /// Nothing is written for empty text. With plus repetition enabled the text must
    /// consist of whole FASTQ records whose `+` lines are bare or repeat their titles.
    pub fn write_block(&mut self, text: &[u8]) -> Result<()> {
        self.flush_block()?;
        if text.is_empty() {
            return Ok(());
        }
        if text.len() > self.cblock.block_size {
            return Err(
                WriteError::RecordSizeExceedsBlockSize(text.len(), self.cblock.block_size).into(),
            );
        }
        self.cblock
            .write_text(text, self.header.dataset.plus_repetition)?;
        self.flush_block()
    }

    /// Flushes the pending block and the inner writer
    pub fn finish(&mut self) -> Result<()> {
        self.flush_block()?;
        self.inner.flush()?;
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.cblock.flush(&mut self.inner)? {
            self.blocks += 1;
        }
        Ok(())
    }

    fn validate(&self, record: &FastqRecord) -> Result<()> {
        for field in [
            &record.title,
            &record.sequence,
            &record.plus,
            &record.quality,
        ] {
            if field.contains(['\n', '\r']) {
                return Err(WriteError::EmbeddedNewline(record.title.clone()).into());
            }
        }

        let offset = self.header.dataset.quality_offset;
        if let Some(&byte) = record.quality.as_bytes().iter().find(|&&b| b < offset) {
            return Err(WriteError::InvalidQuality { byte, offset }.into());
        }

        // An empty `+` line is stored bare just like a repeated title
        if self.header.dataset.plus_repetition
            && !record.plus.is_empty()
            && record.plus != record.title
        {
            return Err(WriteError::PlusLineMismatch(record.title.clone()).into());
        }
        Ok(())
    }
}

impl<W: Write> Drop for ArchiveWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("ArchiveWriter: failed to finish writing: {e}");
        }
    }
}

struct BlockWriter {
    /// Decoded size of the pending records
    pos: usize,
    /// Number of pending records
    records: u32,
    /// Maximum decoded size of a block
    block_size: usize,
    /// Compression level
    level: i32,
    /// Whether block checksums are written
    checksum: bool,
    /// Stored (uncompressed) buffer
    ubuf: Vec<u8>,
    /// Compressed buffer
    zbuf: Vec<u8>,
}
impl BlockWriter {
    fn new(header: &ArchiveHeader) -> Self {
        Self {
            pos: 0,
            records: 0,
            block_size: header.block_size(),
            level: header.settings.level(),
            checksum: header.settings.checksum(),
            ubuf: Vec::new(),
            zbuf: Vec::new(),
        }
    }

    fn exceeds_block_size(&self, record_size: usize) -> Result<bool> {
        if record_size > self.block_size {
            return Err(WriteError::RecordSizeExceedsBlockSize(record_size, self.block_size).into());
        }
        Ok(self.pos + record_size > self.block_size)
    }

    fn write_record(&mut self, record: &FastqRecord, strip_plus: bool) {
        self.pos += record.byte_size();
        self.records += 1;
        if strip_plus {
            let stored = FastqRecord {
                plus: String::new(),
                ..record.clone()
            };
            stored.write_text(&mut self.ubuf);
        } else {
            record.write_text(&mut self.ubuf);
        }
    }

    /// Adds raw text as the contents of the pending (empty) block
    fn write_text(&mut self, text: &[u8], strip_plus: bool) -> Result<()> {
        self.pos += text.len();
        let newlines = memchr::memchr_iter(b'\n', text).count();
        self.records += (newlines / LINES_PER_RECORD) as u32;
        if !strip_plus {
            self.ubuf.extend_from_slice(text);
            return Ok(());
        }

        let mut lines = text.split_inclusive(|&b| b == b'\n');
        while let Some(title) = lines.next() {
            let (Some(sequence), Some(plus), Some(quality)) =
                (lines.next(), lines.next(), lines.next())
            else {
                self.clear();
                return Err(WriteError::MalformedBlockText.into());
            };
            let repeated = title.len() > 1
                && title.starts_with(b"@")
                && (plus == b"+\n" || (plus.starts_with(b"+") && plus[1..] == title[1..]));
            if !repeated || !quality.ends_with(b"\n") {
                self.clear();
                return Err(WriteError::MalformedBlockText.into());
            }
            self.ubuf.extend_from_slice(title);
            self.ubuf.extend_from_slice(sequence);
            self.ubuf.extend_from_slice(b"+\n");
            self.ubuf.extend_from_slice(quality);
        }
        Ok(())
    }

    /// Compresses and writes the pending block
    ///
    /// Returns whether a block was written.
    fn flush<W: Write>(&mut self, inner: &mut W) -> Result<bool> {
        // Skip if the block is empty
        if self.ubuf.is_empty() {
            return Ok(false);
        }

        let checksum = if self.checksum {
            xxh32(&self.ubuf, CHECKSUM_SEED)
        } else {
            0
        };

        self.zbuf.clear();
        let mut encoder = ZstdEncoder::new(&mut self.zbuf, self.level)?;
        encoder.write_all(&self.ubuf)?;
        encoder.finish()?;

        let header = BlockHeader::new(
            self.zbuf.len() as u64,
            self.ubuf.len() as u64,
            self.records,
            checksum,
        );
        header.write_bytes(inner)?;
        inner.write_all(&self.zbuf)?;

        self.clear();
        Ok(true)
    }

    fn clear(&mut self) {
        self.pos = 0;
        self.records = 0;
        self.ubuf.clear();
        self.zbuf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::header::{SIZE_BLOCK_HEADER, SIZE_HEADER};
    use crate::error::Error;

    fn small_settings() -> CompressionSettings {
        let mut settings = CompressionSettings::default();
        settings.set_block_size_mb(1).unwrap();
        settings
    }

    #[test]
    fn test_header_only_archive() -> Result<()> {
        let mut buffer = Vec::new();
        {
            let mut writer = ArchiveWriterBuilder::default().build(&mut buffer)?;
            writer.finish()?;
            assert_eq!(writer.blocks_written(), 0);
        }
        assert_eq!(buffer.len(), SIZE_HEADER);
        Ok(())
    }

    #[test]
    fn test_records_share_a_block() -> Result<()> {
        let mut buffer = Vec::new();
        let mut writer = ArchiveWriterBuilder::default()
            .settings(small_settings())
            .build(&mut buffer)?;
        for i in 0..10 {
            writer.write_record(&FastqRecord::new(format!("r{i}"), "ACGT", "", "IIII"))?;
        }
        writer.finish()?;
        assert_eq!(writer.records_written(), 10);
        assert_eq!(writer.blocks_written(), 1);
        Ok(())
    }

    #[test]
    fn test_block_boundary_on_record_boundary() -> Result<()> {
        let seq = "A".repeat(300 * 1024);
        let qual = "I".repeat(300 * 1024);
        let mut buffer = Vec::new();
        let mut writer = ArchiveWriterBuilder::default()
            .settings(small_settings())
            .build(&mut buffer)?;
        // Each record is ~600KB, so only one fits a 1MB block
        for i in 0..3 {
            writer.write_record(&FastqRecord::new(format!("r{i}"), &seq, "", &qual))?;
        }
        writer.finish()?;
        assert_eq!(writer.blocks_written(), 3);
        Ok(())
    }

    #[test]
    fn test_record_too_large() {
        let seq = "A".repeat(600 * 1024);
        let mut writer = ArchiveWriterBuilder::default()
            .settings(small_settings())
            .build(Vec::new())
            .unwrap();
        let err = writer
            .write_record(&FastqRecord::new("big", &seq, "", &seq))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::RecordSizeExceedsBlockSize(_, 1_048_576))
        ));
    }

    #[test]
    fn test_write_block_is_its_own_block() -> Result<()> {
        let mut buffer = Vec::new();
        {
            let mut writer = ArchiveWriterBuilder::default().build(&mut buffer)?;
            writer.write_record(&FastqRecord::new("r1", "AC", "", "II"))?;
            writer.write_block(b"AB")?;
            writer.write_block(b"")?;
            writer.write_block(b"CD\n")?;
            writer.finish()?;
            assert_eq!(writer.blocks_written(), 3);
        }
        assert!(buffer.len() > SIZE_HEADER + 3 * SIZE_BLOCK_HEADER);
        Ok(())
    }

    #[test]
    fn test_validation() {
        let dataset = DatasetType::new(64, true).unwrap();
        let mut writer = ArchiveWriterBuilder::default()
            .dataset(dataset)
            .build(Vec::new())
            .unwrap();

        let err = writer
            .write_record(&FastqRecord::new("r1", "AC", "r1", "!!"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::InvalidQuality {
                byte: b'!',
                offset: 64
            })
        ));

        let err = writer
            .write_record(&FastqRecord::new("r1", "AC", "r2", "hh"))
            .unwrap_err();
        assert!(matches!(err, Error::WriteError(WriteError::PlusLineMismatch(_))));

        // A bare `+` line is stored the same way as a repeated title
        assert!(writer
            .write_record(&FastqRecord::new("r1", "AC", "", "hh"))
            .is_ok());

        let err = writer
            .write_record(&FastqRecord::new("r1\nr2", "AC", "r1\nr2", "hh"))
            .unwrap_err();
        assert!(matches!(err, Error::WriteError(WriteError::EmbeddedNewline(_))));

        assert!(writer
            .write_record(&FastqRecord::new("r1", "AC", "r1", "hh"))
            .is_ok());
    }

    #[test]
    fn test_write_block_plus_repetition() {
        let dataset = DatasetType::new(33, true).unwrap();
        let mut writer = ArchiveWriterBuilder::default()
            .dataset(dataset)
            .build(Vec::new())
            .unwrap();
        assert!(writer.write_block(b"@r1\nAC\n+r1\nII\n").is_ok());
        assert!(writer.write_block(b"@r1\nAC\n+\nII\n").is_ok());
        assert!(matches!(
            writer.write_block(b"@r1\nAC\n+r2\nII\n"),
            Err(Error::WriteError(WriteError::MalformedBlockText))
        ));
        assert!(matches!(
            writer.write_block(b"AB"),
            Err(Error::WriteError(WriteError::MalformedBlockText))
        ));
    }
}
