//! # Codec gateway
//!
//! Everything that knows about the on-disk archive layout lives here. The rest of
//! the crate only uses the gateway contract:
//!
//! * [`ArchiveReader::open_for_read`] opens an archive for streaming reads;
//! * [`BlockSource::next_block`] fetches the next compressed block into a caller buffer;
//! * [`BlockSource::dataset_type`] and [`BlockSource::compression_settings`] expose the
//!   immutable archive properties needed for decoding;
//! * [`decode_block`] decodes one block into a caller text buffer;
//! * [`BlockSource::finish`] releases the archive.
//!
//! Archives are produced with [`ArchiveWriter`]. Its blocks always end on a record
//! boundary, which is what makes per-block line splitting safe downstream.

mod buffer;
mod decode;
mod header;
mod reader;
mod settings;
mod writer;

pub use buffer::{compress_bound, CompressedBlock, DecodedBlock};
pub use decode::decode_block;
pub use header::{ArchiveHeader, BlockHeader, SIZE_BLOCK_HEADER, SIZE_HEADER};
pub use reader::{ArchiveReader, BlockSource};
pub use settings::{
    CompressionSettings, DatasetType, DEFAULT_BLOCK_SIZE_MB, DEFAULT_COMPRESSION_LEVEL,
    MAX_BLOCK_SIZE_MB, MAX_COMPRESSION_LEVEL, MIN_BLOCK_SIZE_MB, MIN_COMPRESSION_LEVEL,
    QUALITY_OFFSET_33, QUALITY_OFFSET_64,
};
pub use writer::{ArchiveWriter, ArchiveWriterBuilder};

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::{Error, HeaderError, ReadError, Result};
    use crate::FastqRecord;

    fn write_archive(records: &[FastqRecord], dataset: DatasetType) -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        {
            let mut writer = ArchiveWriterBuilder::default()
                .dataset(dataset)
                .build(file.as_file_mut())?;
            for record in records {
                writer.write_record(record)?;
            }
            writer.finish()?;
        }
        Ok(file)
    }

    fn read_all(reader: &mut ArchiveReader) -> Result<Vec<u8>> {
        let mut block = CompressedBlock::new(reader.block_capacity());
        let mut text = DecodedBlock::new(reader.text_capacity());
        let settings = reader.compression_settings();
        let mut out = Vec::new();
        while reader.next_block(&mut block)? {
            decode_block(reader.dataset_type(), &settings, &block, &mut text)?;
            out.extend_from_slice(text.as_bytes());
        }
        Ok(out)
    }

    #[test]
    fn test_reader_streams_blocks() -> Result<()> {
        let records = vec![
            FastqRecord::new("r1", "ACGT", "r1", "IIII"),
            FastqRecord::new("r2", "GGCC", "r2", "FFFF"),
        ];
        let file = write_archive(&records, DatasetType::new(33, true)?)?;

        let mut reader = ArchiveReader::open_for_read(file.path())?;
        assert!(reader.dataset_type().plus_repetition);
        let text = read_all(&mut reader)?;
        assert_eq!(text, b"@r1\nACGT\n+r1\nIIII\n@r2\nGGCC\n+r2\nFFFF\n");
        assert_eq!(reader.blocks_read(), 1);

        // Exhausted sources keep reporting exhaustion
        let mut block = CompressedBlock::new(reader.block_capacity());
        assert!(!reader.next_block(&mut block)?);
        assert!(block.is_empty());
        reader.finish()?;
        Ok(())
    }

    #[test]
    fn test_reader_missing_file() {
        let err = ArchiveReader::open_for_read("/nonexistent/reads.sqa").err().unwrap();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_reader_short_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"SQAR")?;
        let err = ArchiveReader::open_for_read(file.path()).err().unwrap();
        assert!(matches!(err, Error::HeaderError(HeaderError::Truncated(4))));
        Ok(())
    }

    #[test]
    fn test_reader_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArchiveReader::open_for_read(dir.path()).err().unwrap();
        assert!(matches!(
            err,
            Error::ReadError(ReadError::InvalidFileType) | Error::IoError(_)
        ));
    }

    #[test]
    fn test_reader_truncated_block() -> Result<()> {
        let records = vec![FastqRecord::new("r1", "ACGT", "", "IIII")];
        let file = write_archive(&records, DatasetType::default())?;
        let bytes = std::fs::read(file.path())?;

        let mut truncated = tempfile::NamedTempFile::new()?;
        truncated.write_all(&bytes[..bytes.len() - 3])?;

        let mut reader = ArchiveReader::open_for_read(truncated.path())?;
        let mut block = CompressedBlock::new(reader.block_capacity());
        let err = reader.next_block(&mut block).unwrap_err();
        assert!(matches!(
            err,
            Error::ReadError(ReadError::UnexpectedEndOfFile(pos)) if pos == SIZE_HEADER + SIZE_BLOCK_HEADER
        ));
        Ok(())
    }

    #[test]
    fn test_reader_huge_block_length() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        ArchiveHeader::default().write_bytes(file.as_file_mut())?;
        BlockHeader::new(u64::MAX - 10, 4, 1, 0).write_bytes(file.as_file_mut())?;
        file.write_all(b"junkjunk")?;

        let mut reader = ArchiveReader::open_for_read(file.path())?;
        let mut block = CompressedBlock::new(reader.block_capacity());
        let err = reader.next_block(&mut block).unwrap_err();
        assert!(matches!(
            err,
            Error::ReadError(ReadError::UnexpectedEndOfFile(pos)) if pos == SIZE_HEADER + SIZE_BLOCK_HEADER
        ));
        assert!(block.is_empty());
        Ok(())
    }

    #[test]
    fn test_bare_plus_line_restored_with_repetition() -> Result<()> {
        let records = vec![
            FastqRecord::new("r1", "ACGT", "", "IIII"),
            FastqRecord::new("r2", "GGCC", "r2", "FFFF"),
        ];
        let file = write_archive(&records, DatasetType::new(33, true)?)?;

        let mut reader = ArchiveReader::open_for_read(file.path())?;
        let text = read_all(&mut reader)?;
        assert_eq!(text, b"@r1\nACGT\n+r1\nIIII\n@r2\nGGCC\n+r2\nFFFF\n");
        Ok(())
    }
}
