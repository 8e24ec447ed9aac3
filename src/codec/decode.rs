use std::io::Read;

use xxhash_rust::xxh32::xxh32;
use zstd::Decoder;

use super::buffer::{CompressedBlock, DecodedBlock};
use super::settings::{CompressionSettings, DatasetType};
use crate::error::{ReadError, Result};

/// Seed used for block checksums
pub(crate) const CHECKSUM_SEED: u32 = 0;

/// Decodes one compressed block into FASTQ text
///
/// This is a pure function of its inputs: the dataset type and compression settings
/// of the archive, and the compressed block. The decoded text replaces the contents
/// of `out`, which never grows past its capacity.
///
/// # Errors
///
/// * I/O errors raised by the ZSTD decoder on corrupt payloads
/// * `ReadError::BlockExceedsCapacity` if the text does not fit into `out`
/// * `ReadError::DecodedSizeMismatch` if the payload length disagrees with the block header
/// * `ReadError::ChecksumMismatch` if checksums are enabled and the text is corrupt
/// * `ReadError::MalformedBlock` if `+` lines must be restored and the text is not FASTQ
pub fn decode_block(
    dataset: DatasetType,
    settings: &CompressionSettings,
    block: &CompressedBlock,
    out: &mut DecodedBlock,
) -> Result<()> {
    out.clear();

    let header = block.header();
    let capacity = out.capacity();
    let expected = header.raw as usize;
    if expected > capacity {
        return Err(ReadError::BlockExceedsCapacity {
            size: expected,
            capacity,
        }
        .into());
    }

    // Reading one byte past the capacity is enough to detect an oversized payload
    let decoder = Decoder::with_buffer(block.as_bytes())?;
    decoder
        .take(capacity as u64 + 1)
        .read_to_end(out.buffer_mut())?;
    if out.len() != expected {
        return Err(ReadError::DecodedSizeMismatch {
            expected,
            got: out.len(),
        }
        .into());
    }

    if settings.checksum() {
        let got = xxh32(out.as_bytes(), CHECKSUM_SEED);
        if got != header.checksum {
            return Err(ReadError::ChecksumMismatch {
                expected: header.checksum,
                got,
            }
            .into());
        }
    }

    if dataset.plus_repetition {
        restore_plus_lines(out.buffer_mut())?;
        if out.len() > capacity {
            return Err(ReadError::BlockExceedsCapacity {
                size: out.len(),
                capacity,
            }
            .into());
        }
    }

    Ok(())
}

/// Rewrites every bare `+` line as `+<title>` using the title of its record
fn restore_plus_lines(text: &mut Vec<u8>) -> Result<()> {
    let capacity = text.capacity();
    let stored = std::mem::replace(text, Vec::with_capacity(capacity));

    let mut lines = stored.split_inclusive(|&b| b == b'\n');
    while let Some(title) = lines.next() {
        let (Some(sequence), Some(plus), Some(quality)) = (lines.next(), lines.next(), lines.next())
        else {
            return Err(ReadError::MalformedBlock("incomplete record at end of block".into()).into());
        };
        if !title.starts_with(b"@") {
            return Err(ReadError::MalformedBlock(format!(
                "title line without '@': {}",
                String::from_utf8_lossy(title).trim_end()
            ))
            .into());
        }
        if plus != b"+\n" {
            return Err(ReadError::MalformedBlock(format!(
                "expected a bare separator line, found: {}",
                String::from_utf8_lossy(plus).trim_end()
            ))
            .into());
        }
        if !quality.ends_with(b"\n") {
            return Err(ReadError::MalformedBlock("unterminated quality line".into()).into());
        }

        text.extend_from_slice(title);
        text.extend_from_slice(sequence);
        text.push(b'+');
        text.extend_from_slice(&title[1..]);
        text.extend_from_slice(quality);
    }
    Ok(())
}
