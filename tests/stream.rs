use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;

use seqarc::codec::ArchiveWriterBuilder;
use seqarc::{
    with_archive, ArchiveStream, ChunkEngine, CompressionSettings, DatasetType, Error, ErrorKind,
    FastqRecord, LineReader,
};

const NUCLEOTIDES: &[u8] = b"ACGTN";

fn random_records(rng: &mut SmallRng, n: usize, plus_repetition: bool) -> Vec<FastqRecord> {
    (0..n)
        .map(|i| {
            let len = rng.random_range(50..250);
            let sequence: String = (0..len)
                .map(|_| NUCLEOTIDES[rng.random_range(0..NUCLEOTIDES.len())] as char)
                .collect();
            let quality: String = (0..len)
                .map(|_| rng.random_range(b'!'..=b'J') as char)
                .collect();
            let title = format!("read{i} len={len}");
            let plus = if plus_repetition {
                title.clone()
            } else {
                String::new()
            };
            FastqRecord::new(title, sequence, plus, quality)
        })
        .collect()
}

fn write_archive(
    records: &[FastqRecord],
    dataset: DatasetType,
    settings: CompressionSettings,
) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    {
        let mut writer = ArchiveWriterBuilder::default()
            .dataset(dataset)
            .settings(settings)
            .build(file.as_file_mut())?;
        for record in records {
            writer.write_record(record)?;
        }
        writer.finish()?;
    }
    Ok(file)
}

fn fastq_text(records: &[FastqRecord]) -> String {
    let mut text = Vec::new();
    for record in records {
        record.write_text(&mut text);
    }
    String::from_utf8(text).unwrap()
}

fn small_blocks() -> CompressionSettings {
    let mut settings = CompressionSettings::default();
    settings.set_block_size_mb(1).unwrap();
    settings
}

#[test]
fn multi_block_archive_reads_back_line_by_line() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(42);
    let records = random_records(&mut rng, 8_000, false);
    let file = write_archive(&records, DatasetType::default(), small_blocks())?;

    let mut stream = ArchiveStream::open(file.path())?;
    let mut text = String::new();
    let mut n_lines = 0;
    for line in stream.lines() {
        let line = line?;
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        text.push_str(&line);
        n_lines += 1;
    }
    assert_eq!(n_lines, records.len() * 4);
    assert_eq!(text, fastq_text(&records));
    stream.close()?;
    Ok(())
}

#[test]
fn chunks_end_with_a_single_sentinel() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(7);
    let records = random_records(&mut rng, 8_000, false);
    let file = write_archive(&records, DatasetType::default(), small_blocks())?;

    let mut engine = ChunkEngine::open(file.path());
    let mut text = String::new();
    loop {
        let chunk = engine.next_chunk();
        assert!(engine.buffers_empty());
        if chunk.is_empty() {
            break;
        }
        // Every block ends on a record boundary
        assert!(chunk.ends_with('\n'));
        assert!(chunk.starts_with('@'));
        text.push_str(&chunk);
    }
    assert!(engine.chunks_read() > 1);
    assert!(engine.is_exhausted());
    assert!(!engine.is_error());

    for _ in 0..5 {
        assert_eq!(engine.next_chunk(), "");
    }
    assert_eq!(text, fastq_text(&records));
    engine.close();
    assert!(!engine.is_error());
    Ok(())
}

#[test]
fn plus_repetition_roundtrip() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(3);
    let records = random_records(&mut rng, 500, true);
    let dataset = DatasetType::new(33, true)?;
    let file = write_archive(&records, dataset, CompressionSettings::default())?;

    let read = with_archive(file.path(), |stream| {
        let mut read = Vec::new();
        while let Some(record) = stream.next_record()? {
            read.push(record);
        }
        Ok::<_, Error>(read)
    })?;
    assert_eq!(read, records);
    Ok(())
}

#[test]
fn checksums_disabled_roundtrip() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(11);
    let records = random_records(&mut rng, 200, false);
    let mut settings = CompressionSettings::default();
    settings.set_checksum(false);
    settings.set_level(19)?;
    let file = write_archive(&records, DatasetType::default(), settings)?;

    let text = with_archive(file.path(), |stream| {
        stream.lines().collect::<seqarc::Result<String>>()
    })?;
    assert_eq!(text, fastq_text(&records));
    Ok(())
}

#[test]
fn line_split_across_blocks_is_not_rejoined() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    {
        let mut writer = ArchiveWriterBuilder::default().build(file.as_file_mut())?;
        writer.write_block(b"AB")?;
        writer.write_block(b"CD\n")?;
    }

    let mut reader = LineReader::open(file.path());
    assert_eq!(reader.next_line(), "AB\n");
    assert_eq!(reader.next_line(), "CD\n");
    assert_eq!(reader.next_line(), "");
    assert!(!reader.is_error());
    Ok(())
}

#[test]
fn corrupt_archive_fails_once_then_ends() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(5);
    let records = random_records(&mut rng, 100, false);
    let file = write_archive(&records, DatasetType::default(), CompressionSettings::default())?;

    let mut bytes = std::fs::read(file.path())?;
    let last = bytes.len() - 8;
    bytes[last] ^= 0x5a;
    let corrupt = NamedTempFile::new()?;
    std::fs::write(corrupt.path(), &bytes)?;

    let mut stream = ArchiveStream::open(corrupt.path())?;
    let err = stream.readline().unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ChunkDecode));

    // The error was cleared when it was surfaced and the stream stays finished
    assert_eq!(stream.readline()?, "");
    stream.close()?;
    assert!(stream.closed());
    Ok(())
}

#[test]
fn abandoned_stream_is_closed_on_drop() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(9);
    let records = random_records(&mut rng, 10, false);
    let file = write_archive(&records, DatasetType::default(), CompressionSettings::default())?;

    let first = {
        let mut stream = ArchiveStream::open(file.path())?;
        stream.readline()?
    };
    assert_eq!(first, format!("@{}\n", records[0].title));

    // The archive can be reopened and read from the start
    let mut stream = ArchiveStream::open(file.path())?;
    assert_eq!(stream.readline()?, first);
    Ok(())
}

#[test]
fn open_errors_surface_as_archive_open() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.sqa");
    let err = ArchiveStream::open(&missing).err().unwrap();
    assert_eq!(err.kind(), Some(ErrorKind::ArchiveOpen));
    assert!(err.to_string().contains("missing.sqa"));

    let garbage = dir.path().join("garbage.sqa");
    std::fs::write(&garbage, [7u8; 100]).unwrap();
    let err = ArchiveStream::open(&garbage).err().unwrap();
    assert_eq!(err.kind(), Some(ErrorKind::ArchiveOpen));

    let result: Result<(), Error> = with_archive(&missing, |_| Ok(()));
    assert!(matches!(result, Err(Error::ArchiveOpen(_))));
}
