use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use seq_io::fastq::{Reader, Record};

use seqarc::codec::{
    ArchiveWriterBuilder, DEFAULT_BLOCK_SIZE_MB, DEFAULT_COMPRESSION_LEVEL, QUALITY_OFFSET_33,
};
use seqarc::{ArchiveStream, ChunkEngine, CompressionSettings, DatasetType, FastqRecord};

#[derive(Parser)]
#[command(name = "seqarc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Block-compressed FASTQ archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a FASTQ file (plain or gzipped) into an archive
    Compress(CompressArgs),
    /// Decompress an archive back to FASTQ, block by block
    Decompress(DecompressArgs),
    /// Stream the lines of one or more archives to stdout
    Cat(CatArgs),
}

#[derive(Args)]
struct CompressArgs {
    /// Input FASTQ file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output archive file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// ZSTD compression level
    #[arg(short, long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    level: i32,

    /// Decoded size of a block in MiB
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE_MB)]
    block_mb: u32,

    /// Do not store block checksums
    #[arg(long)]
    no_checksum: bool,

    /// Store `+` lines that repeat the record title
    #[arg(long)]
    plus_repetition: bool,

    /// Quality score offset (33 or 64)
    #[arg(short, long, default_value_t = QUALITY_OFFSET_33)]
    quality_offset: u8,
}

#[derive(Args)]
struct DecompressArgs {
    /// Input archive
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output FASTQ file [default: stdout]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct CatArgs {
    /// Archives to read, in order
    #[arg(required = true, value_name = "FILE")]
    archives: Vec<PathBuf>,
}

fn output_handle(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn compress(args: &CompressArgs) -> Result<()> {
    let dataset = DatasetType::new(args.quality_offset, args.plus_repetition)?;
    let mut settings = CompressionSettings::default();
    settings.set_level(args.level)?;
    settings.set_block_size_mb(args.block_mb)?;
    settings.set_checksum(!args.no_checksum);

    let (in_handle, _comp) = niffler::from_path(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let out_handle = File::create(&args.output)
        .map(BufWriter::new)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut writer = ArchiveWriterBuilder::default()
        .dataset(dataset)
        .settings(settings)
        .build(out_handle)?;

    let mut reader = Reader::new(in_handle);
    while let Some(record) = reader.next() {
        let record = record?;
        let title = String::from_utf8(record.head().to_vec())?;
        // The parser does not keep `+` lines, so they are rebuilt from the title
        let plus = if args.plus_repetition {
            title.clone()
        } else {
            String::new()
        };
        let record = FastqRecord::new(
            title,
            String::from_utf8(record.seq().to_vec())?,
            plus,
            String::from_utf8(record.qual().to_vec())?,
        );
        writer.write_record(&record)?;
    }
    writer.finish()?;
    log::info!(
        "wrote {} records in {} blocks to {}",
        writer.records_written(),
        writer.blocks_written(),
        args.output.display()
    );
    Ok(())
}

fn decompress(args: &DecompressArgs) -> Result<()> {
    let mut engine = ChunkEngine::open(&args.input);
    if engine.is_error() {
        bail!("{}", engine.error());
    }
    let mut out = output_handle(args.output.as_deref())?;
    loop {
        let chunk = engine.next_chunk();
        if engine.is_error() {
            bail!("{}", engine.error());
        }
        if chunk.is_empty() {
            if engine.is_exhausted() {
                break;
            }
            continue;
        }
        out.write_all(chunk.as_bytes())?;
    }
    out.flush()?;

    let chunks = engine.chunks_read();
    engine.close();
    if engine.is_error() {
        bail!("{}", engine.error());
    }
    log::info!("decompressed {chunks} blocks from {}", args.input.display());
    Ok(())
}

fn cat(args: &CatArgs) -> Result<()> {
    let mut out = output_handle(None)?;
    for path in &args.archives {
        let mut stream = ArchiveStream::open(path)?;
        for line in stream.lines() {
            out.write_all(line?.as_bytes())?;
        }
        stream.close()?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Compress(args) => compress(args)?,
        Commands::Decompress(args) => decompress(args)?,
        Commands::Cat(args) => cat(args)?,
    }
    Ok(())
}
