//! # seqarc
//!
//! Streaming, line-by-line decompression of block-compressed FASTQ archives.
//!
//! An archive is a header followed by independently ZSTD-compressed blocks of FASTQ
//! text. Reading happens in three layers:
//!
//! * [`ChunkEngine`] owns an open archive and turns it into a sequence of decoded text
//!   units, one per block, reusing a single pair of buffers for the whole stream;
//! * [`LineReader`] re-slices those units into lines ending in `\n`, pulling a new
//!   unit only once the previous one is used up;
//! * [`ArchiveStream`] is the file-like surface (`open`, `readline`, `close`) that
//!   turns the engine's recorded failures into [`Error`] values.
//!
//! Archives are written with [`codec::ArchiveWriter`].
//!
//! ```rust,no_run
//! use seqarc::with_archive;
//!
//! let records = with_archive("reads.sqa", |stream| {
//!     let mut n = 0;
//!     while stream.next_record()?.is_some() {
//!         n += 1;
//!     }
//!     Ok::<_, seqarc::Error>(n)
//! })?;
//! println!("{records} records");
//! # Ok::<(), seqarc::Error>(())
//! ```

pub mod codec;
mod engine;
mod error;
mod lines;
mod record;
mod stream;

pub use codec::{CompressionSettings, DatasetType};
pub use engine::{ChunkEngine, ChunkSource};
pub use error::{
    Error, ErrorKind, ErrorState, HeaderError, ReadError, Result, SettingsError, WriteError,
};
pub use lines::{LineReader, QueueState};
pub use record::{FastqRecord, LINES_PER_RECORD};
pub use stream::{with_archive, ArchiveStream, Lines};
