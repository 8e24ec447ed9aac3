//! # Chunk decompression engine
//!
//! [`ChunkEngine`] owns one open archive and two reusable buffers, and turns the
//! archive into a sequence of decoded text units, one per block.
//!
//! Failures never escape as `Err` values from this layer. They are appended to the
//! engine's [`ErrorState`] and the operation returns its neutral value (the empty
//! string for reads). Callers must check [`ChunkEngine::is_error`] after every empty
//! result, because an empty string means either "end of archive" or "failed".

use std::path::Path;

use auto_impl::auto_impl;

use crate::codec::{
    decode_block, ArchiveReader, BlockSource, CompressedBlock, CompressionSettings, DatasetType,
    DecodedBlock,
};
use crate::error::{ErrorKind, ErrorState, Result};

/// A producer of decoded text units
///
/// An empty string is the end-of-stream sentinel. Failures are recorded in the
/// producer's [`ErrorState`] instead of being returned.
#[auto_impl(&mut, Box)]
pub trait ChunkSource {
    /// Returns the next decoded text unit, or `""` when there is none
    fn next_chunk(&mut self) -> String;

    /// Whether the underlying archive handle is still present
    fn is_open(&self) -> bool;

    /// Releases the underlying archive
    fn close(&mut self);

    /// Errors recorded since the last clear
    fn errors(&self) -> &ErrorState;

    /// Mutable access to the recorded errors, for clearing or taking them
    fn errors_mut(&mut self) -> &mut ErrorState;
}

/// Decompresses an archive one block at a time
///
/// # Examples
///
/// ```rust,no_run
/// use seqarc::ChunkEngine;
///
/// let mut engine = ChunkEngine::open("reads.sqa");
/// if engine.is_error() {
///     eprintln!("{}", engine.error());
///     return;
/// }
/// loop {
///     let chunk = engine.next_chunk();
///     if chunk.is_empty() {
///         break;
///     }
///     print!("{chunk}");
/// }
/// engine.close();
/// ```
pub struct ChunkEngine<S: BlockSource = ArchiveReader> {
    /// Archive handle, `None` once closed or if opening failed
    source: Option<S>,

    /// Reusable buffer for one block's compressed bytes
    compressed: CompressedBlock,

    /// Reusable buffer for one block's decoded text
    decoded: DecodedBlock,

    /// Accumulated failures
    errors: ErrorState,

    /// Set once the source reported its last block or a read failed
    exhausted: bool,

    /// Number of decoded units returned so far
    chunks: usize,
}

impl ChunkEngine<ArchiveReader> {
    /// Opens the archive at `path`
    ///
    /// Never fails outright: if the archive can't be opened the returned engine is
    /// closed and carries an [`ErrorKind::ArchiveOpen`] error.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        match ArchiveReader::open_for_read(&path) {
            Ok(reader) => Self::with_source(reader),
            Err(e) => {
                let mut engine = Self::closed();
                engine
                    .errors
                    .record(ErrorKind::ArchiveOpen, format!("{}: {e}", path.as_ref().display()));
                engine
            }
        }
    }
}

impl<S: BlockSource> ChunkEngine<S> {
    /// Wraps an already-open block source, sizing the buffers from it
    pub fn with_source(source: S) -> Self {
        let compressed = CompressedBlock::new(source.block_capacity());
        let decoded = DecodedBlock::new(source.text_capacity());
        log::debug!(
            "chunk engine ready: {} byte block buffer, {} byte text buffer",
            compressed.capacity(),
            decoded.capacity()
        );
        Self {
            source: Some(source),
            compressed,
            decoded,
            errors: ErrorState::new(),
            exhausted: false,
            chunks: 0,
        }
    }

    fn closed() -> Self {
        Self {
            source: None,
            compressed: CompressedBlock::new(0),
            decoded: DecodedBlock::new(0),
            errors: ErrorState::new(),
            exhausted: true,
            chunks: 0,
        }
    }

    /// Decodes the next block and returns its text
    ///
    /// Returns `""` once the archive is exhausted, after a failure (recorded as
    /// [`ErrorKind::ChunkDecode`]), or when called on a closed engine (recorded as
    /// [`ErrorKind::Misuse`]). A failed block ends the stream: later calls return `""`
    /// without touching the archive again.
    ///
    /// A block that decodes to no text also yields `""`; use
    /// [`ChunkEngine::is_exhausted`] to tell it apart from the end of the archive.
    pub fn next_chunk(&mut self) -> String {
        let Some(source) = self.source.as_mut() else {
            self.errors
                .record(ErrorKind::Misuse, "attempted to read from a closed archive");
            return String::new();
        };
        if self.exhausted {
            return String::new();
        }

        self.compressed.clear();
        self.decoded.clear();
        let result = read_chunk(source, &mut self.compressed, &mut self.decoded);
        self.compressed.clear();
        self.decoded.clear();

        match result {
            Ok(Some(text)) => {
                self.chunks += 1;
                text
            }
            Ok(None) => {
                log::debug!("archive exhausted after {} chunks", self.chunks);
                self.exhausted = true;
                String::new()
            }
            Err(e) => {
                self.exhausted = true;
                self.errors
                    .record(ErrorKind::ChunkDecode, format!("chunk {}: {e}", self.chunks + 1));
                String::new()
            }
        }
    }

    /// Finishes the archive and releases the handle and buffers
    ///
    /// The handle is released even if finishing fails ([`ErrorKind::Close`]). Closing
    /// an engine that holds no handle records [`ErrorKind::Misuse`].
    pub fn close(&mut self) {
        self.compressed.clear();
        self.decoded.clear();
        match self.source.take() {
            Some(source) => {
                if let Err(e) = source.finish() {
                    self.errors.record(ErrorKind::Close, e);
                }
                self.compressed = CompressedBlock::new(0);
                self.decoded = DecodedBlock::new(0);
                self.exhausted = true;
                log::debug!("closed archive after {} chunks", self.chunks);
            }
            None => self
                .errors
                .record(ErrorKind::Misuse, "archive is already closed"),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Whether the source has no more blocks to give (or a read failed)
    ///
    /// This is the auxiliary "has more blocks" signal: an empty chunk with
    /// `is_exhausted() == false` came from a block that decoded to no text.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.errors.is_error()
    }

    /// All messages recorded since the last clear, newline-separated
    #[must_use]
    pub fn error(&self) -> &str {
        self.errors.message()
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.errors.kind()
    }

    pub fn clear_error(&mut self) {
        self.errors.clear();
    }

    /// Whether both block buffers are currently empty
    #[must_use]
    pub fn buffers_empty(&self) -> bool {
        self.compressed.is_empty() && self.decoded.is_empty()
    }

    /// Capacities of the compressed and decoded buffers
    #[must_use]
    pub fn buffer_capacities(&self) -> (usize, usize) {
        (self.compressed.capacity(), self.decoded.capacity())
    }

    #[must_use]
    pub fn dataset_type(&self) -> Option<DatasetType> {
        self.source.as_ref().map(BlockSource::dataset_type)
    }

    #[must_use]
    pub fn compression_settings(&self) -> Option<CompressionSettings> {
        self.source.as_ref().map(BlockSource::compression_settings)
    }

    /// Number of decoded units returned so far
    #[must_use]
    pub fn chunks_read(&self) -> usize {
        self.chunks
    }
}

fn read_chunk<S: BlockSource>(
    source: &mut S,
    compressed: &mut CompressedBlock,
    decoded: &mut DecodedBlock,
) -> Result<Option<String>> {
    // Cheap immutable properties of the archive, re-derived for every block
    let dataset = source.dataset_type();
    let settings = source.compression_settings();

    if !source.next_block(compressed)? {
        return Ok(None);
    }
    decode_block(dataset, &settings, compressed, decoded)?;
    Ok(Some(decoded.to_text()?))
}

impl<S: BlockSource> ChunkSource for ChunkEngine<S> {
    fn next_chunk(&mut self) -> String {
        ChunkEngine::next_chunk(self)
    }

    fn is_open(&self) -> bool {
        ChunkEngine::is_open(self)
    }

    fn close(&mut self) {
        ChunkEngine::close(self);
    }

    fn errors(&self) -> &ErrorState {
        &self.errors
    }

    fn errors_mut(&mut self) -> &mut ErrorState {
        &mut self.errors
    }
}
