use std::fmt;

/// Custom Result type for seqarc operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the seqarc library, encompassing all possible error cases
/// that can occur while reading or writing archives.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to archive header processing
    #[error(transparent)]
    HeaderError(#[from] HeaderError),
    /// Errors that occur while fetching or decoding blocks
    #[error(transparent)]
    ReadError(#[from] ReadError),
    /// Errors that occur while writing archives
    #[error(transparent)]
    WriteError(#[from] WriteError),
    /// Out-of-range compression or dataset parameters
    #[error(transparent)]
    SettingsError(#[from] SettingsError),
    /// Standard I/O errors from the Rust standard library
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// UTF-8 encoding/decoding errors
    #[error(transparent)]
    Utf8Error(#[from] std::str::Utf8Error),

    /// The archive could not be opened or its header is invalid
    #[error("Unable to open archive: {0}")]
    ArchiveOpen(String),
    /// A block of the archive could not be fetched or decoded
    #[error("Unable to decode archive chunk: {0}")]
    ChunkDecode(String),
    /// Finishing the archive failed while closing
    #[error("Unable to close archive: {0}")]
    Close(String),
    /// An operation was attempted on a stream in the wrong state
    #[error("Invalid archive stream usage: {0}")]
    Misuse(String),
}

impl Error {
    /// Returns the lifecycle kind of the error, if it is one of the stream-level errors
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::ArchiveOpen(_) => Some(ErrorKind::ArchiveOpen),
            Self::ChunkDecode(_) => Some(ErrorKind::ChunkDecode),
            Self::Close(_) => Some(ErrorKind::Close),
            Self::Misuse(_) => Some(ErrorKind::Misuse),
            _ => None,
        }
    }
}

/// Errors specific to processing and validating archive headers
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic number in the header does not match the expected value
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid magic number: {0:#x}")]
    InvalidMagicNumber(u32),

    /// The format version in the header is not supported
    ///
    /// # Arguments
    /// * `u8` - The unsupported version number that was found
    #[error("Invalid format version: {0}")]
    InvalidFormatVersion(u8),

    /// The quality offset stored in the header is neither 33 nor 64
    #[error("Invalid quality offset in header: {0}")]
    InvalidQualityOffset(u8),

    /// The block size stored in the header is zero or out of range
    #[error("Invalid block size in header: {0}")]
    InvalidBlockSize(u64),

    /// The file is shorter than a header
    ///
    /// # Arguments
    /// * `usize` - The number of bytes available
    #[error("File is too short to contain a header ({0} bytes)")]
    Truncated(usize),
}

/// Errors that can occur while fetching or decoding archive blocks
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The path does not point to a regular file
    #[error("File is not regular")]
    InvalidFileType,

    /// The magic number of a block header is invalid
    ///
    /// # Arguments
    /// * `u64` - The invalid magic number that was found
    /// * `usize` - The byte position of the block header
    #[error("Invalid block magic number: {0:#x} at byte pos {1}")]
    InvalidBlockMagicNumber(u64, usize),

    /// The archive ends in the middle of a block
    ///
    /// # Arguments
    /// * `usize` - The byte position where the truncation was detected
    #[error("Unexpected end of file at byte pos {0} - possibly truncated")]
    UnexpectedEndOfFile(usize),

    /// A block does not fit into the buffer reserved for it
    #[error("Block of {size} bytes exceeds the {capacity} byte buffer")]
    BlockExceedsCapacity { size: usize, capacity: usize },

    /// The decoded length of a block disagrees with its header
    #[error("Decoded block length ({got}) does not match the block header ({expected})")]
    DecodedSizeMismatch { expected: usize, got: usize },

    /// The checksum of a decoded block disagrees with its header
    #[error("Block checksum mismatch: expected {expected:#010x}, got {got:#010x}")]
    ChecksumMismatch { expected: u32, got: u32 },

    /// The decoded text of a block is not a sequence of FASTQ records
    #[error("Malformed record text in block: {0}")]
    MalformedBlock(String),

    /// A group of four lines does not form a FASTQ record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The stream ended in the middle of a FASTQ record
    ///
    /// # Arguments
    /// * `usize` - The number of lines of the dangling record
    #[error("Stream ended inside a record after {0} of 4 lines")]
    IncompleteRecord(usize),
}

/// Errors that can occur while writing archives
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// A single record is larger than a block
    ///
    /// # Arguments
    /// * First `usize` - The size of the record in bytes
    /// * Second `usize` - The block size in bytes
    #[error("Record size ({0}) exceeds the block size ({1})")]
    RecordSizeExceedsBlockSize(usize, usize),

    /// The plus line of a record does not repeat its title while the dataset requires it
    #[error("Plus line does not repeat the record title: {0}")]
    PlusLineMismatch(String),

    /// A quality byte is below the dataset's quality offset
    #[error("Quality byte {byte} is below the quality offset {offset}")]
    InvalidQuality { byte: u8, offset: u8 },

    /// A record field contains a newline
    #[error("Record field contains a line break: {0}")]
    EmbeddedNewline(String),

    /// Raw block text written with plus repetition is not a sequence of FASTQ records
    #[error("Raw block text is not a sequence of FASTQ records")]
    MalformedBlockText,
}

/// Errors raised by validated compression settings and dataset types
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("Invalid compression level specified: {0} (expected {1}..={2})")]
    InvalidCompressionLevel(i32, i32, i32),

    #[error("Invalid block buffer size specified: {0} MB (expected {1}..={2})")]
    InvalidBlockSize(u32, u32, u32),

    #[error("Invalid quality offset specified: {0} (expected 33 or 64)")]
    InvalidQualityOffset(u8),
}

/// The lifecycle stage at which an archive stream operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path missing or unreadable, or header invalid
    ArchiveOpen,
    /// A block failed to be fetched or decoded
    ChunkDecode,
    /// Finishing the archive failed
    Close,
    /// Use after close, or a second close
    Misuse,
}

impl ErrorKind {
    fn into_error(self, message: String) -> Error {
        match self {
            Self::ArchiveOpen => Error::ArchiveOpen(message),
            Self::ChunkDecode => Error::ChunkDecode(message),
            Self::Close => Error::Close(message),
            Self::Misuse => Error::Misuse(message),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ArchiveOpen => "archive open",
            Self::ChunkDecode => "chunk decode",
            Self::Close => "close",
            Self::Misuse => "misuse",
        };
        f.write_str(name)
    }
}

/// Accumulating error record attached to a chunk engine
///
/// Operations that fail append a message here instead of returning an error.
/// The state is only ever cleared on construction or by an explicit [`ErrorState::clear`]
/// (or [`ErrorState::take`]), so a caller can inspect the failure after the operation
/// that caused it has returned.
#[derive(Debug, Default, Clone)]
pub struct ErrorState {
    message: String,
    kind: Option<ErrorKind>,
}
impl ErrorState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, keeping earlier ones separated by newlines
    ///
    /// The kind of the most recent failure wins. An empty message is replaced by a
    /// generic one naming the kind, so every recorded failure is visible.
    pub fn record(&mut self, kind: ErrorKind, message: impl fmt::Display) {
        let mut message = message.to_string();
        if message.is_empty() {
            message = format!("{kind} failed");
        }
        log::warn!("{kind} error: {message}");
        if !self.message.is_empty() {
            self.message.push('\n');
        }
        self.message.push_str(&message);
        self.kind = Some(kind);
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.message.is_empty()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    pub fn clear(&mut self) {
        self.message.clear();
        self.kind = None;
    }

    /// Converts the recorded failure into an [`Error`] and clears the state
    ///
    /// Returns `None` if nothing was recorded.
    pub fn take(&mut self) -> Option<Error> {
        if !self.is_error() {
            return None;
        }
        let kind = self.kind.unwrap_or(ErrorKind::Misuse);
        let message = std::mem::take(&mut self.message);
        self.kind = None;
        Some(kind.into_error(message))
    }
}
