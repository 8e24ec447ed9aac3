//! # Archive streams
//!
//! [`ArchiveStream`] is the file-like surface over a [`LineReader`]: `open`,
//! `readline`, `close` and `closed`, with failures surfaced as [`Error`] values.
//! After every operation the engine's error state is checked, converted into an
//! error and cleared, so a failure is reported exactly once.
//!
//! A stream is closed on every exit path: explicitly, when it is dropped, or by
//! [`with_archive`] once its body returns.

use std::path::{Path, PathBuf};

use crate::error::{Error, ReadError, Result};
use crate::lines::LineReader;
use crate::record::{FastqRecord, LINES_PER_RECORD};

/// Line-oriented reader over one archive
///
/// # Examples
///
/// ```rust,no_run
/// use seqarc::ArchiveStream;
///
/// let mut stream = ArchiveStream::open("reads.sqa")?;
/// loop {
///     let line = stream.readline()?;
///     if line.is_empty() {
///         break;
///     }
///     print!("{line}");
/// }
/// stream.close()?;
/// # Ok::<(), seqarc::Error>(())
/// ```
pub struct ArchiveStream {
    reader: LineReader,
    path: PathBuf,
}
impl ArchiveStream {
    /// Opens the archive at `path`
    ///
    /// # Errors
    ///
    /// * `Error::ArchiveOpen` if the path is missing, unreadable or not a valid archive
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = LineReader::open(&path);
        if let Some(err) = reader.errors_mut().take() {
            return Err(err);
        }
        log::debug!("opened stream over {}", path.as_ref().display());
        Ok(Self {
            reader,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the next line including its `\n`, or `""` at the end of the archive
    ///
    /// # Errors
    ///
    /// * `Error::ChunkDecode` if a block could not be read; the stream is finished
    ///   afterwards and later calls return `""`
    /// * `Error::Misuse` if the stream is closed
    pub fn readline(&mut self) -> Result<String> {
        if self.reader.closed() {
            return Err(Error::Misuse(format!(
                "readline on closed stream {}",
                self.path.display()
            )));
        }
        let line = self.reader.next_line();
        self.check()?;
        Ok(line)
    }

    /// Closes the archive
    ///
    /// Closing an already-closed stream does nothing.
    ///
    /// # Errors
    ///
    /// * `Error::Close` if finishing the archive failed; the archive is released anyway
    pub fn close(&mut self) -> Result<()> {
        if self.reader.closed() {
            log::debug!("stream over {} is already closed", self.path.display());
            return Ok(());
        }
        self.reader.close();
        self.check()
    }

    #[must_use]
    pub fn closed(&self) -> bool {
        self.reader.closed()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterates over the remaining lines until the end of the archive or the first error
    pub fn lines(&mut self) -> Lines<'_> {
        Lines {
            stream: self,
            done: false,
        }
    }

    /// Reads the next four lines as a FASTQ record
    ///
    /// Returns `Ok(None)` at the end of the archive.
    ///
    /// # Errors
    ///
    /// * `ReadError::IncompleteRecord` if the archive ends inside a record
    /// * `ReadError::MalformedRecord` if the lines do not form a record
    /// * Any error from [`ArchiveStream::readline`]
    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        let first = self.readline()?;
        if first.is_empty() {
            return Ok(None);
        }
        let mut lines: [String; LINES_PER_RECORD] = Default::default();
        lines[0] = first;
        for (i, slot) in lines.iter_mut().enumerate().skip(1) {
            let line = self.readline()?;
            if line.is_empty() {
                return Err(ReadError::IncompleteRecord(i).into());
            }
            *slot = line;
        }
        FastqRecord::from_lines(&lines).map(Some)
    }

    fn check(&mut self) -> Result<()> {
        match self.reader.errors_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for ArchiveStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close {}: {e}", self.path.display());
        }
    }
}

/// Iterator over the lines of an [`ArchiveStream`]
pub struct Lines<'a> {
    stream: &'a mut ArchiveStream,
    done: bool,
}
impl Iterator for Lines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.stream.readline() {
            Ok(line) if line.is_empty() => {
                self.done = true;
                None
            }
            Ok(line) => Some(Ok(line)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Opens the archive at `path`, runs `body` on it, and closes it whatever happens
///
/// An error from `body` takes precedence over an error from closing.
///
/// # Examples
///
/// ```rust,no_run
/// let n_lines = seqarc::with_archive("reads.sqa", |stream| {
///     stream.lines().try_fold(0usize, |n, line| line.map(|_| n + 1))
/// })?;
/// println!("{n_lines} lines");
/// # Ok::<(), seqarc::Error>(())
/// ```
pub fn with_archive<P, T, E, F>(path: P, body: F) -> std::result::Result<T, E>
where
    P: AsRef<Path>,
    E: From<Error>,
    F: FnOnce(&mut ArchiveStream) -> std::result::Result<T, E>,
{
    let mut stream = ArchiveStream::open(path)?;
    let result = body(&mut stream);
    let closed = stream.close();
    let value = result?;
    closed?;
    Ok(value)
}
