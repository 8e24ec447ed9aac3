//! # Line reassembly
//!
//! [`LineReader`] re-slices the decoded text units of a [`ChunkSource`] into single
//! lines. Each unit is split on its own: a line that straddles two units is returned
//! as two lines, each ending in a line break that was not in the data. Archives
//! written by [`ArchiveWriter`](crate::codec::ArchiveWriter) only cut blocks between
//! records, so this never happens for them.

use std::collections::VecDeque;

use crate::engine::{ChunkEngine, ChunkSource};
use crate::error::ErrorState;

/// State of the pending-line queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// The next request pulls a new unit from the chunk source
    Empty,
    /// The next request is served from the queue
    HasLines,
}

/// Hands out the lines of a chunk source one at a time
///
/// Every returned line ends with exactly one `\n`. The empty string signals the end
/// of the stream (or a failure, see [`LineReader::is_error`]).
pub struct LineReader<C: ChunkSource = ChunkEngine> {
    source: C,
    queue: VecDeque<String>,
    state: QueueState,
}

impl LineReader<ChunkEngine> {
    /// Opens the archive at `path`
    ///
    /// Like [`ChunkEngine::open`] this does not fail outright; check
    /// [`LineReader::is_error`] afterwards.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self::new(ChunkEngine::open(path))
    }
}

impl<C: ChunkSource> LineReader<C> {
    pub fn new(source: C) -> Self {
        Self {
            source,
            queue: VecDeque::new(),
            state: QueueState::Empty,
        }
    }

    /// Returns the next line, or `""` at the end of the stream
    pub fn next_line(&mut self) -> String {
        if self.state == QueueState::Empty {
            let chunk = self.source.next_chunk();
            if chunk.is_empty() {
                return chunk;
            }
            split_lines(&chunk, &mut self.queue);
            self.state = QueueState::HasLines;
        }

        let line = self.queue.pop_front().unwrap_or_default();
        if self.queue.is_empty() {
            self.state = QueueState::Empty;
        }
        line
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Number of lines waiting in the queue
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.source.is_open()
    }

    #[must_use]
    pub fn closed(&self) -> bool {
        !self.source.is_open()
    }

    /// Closes the chunk source and drops any queued lines
    pub fn close(&mut self) {
        self.queue.clear();
        self.state = QueueState::Empty;
        self.source.close();
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.source.errors().is_error()
    }

    #[must_use]
    pub fn error(&self) -> &str {
        self.source.errors().message()
    }

    pub fn clear_error(&mut self) {
        self.source.errors_mut().clear();
    }

    pub(crate) fn errors_mut(&mut self) -> &mut ErrorState {
        self.source.errors_mut()
    }

    #[must_use]
    pub fn source(&self) -> &C {
        &self.source
    }
}

/// Splits a decoded unit into lines and appends them to `queue`
///
/// Every segment terminated by `\n` becomes a line, and so does an unterminated
/// final segment. Text ending in `\n` produces no trailing empty line. Each queued
/// line carries exactly one `\n`.
fn split_lines(text: &str, queue: &mut VecDeque<String>) {
    let mut start = 0;
    for end in memchr::memchr_iter(b'\n', text.as_bytes()) {
        queue.push_back(text[start..=end].to_owned());
        start = end + 1;
    }
    if start < text.len() {
        let mut line = String::with_capacity(text.len() - start + 1);
        line.push_str(&text[start..]);
        line.push('\n');
        queue.push_back(line);
    }
}
