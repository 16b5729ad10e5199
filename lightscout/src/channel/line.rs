//! Newline framing over a byte stream with read timeouts.

use std::io::{self, BufRead, BufReader, ErrorKind, Read};

/// Upper bound on a buffered partial line. NMEA sentences are at most 82 bytes.
const MAX_LINE_BYTES: usize = 4096;

/// Result of a single framed read.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineRead {
    /// A complete line, without the trailing `\n`.
    Line(Vec<u8>),
    /// No complete line before the read timeout.
    Idle,
    /// The stream is exhausted.
    Eof,
}

/// Splits a byte stream into lines.
///
/// Bytes received before a timeout are kept and joined with the rest of the
/// line on the next call, so a sentence split across reads is not lost.
pub(crate) struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::with_capacity(128),
        }
    }

    pub fn read_line(&mut self) -> io::Result<LineRead> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => {
                if self.pending.is_empty() {
                    Ok(LineRead::Eof)
                } else {
                    Ok(LineRead::Line(std::mem::take(&mut self.pending)))
                }
            }
            Ok(_) => {
                // No trailing newline means the stream ended mid-line
                if self.pending.last() == Some(&b'\n') {
                    self.pending.pop();
                }
                Ok(LineRead::Line(std::mem::take(&mut self.pending)))
            }
            Err(e) if is_timeout(&e) => {
                if self.pending.len() > MAX_LINE_BYTES {
                    tracing::trace!(
                        bytes = self.pending.len(),
                        "Discarding oversized partial line"
                    );
                    self.pending.clear();
                }
                Ok(LineRead::Idle)
            }
            Err(e) => Err(e),
        }
    }
}

/// Whether an I/O error only means "no data yet".
pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}
