//! Framing of streamed process output into logical lines.
//!
//! Child processes write arbitrary byte chunks. A chunk may end mid-line,
//! carry several lines, use carriage returns to redraw a progress bar, or
//! contain literal `\n` escape sequences. The splitter turns all of that
//! into clean display lines.

use lb_protocol::Framing;
use std::borrow::Cow;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_stream::Stream;
use tracing::warn;

const ESCAPE: char = '\u{1b}';
const READ_BUFFER_SIZE: usize = 4096;

/// Incremental line splitter for one output stream.
#[derive(Debug)]
pub struct LineSplitter {
    framing: Framing,
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            pending: Vec::new(),
        }
    }

    /// Feed a chunk and return every line it completed.
    ///
    /// Bytes after the last line break are kept until the next chunk or
    /// [`finish`](Self::finish).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if self.is_break(byte) {
                let raw = std::mem::take(&mut self.pending);
                emit(&raw, &mut lines);
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let raw = std::mem::take(&mut self.pending);
        emit(&raw, &mut lines);
        lines
    }

    fn is_break(&self, byte: u8) -> bool {
        byte == b'\n' || (self.framing == Framing::Progress && byte == b'\r')
    }
}

fn emit(raw: &[u8], lines: &mut Vec<String>) {
    if raw.is_empty() {
        return;
    }

    let text = String::from_utf8_lossy(raw);
    for part in text.split("\\n") {
        let cleaned = strip_ansi(part);
        let line = cleaned.trim_end();
        if !line.trim_start().is_empty() {
            lines.push(line.to_string());
        }
    }
}

/// Remove ANSI escape sequences (CSI sequences and stray escapes).
pub fn strip_ansi(input: &str) -> Cow<'_, str> {
    if !input.contains(ESCAPE) {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            output.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            // Parameters and intermediates run until a final byte in '@'..='~'.
            for next in chars.by_ref() {
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
        }
    }
    Cow::Owned(output)
}

/// Turn an async reader into a stream of framed lines.
///
/// The stream ends at EOF. A read error is logged and ends the stream;
/// the job's exit is still reported by the runner.
pub fn line_stream<R>(reader: R, framing: Framing) -> Pin<Box<dyn Stream<Item = String> + Send>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut reader = reader;
        let mut splitter = LineSplitter::new(framing);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            match reader.read(&mut buffer).await {
                Ok(0) => break,
                Ok(read) => {
                    for line in splitter.push(&buffer[..read]) {
                        yield line;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read job output");
                    break;
                }
            }
        }

        for line in splitter.finish() {
            yield line;
        }
    };

    Box::pin(stream)
}
