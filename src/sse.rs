//! Incremental decoding of the `/chat/stream` body.
//!
//! Bytes arrive in arbitrary chunks. [`LineDecoder`] turns them into whole
//! text lines, holding back a UTF-8 sequence split across reads and a
//! partial trailing line. [`EventDecoder`] layers `data: ` extraction and
//! JSON parsing on top.

use tracing::warn;

use crate::protocol::StreamEvent;

/// Literal prefix of an event line.
pub const DATA_PREFIX: &str = "data: ";

/// Chunk-to-line decoder.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending_bytes: Vec<u8>,
    buffer: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed, without the
    /// terminator. `\r\n` and `\n` are both accepted.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=end).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// End of input: flush whatever is left as a final unterminated line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let mut rest = std::mem::take(&mut self.buffer);
        if rest.ends_with('\r') {
            rest.pop();
        }
        (!rest.is_empty()).then_some(rest)
    }

    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut rest = &bytes[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Genuinely invalid bytes: replace and move on.
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end: wait for the next chunk.
                        None => {
                            self.pending_bytes = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Extract and parse the payload of a `data: ` line.
///
/// Returns `None` for any other line (comments, blank keep-alives, `event:`
/// fields).
pub fn parse_data_line(line: &str) -> Option<Result<StreamEvent, serde_json::Error>> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(serde_json::from_str(payload))
}

/// Chunk-to-event decoder. Malformed lines are logged and skipped.
#[derive(Debug, Default)]
pub struct EventDecoder {
    lines: LineDecoder,
    malformed: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the events it completed in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let lines = self.lines.push(chunk);
        lines.iter().filter_map(|l| self.parse(l)).collect()
    }

    /// End of input: parse a trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let line = self.lines.finish()?;
        self.parse(&line)
    }

    /// Number of `data: ` lines that failed to parse so far.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    fn parse(&mut self, line: &str) -> Option<StreamEvent> {
        match parse_data_line(line)? {
            Ok(event) => Some(event),
            Err(e) => {
                self.malformed += 1;
                warn!(error = %e, line = %line, "skipping malformed stream event");
                None
            }
        }
    }
}
