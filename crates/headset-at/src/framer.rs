//! Line framing for the AT byte stream.
//!
//! Responses from the audio gateway are wrapped as `\r\n<text>\r\n`, so a
//! stream looks like `\r\nRING\r\n\r\n+CLIP: "123",129\r\n`. The framer
//! splits on either CR or LF and drops the empty segments in between.

/// Longest line accepted for parsing, terminator excluded.
pub const MAX_LINE_LEN: usize = 512;

/// One unit cut from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete, trimmed, non-empty line.
    Line(String),
    /// A line that exceeded [`MAX_LINE_LEN`]. Carries its first
    /// `MAX_LINE_LEN` bytes; the remainder up to the next terminator is
    /// dropped.
    Overlong(String),
}

/// Accumulates raw bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct AtFramer {
    buf: Vec<u8>,
    /// Dropping the tail of an overlong line until the next CR/LF.
    discarding: bool,
}

impl AtFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the link.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Take the next frame.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let terminator = self.buf.iter().position(|b| *b == b'\r' || *b == b'\n');

            if self.discarding {
                match terminator {
                    Some(end) => {
                        self.buf.drain(..=end);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buf.clear();
                        return None;
                    }
                }
            }

            let Some(end) = terminator else {
                if self.buf.len() > MAX_LINE_LEN {
                    let head = truncated(&self.buf);
                    self.buf.clear();
                    self.discarding = true;
                    return Some(Frame::Overlong(head));
                }
                return None;
            };

            if end > MAX_LINE_LEN {
                let head = truncated(&self.buf[..end]);
                self.buf.drain(..=end);
                return Some(Frame::Overlong(head));
            }

            let line: Vec<u8> = self.buf.drain(..=end).take(end).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                return Some(Frame::Line(text.to_string()));
            }
        }
    }
}

fn truncated(bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(MAX_LINE_LEN)];
    String::from_utf8_lossy(head).into_owned()
}
