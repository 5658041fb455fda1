//! Frame reassembly
//!
//! Turns incrementally delivered text into complete `data:` frames. Chunk
//! boundaries may land anywhere, so everything after the last delimiter is
//! kept in the buffer until a later chunk confirms it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Field marker introducing a payload line
pub const DATA_MARKER: &str = "data:";

/// How frames are delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// Every `data:` line is its own frame
    Line,
    /// Blank-line separated blocks; all `data:` lines of a block form one frame
    #[default]
    Block,
}

impl FramingMode {
    /// Delimiter that confirms a frame is complete
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Line => "\n",
            Self::Block => "\n\n",
        }
    }
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => f.write_str("line"),
            Self::Block => f.write_str("block"),
        }
    }
}

impl FromStr for FramingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "line" => Ok(Self::Line),
            "block" => Ok(Self::Block),
            other => Err(format!("Unknown framing mode: {}", other)),
        }
    }
}

/// One complete event frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Segment text as it appeared between delimiters
    pub raw: String,
    /// Payload with the field marker stripped
    pub payload: String,
    /// Byte offset of the segment in the normalized stream text
    pub offset: usize,
}

/// Accumulates text and extracts complete frames
#[derive(Debug, Default)]
pub struct FrameDecoder {
    mode: FramingMode,
    /// Text received but not yet attributed to a completed frame
    buffer: String,
    /// Length of all text already moved out of the buffer
    consumed: usize,
}

impl FrameDecoder {
    /// Create a decoder for the given framing mode
    pub fn new(mode: FramingMode) -> Self {
        Self {
            mode,
            buffer: String::new(),
            consumed: 0,
        }
    }

    /// Text still waiting for a delimiter
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    /// Feed decoded text and extract any complete frames
    ///
    /// Only the newly appended text (plus enough of the old tail to catch a
    /// delimiter or `\r\n` split across chunks) is scanned, so delivering a
    /// large frame in tiny chunks stays linear.
    pub fn feed(&mut self, text: &str) -> Vec<Frame> {
        let start = self.buffer.len();
        self.buffer.push_str(text);

        // A lone trailing '\r' is left alone until its '\n' arrives
        let normalize_from = if self.buffer[..start].ends_with('\r') {
            start - 1
        } else {
            start
        };
        if self.buffer[normalize_from..].contains("\r\n") {
            let normalized = self.buffer[normalize_from..].replace("\r\n", "\n");
            self.buffer.truncate(normalize_from);
            self.buffer.push_str(&normalized);
        }

        let delimiter = self.mode.delimiter();

        // The buffer held no complete delimiter before this call
        let mut scan_from = normalize_from.saturating_sub(delimiter.len() - 1);
        while !self.buffer.is_char_boundary(scan_from) {
            scan_from -= 1;
        }

        // The segment after the last delimiter is never complete yet
        let Some(found) = self.buffer[scan_from..].rfind(delimiter) else {
            return Vec::new();
        };
        let split_at = scan_from + found;

        let tail = self.buffer.split_off(split_at + delimiter.len());
        let complete = std::mem::replace(&mut self.buffer, tail);

        let mut offset = self.consumed;
        self.consumed += complete.len();

        let mut frames = Vec::new();
        for segment in complete.split(delimiter) {
            if let Some(frame) = self.extract(segment, offset) {
                frames.push(frame);
            }
            offset += segment.len() + delimiter.len();
        }

        frames
    }

    /// Build a frame from one delimited segment
    fn extract(&self, segment: &str, offset: usize) -> Option<Frame> {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return None;
        }

        let payload = match self.mode {
            FramingMode::Line => match strip_marker(trimmed) {
                Some(data) => data.to_string(),
                None => {
                    trace!("Ignoring non-data line at offset {}", offset);
                    return None;
                }
            },
            FramingMode::Block => {
                // Multiple data lines are joined with newlines
                let mut payload: Option<String> = None;
                for line in trimmed.lines() {
                    match strip_marker(line.trim()) {
                        Some(data) => match payload.as_mut() {
                            Some(p) => {
                                p.push('\n');
                                p.push_str(data);
                            }
                            None => payload = Some(data.to_string()),
                        },
                        None => trace!("Ignoring non-data line in block at offset {}", offset),
                    }
                }
                payload?
            }
        };

        Some(Frame {
            raw: segment.to_string(),
            payload,
            offset,
        })
    }
}

/// Strip the data marker and the whitespace following it
fn strip_marker(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_MARKER).map(str::trim_start)
}
