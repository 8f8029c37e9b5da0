//! Newline-delimited framing for a byte stream.
//!
//! TCP delivers a stream, not messages, so something has to decide where one
//! frame ends and the next begins. [`FrameCodec`] uses a single `\n` as the
//! delimiter (a trailing `\r` is tolerated) and plugs into
//! `tokio_util::codec::{FramedRead, FramedWrite}`.
//!
//! Two properties matter to the session layer above:
//!
//! - **Decoding never fails.** Invalid UTF-8 is converted lossily, and a frame
//!   longer than the limit is skipped up to the next delimiter and reported as
//!   [`InboundFrame::Oversized`]. A decoder *error* would terminate the
//!   `FramedRead` stream, which would turn a bad frame into a dead connection.
//! - **Encoding is all-or-nothing.** A frame is written into the buffer in one
//!   piece, so two frames can never interleave as long as writers are
//!   serialized around the `FramedWrite`.

use std::cmp;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The byte that terminates every frame.
pub const DELIMITER: u8 = b'\n';

/// Default upper bound on a single frame, in bytes (64 KiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// One item produced by [`FrameCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A complete frame with the delimiter stripped.
    Text(String),
    /// A frame longer than the limit was discarded.
    Oversized,
}

/// Line-based frame codec with a length limit.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_len: usize,
    // Index into the buffer up to which we already searched for a delimiter.
    next_index: usize,
    discarding: bool,
}

impl FrameCodec {
    /// Creates a codec that accepts frames of up to `max_len` bytes
    /// (delimiter excluded).
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            next_index: 0,
            discarding: false,
        }
    }

    /// Returns the configured frame limit.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = InboundFrame;
    type Error = std::io::Error;

    fn decode(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<InboundFrame>, std::io::Error> {
        loop {
            let read_to = cmp::min(self.max_len.saturating_add(1), buf.len());
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == DELIMITER);

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                    return Ok(Some(InboundFrame::Oversized));
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let mut line = buf.split_to(end + 1);
                    line.truncate(end);
                    return Ok(Some(InboundFrame::Text(into_text(&line))));
                }
                (false, None) if buf.len() > self.max_len => {
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<InboundFrame>, std::io::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        self.next_index = 0;
        if self.discarding {
            // The stream ended in the middle of an oversized frame.
            buf.clear();
            self.discarding = false;
            return Ok(Some(InboundFrame::Oversized));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // A trailing frame without its delimiter: hand it up as-is so the
        // protocol layer can report it as a truncated message.
        let rest = buf.split_to(buf.len());
        Ok(Some(InboundFrame::Text(into_text(&rest))))
    }
}

impl Encoder<&str> for FrameCodec {
    type Error = std::io::Error;

    fn encode(
        &mut self,
        frame: &str,
        buf: &mut BytesMut,
    ) -> Result<(), std::io::Error> {
        if frame.as_bytes().contains(&DELIMITER) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "frame contains the delimiter",
            ));
        }
        buf.reserve(frame.len() + 1);
        buf.put_slice(frame.as_bytes());
        buf.put_u8(DELIMITER);
        Ok(())
    }
}

fn into_text(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
