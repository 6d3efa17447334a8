//! Stream framers: turn the bytes of one session into complete frames.
//!
//! A framer is created fresh for every session, so a partial frame left over
//! from a dropped connection can never be glued onto the next one.

use shared::{DecodeError, FrameError};

/// Telemetry lines are well under 100 bytes
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Splits an accumulating byte stream into frames
pub trait Framer {
    /// Appends `bytes` to the session buffer and returns every frame they
    /// complete, in stream order. Incomplete trailing data stays buffered.
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>>;

    /// Number of buffered bytes not yet part of a complete frame
    fn pending(&self) -> usize;

    /// Frames discarded inside the framer since the last call
    fn take_errors(&mut self) -> Vec<FrameError> {
        Vec::new()
    }
}

/// Newline-delimited frames. The delimiter is not part of the frame.
///
/// A line longer than the limit is discarded up to and including its
/// newline, so a peer that never sends one cannot grow the buffer unbounded.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_len: usize,
    discarding: bool,
    oversized: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_len,
            discarding: false,
            oversized: 0,
        }
    }
}

impl Framer for LineFramer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut rest = bytes;

        while let Some(offset) = rest.iter().position(|&b| b == b'\n') {
            let line = &rest[..offset];
            if self.discarding {
                self.discarding = false;
            } else if self.buffer.len() + line.len() > self.max_len {
                self.oversized += 1;
            } else {
                self.buffer.extend_from_slice(line);
                frames.push(std::mem::take(&mut self.buffer));
            }
            self.buffer.clear();
            rest = &rest[offset + 1..];
        }

        if !self.discarding {
            if self.buffer.len() + rest.len() > self.max_len {
                self.buffer.clear();
                self.discarding = true;
                self.oversized += 1;
            } else {
                self.buffer.extend_from_slice(rest);
            }
        }

        frames
    }

    fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn take_errors(&mut self) -> Vec<FrameError> {
        let limit = self.max_len;
        (0..std::mem::take(&mut self.oversized))
            .map(|_| DecodeError::LineTooLong { limit }.into())
            .collect()
    }
}

/// Fixed-length frames, e.g. one cipher block each
#[derive(Debug)]
pub struct BlockFramer {
    block_len: usize,
    buffer: Vec<u8>,
}

impl BlockFramer {
    pub fn new(block_len: usize) -> Self {
        assert!(block_len > 0, "block length must be non-zero");
        Self {
            block_len,
            buffer: Vec::with_capacity(block_len),
        }
    }
}

impl Framer for BlockFramer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);

        let complete = self.buffer.len() / self.block_len * self.block_len;
        let frames = self.buffer[..complete]
            .chunks_exact(self.block_len)
            .map(<[u8]>::to_vec)
            .collect();
        self.buffer.drain(..complete);

        frames
    }

    fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_reads() {
        let mut framer = LineFramer::new();

        assert!(framer.push(b"abc").is_empty());
        assert_eq!(framer.pending(), 3);

        let frames = framer.push(b"def\nghi\n\njk");
        assert_eq!(frames, vec![b"abcdef".to_vec(), b"ghi".to_vec(), Vec::new()]);
        assert_eq!(framer.pending(), 2);

        assert_eq!(framer.push(b"\n"), vec![b"jk".to_vec()]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_line_keeps_carriage_return() {
        // Whitespace trimming is the consumer's job
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"abc\r\n"), vec![b"abc\r".to_vec()]);
    }

    #[test]
    fn test_fresh_framer_has_no_leftovers() {
        let mut first = LineFramer::new();
        first.push(b"stale-partial");
        assert_eq!(first.pending(), 13);

        let mut second = LineFramer::new();
        assert_eq!(second.push(b"new\n"), vec![b"new".to_vec()]);
    }

    #[test]
    fn test_oversized_line_is_dropped() {
        let mut framer = LineFramer::with_max_len(8);

        assert!(framer.push(b"0123456789").is_empty());
        assert_eq!(framer.pending(), 0);
        assert!(framer.push(&[b'x'; 1000]).is_empty());
        assert_eq!(framer.pending(), 0);

        // The tail of the long line is skipped, the next one survives
        assert_eq!(framer.push(b"tail\nok\n"), vec![b"ok".to_vec()]);
        assert_eq!(
            framer.take_errors(),
            vec![FrameError::Decode(DecodeError::LineTooLong { limit: 8 })]
        );
        assert!(framer.take_errors().is_empty());
    }

    #[test]
    fn test_oversized_line_within_one_read() {
        let mut framer = LineFramer::with_max_len(4);

        let frames = framer.push(b"abcd\nabcdef\nab");
        assert_eq!(frames, vec![b"abcd".to_vec()]);
        assert_eq!(framer.pending(), 2);
        assert_eq!(framer.take_errors().len(), 1);

        assert_eq!(framer.push(b"c\n"), vec![b"abc".to_vec()]);
        assert!(framer.take_errors().is_empty());
    }

    #[test]
    fn test_blocks_from_uneven_reads() {
        let mut framer = BlockFramer::new(4);

        assert!(framer.push(&[1, 2]).is_empty());
        assert_eq!(framer.push(&[3, 4, 5]), vec![vec![1, 2, 3, 4]]);
        assert_eq!(framer.pending(), 1);

        let frames = framer.push(&[6, 7, 8, 9, 10, 11, 12, 13]);
        assert_eq!(frames, vec![vec![5, 6, 7, 8], vec![9, 10, 11, 12]]);
        assert_eq!(framer.pending(), 1);
    }

    #[test]
    fn test_block_exact_multiple() {
        let mut framer = BlockFramer::new(16);
        let frames = framer.push(&[7u8; 48]);

        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.len() == 16));
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    #[should_panic]
    fn test_zero_block_length() {
        BlockFramer::new(0);
    }
}
