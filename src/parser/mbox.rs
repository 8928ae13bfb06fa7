//! Streaming reader for Eudora Rescue mailboxes.
//!
//! Messages are separated by lines starting with `From ???@??? `. The file is
//! read line by line through a 1 MB buffer and never loaded whole. Each
//! message block is rewritten by the line rules and parsed leniently as soon
//! as its closing separator (or end of file) is reached.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RepairError, Result};
use crate::model::MimePart;
use crate::parser::message::parse_message;
use crate::parser::rules::{apply_line_rules, date_remainder, LineRepair};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Prefix of every separator line written by Eudora Rescue.
pub const SENTINEL: &[u8] = b"From ???@??? ";

/// One message recovered from the mailbox.
#[derive(Debug, Clone)]
pub struct Frame {
    pub message: MimePart,
    /// Remainder of the last `Date:` line seen in this block.
    pub date_fallback: Option<String>,
    /// Lines the rewrite rules changed, in file order.
    pub repairs: Vec<LineRepair>,
    /// Byte offset of the block's first line.
    pub offset: u64,
}

/// Lazy iterator over the frames of a mailbox.
///
/// Yields one frame per separator, including a trailing empty block when the
/// file ends right after a separator. An I/O error is yielded once and ends
/// the iteration.
pub struct FrameReader<R> {
    reader: R,
    origin: PathBuf,
    bytes_read: u64,
    finished: bool,
}

impl FrameReader<BufReader<File>> {
    /// Open a mailbox file and check its first separator.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RepairError::open(path, e))?;
        Self::new(BufReader::with_capacity(READ_BUFFER_SIZE, file), path)
    }
}

impl<R: BufRead> FrameReader<R> {
    /// Wrap a reader positioned at the start of a mailbox. `origin` names
    /// the source in errors.
    ///
    /// Fails with [`RepairError::MissingSentinel`] unless the first line
    /// starts with `From ???@??? `.
    pub fn new(mut reader: R, origin: impl Into<PathBuf>) -> Result<Self> {
        let origin = origin.into();
        let mut first = Vec::new();
        let n = reader
            .read_until(b'\n', &mut first)
            .map_err(|e| RepairError::io(&origin, e))?;
        if !first.starts_with(SENTINEL) {
            return Err(RepairError::MissingSentinel(origin));
        }
        Ok(Self {
            reader,
            origin,
            bytes_read: n as u64,
            finished: false,
        })
    }

    /// Bytes consumed so far, separators included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let offset = self.bytes_read;
        let mut block = Vec::with_capacity(16 * 1024);
        let mut date_fallback = None;
        let mut repairs = Vec::new();

        loop {
            let mut line = Vec::with_capacity(256);
            let n = self
                .reader
                .read_until(b'\n', &mut line)
                .map_err(|e| RepairError::io(&self.origin, e))?;
            self.bytes_read += n as u64;
            if n == 0 {
                self.finished = true;
                break;
            }
            if line.starts_with(SENTINEL) {
                break;
            }

            let line = apply_line_rules(line, &mut repairs);
            if let Some(date) = date_remainder(&line) {
                date_fallback = Some(date);
            }
            block.extend_from_slice(&line);
        }

        debug!(offset, len = block.len(), "Read message block");
        Ok(Frame {
            message: parse_message(&block),
            date_fallback,
            repairs,
            offset,
        })
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let frame = self.read_frame();
        if frame.is_err() {
            self.finished = true;
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frames(data: &[u8]) -> Vec<Frame> {
        FrameReader::new(Cursor::new(data.to_vec()), "test.mbox")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_missing_sentinel() {
        let err = FrameReader::new(Cursor::new(b"From someone else\n".to_vec()), "x.mbox")
            .err()
            .unwrap();
        assert!(matches!(err, RepairError::MissingSentinel(_)));

        let err = FrameReader::new(Cursor::new(Vec::new()), "empty.mbox")
            .err()
            .unwrap();
        assert!(matches!(err, RepairError::MissingSentinel(_)));
    }

    #[test]
    fn test_splits_on_separators() {
        let data = b"From ???@??? Mon Jan 01 00:00:00 2001\n\
Subject: one\n\nbody one\n\
From ???@??? Mon Jan 01 00:00:00 2001\n\
Subject: two\n\nbody two\n";
        let frames = frames(data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].message.get("subject").as_deref(), Some("one"));
        assert_eq!(frames[0].message.text_content().as_deref(), Some("body one\n"));
        assert_eq!(frames[1].message.get("subject").as_deref(), Some("two"));
        assert_eq!(frames[1].message.text_content().as_deref(), Some("body two\n"));
        assert!(frames[1].offset > frames[0].offset);
    }

    #[test]
    fn test_trailing_separator_yields_empty_frame() {
        let frames = frames(b"From ???@??? x\nSubject: a\n\nb\nFrom ???@??? y\n");
        assert_eq!(frames.len(), 2);
        assert!(frames[1].message.headers().is_empty());
    }

    #[test]
    fn test_date_fallback_is_per_frame() {
        let data = b"From ???@??? x\nX-Junk\nDate: Tue, 3 Feb 1998 10:00:00 -0500\n\nb\n\
From ???@??? y\nSubject: none\n\nb\n";
        let frames = frames(data);
        assert_eq!(
            frames[0].date_fallback.as_deref(),
            Some("Tue, 3 Feb 1998 10:00:00 -0500")
        );
        assert_eq!(frames[1].date_fallback, None);
    }

    #[test]
    fn test_line_repairs_recorded() {
        let data = b"From ???@??? x\nMessage-ID: <[id@host]>\nSubject: s\n\nb\n";
        let frames = frames(data);
        assert_eq!(frames[0].repairs.len(), 1);
        assert_eq!(
            frames[0].message.get("message-id").as_deref(),
            Some("<id@host>")
        );
    }

    #[test]
    fn test_bytes_read_counts_everything() {
        let data = b"From ???@??? x\nSubject: a\n\nb\n";
        let mut reader = FrameReader::new(Cursor::new(data.to_vec()), "t").unwrap();
        while reader.next().is_some() {}
        assert_eq!(reader.bytes_read(), data.len() as u64);
    }
}
