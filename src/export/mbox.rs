//! Writing repaired messages to the destination mailbox.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use crate::error::{RepairError, Result};
use crate::export::message::message_to_bytes;
use crate::model::MimePart;

/// Appends `From - <date>` separated messages to an mbox file.
///
/// The file is truncated once on creation. Every [`append`](Self::append)
/// opens it in append mode, writes one message and closes it again, so a
/// crash mid-run leaves every finished message on disk.
#[derive(Debug)]
pub struct MboxWriter {
    path: PathBuf,
    messages: u64,
}

impl MboxWriter {
    /// Create or truncate `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::create(&path).map_err(|e| RepairError::io(&path, e))?;
        Ok(Self { path, messages: 0 })
    }

    /// Messages written so far.
    pub fn messages(&self) -> u64 {
        self.messages
    }

    /// Append one message under a separator built from `date`.
    pub fn append(&mut self, date: &DateTime<FixedOffset>, message: &MimePart) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| RepairError::io(&self.path, e))?;
        let mut out = BufWriter::new(file);
        write_entry(&mut out, date, &message_to_bytes(message))
            .map_err(|e| RepairError::io(&self.path, e))?;

        self.messages += 1;
        Ok(())
    }
}

fn write_entry<W: Write>(out: &mut W, date: &DateTime<FixedOffset>, message: &[u8]) -> io::Result<()> {
    out.write_all(separator_line(date).as_bytes())?;
    out.write_all(message)?;
    if !message.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// `From - Tue Feb 03 10:00:00 1998\n`, in the date's own offset.
pub fn separator_line(date: &DateTime<FixedOffset>) -> String {
    date.format("From - %a %b %d %H:%M:%S %Y\n").to_string()
}
