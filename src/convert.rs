//! Whole-mailbox conversion: read frames, repair each, append to the output.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{RepairError, Result};
use crate::export::MboxWriter;
use crate::parser::FrameReader;
use crate::repair::{repair_frame, RepairOptions, RepairedMessage};
use crate::report::{CountingReporter, Reporter};

/// Totals for one conversion run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub messages: u64,
    pub embedded: u64,
    pub attached: u64,
    pub warnings: u64,
    pub errors: u64,
    pub input_size: u64,
    pub output_size: u64,
}

/// Convert `source` into `dest`.
///
/// The source is checked for the Eudora Rescue separator before `dest` is
/// truncated. `on_message` sees every repaired message right after it was
/// written, along with the number of input bytes consumed so far.
pub fn convert_mailbox(
    source: &Path,
    dest: &Path,
    options: &RepairOptions,
    reporter: &mut dyn Reporter,
    on_message: &mut dyn FnMut(&RepairedMessage, u64),
) -> Result<ConversionStats> {
    let input_size = std::fs::metadata(source)
        .map_err(|e| RepairError::open(source, e))?
        .len();
    let mut frames = FrameReader::open(source)?;
    let mut writer = MboxWriter::create(dest)?;
    let mut reporter = CountingReporter::new(reporter);
    let mut stats = ConversionStats {
        input_size,
        ..Default::default()
    };

    while let Some(frame) = frames.next() {
        let repaired = repair_frame(frame?, options, &mut reporter);
        writer.append(&repaired.date, &repaired.message)?;

        stats.messages += 1;
        stats.embedded += repaired.embedded as u64;
        stats.attached += repaired.attached as u64;
        on_message(&repaired, frames.bytes_read());
    }

    stats.warnings = reporter.warnings;
    stats.errors = reporter.errors;
    stats.output_size = std::fs::metadata(dest)
        .map_err(|e| RepairError::io(dest, e))?
        .len();

    info!(
        messages = stats.messages,
        embedded = stats.embedded,
        attached = stats.attached,
        "Conversion finished"
    );
    Ok(stats)
}
