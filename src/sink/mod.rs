//! Output stores for decoded recordings
//!
//! The pipeline pushes everything it decodes through a [`RecordSink`]. Two
//! implementations ship with the crate:
//!
//! - [`MemorySink`] - keeps records in memory, mainly for tests and inspection
//! - [`DirectorySink`] - writes a YAML and raw-raster directory tree per recording

mod directory;
mod memory;

pub use directory::{DirectorySink, FrameRecord};
pub use memory::MemorySink;

use crate::Result;
use crate::format::FileHeader;
use crate::pipeline::ConversionSummary;
use crate::types::{Frame, SkipEvent};

/// Destination for decoded records.
///
/// Calls arrive in stream order: `write_header` once, then any mix of
/// `write_frame` and `record_skip`, then `finish` once. An error from any call
/// aborts the conversion.
pub trait RecordSink {
    /// Store the validated file header.
    fn write_header(&mut self, header: &FileHeader) -> Result<()>;

    /// Store one decoded frame. The sink takes ownership of the raster.
    fn write_frame(&mut self, frame: Frame) -> Result<()>;

    /// Note a frame dropped during resynchronization.
    fn record_skip(&mut self, skip: &SkipEvent) -> Result<()>;

    /// Called once after the stream ends, also on cancellation.
    fn finish(&mut self, summary: &ConversionSummary) -> Result<()> {
        let _ = summary;
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn write_header(&mut self, header: &FileHeader) -> Result<()> {
        (**self).write_header(header)
    }

    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn record_skip(&mut self, skip: &SkipEvent) -> Result<()> {
        (**self).record_skip(skip)
    }

    fn finish(&mut self, summary: &ConversionSummary) -> Result<()> {
        (**self).finish(summary)
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write_header(&mut self, header: &FileHeader) -> Result<()> {
        (**self).write_header(header)
    }

    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn record_skip(&mut self, skip: &SkipEvent) -> Result<()> {
        (**self).record_skip(skip)
    }

    fn finish(&mut self, summary: &ConversionSummary) -> Result<()> {
        (**self).finish(summary)
    }
}
