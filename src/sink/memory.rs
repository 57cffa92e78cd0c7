//! In-memory sink

use super::RecordSink;
use crate::Result;
use crate::format::FileHeader;
use crate::pipeline::ConversionSummary;
use crate::types::{Frame, SkipEvent};

/// Collects every record it receives.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub header: Option<FileHeader>,
    pub frames: Vec<Frame>,
    pub skips: Vec<SkipEvent>,
    pub summary: Option<ConversionSummary>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of the stored frames, in arrival order.
    pub fn frame_indices(&self) -> Vec<u32> {
        self.frames.iter().map(Frame::index).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.summary.is_some()
    }
}

impl RecordSink for MemorySink {
    fn write_header(&mut self, header: &FileHeader) -> Result<()> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        self.frames.push(frame);
        Ok(())
    }

    fn record_skip(&mut self, skip: &SkipEvent) -> Result<()> {
        self.skips.push(skip.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &ConversionSummary) -> Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}
