//! Decoded frame types

use serde::Serialize;

use crate::format::{FrameGeometry, FrameHeader};

/// Row-major grid of `u8` sonar intensities.
///
/// Rows are range samples, columns are beams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    geometry: FrameGeometry,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap payload bytes. Returns `None` unless `data.len()` equals
    /// `rows × columns` exactly.
    pub fn new(geometry: FrameGeometry, data: Vec<u8>) -> Option<Self> {
        (geometry.payload_len() == Some(data.len())).then_some(Self { geometry, data })
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn rows(&self) -> usize {
        self.geometry.rows
    }

    pub fn columns(&self) -> usize {
        self.geometry.columns
    }

    /// Sample at `(row, column)`, `None` when out of range.
    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        if row >= self.geometry.rows || column >= self.geometry.columns {
            return None;
        }
        self.data.get(row * self.geometry.columns + column).copied()
    }

    /// One range sample across all beams.
    pub fn row(&self, row: usize) -> Option<&[u8]> {
        if row >= self.geometry.rows {
            return None;
        }
        let start = row * self.geometry.columns;
        self.data.get(start..start + self.geometry.columns)
    }

    /// Smallest and largest intensity, `None` for an empty raster.
    pub fn intensity_range(&self) -> Option<(u8, u8)> {
        let min = self.data.iter().copied().min()?;
        let max = self.data.iter().copied().max()?;
        Some((min, max))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// A frame header together with its raster payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: FrameHeader,
    pub raster: Raster,
    /// Byte offset of the frame header within the recording
    pub offset: u64,
}

impl Frame {
    pub fn index(&self) -> u32 {
        self.header.frame_index
    }
}

/// Record of a frame dropped because its header failed the sentinel check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipEvent {
    /// Byte offset of the corrupt frame header
    pub offset: u64,
    /// Frame index as read from the corrupt header (untrusted)
    pub claimed_index: u32,
    /// Sentinel value found in place of the expected one
    pub found_version: u32,
    /// Payload bytes the skip intended to discard (last known geometry)
    pub bytes_expected: u64,
    /// Payload bytes actually discarded; less than expected only at end of stream
    pub bytes_discarded: u64,
}

/// One step of the frame stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Decoded(Frame),
    Skipped(SkipEvent),
}

impl FrameOutcome {
    pub fn is_skip(&self) -> bool {
        matches!(self, FrameOutcome::Skipped(_))
    }

    /// Byte offset of the frame header this outcome came from.
    pub fn offset(&self) -> u64 {
        match self {
            FrameOutcome::Decoded(frame) => frame.offset,
            FrameOutcome::Skipped(skip) => skip.offset,
        }
    }
}
