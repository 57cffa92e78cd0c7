//! Synthetic recording builders for tests and benchmarks
//!
//! Real sonar captures are large and not redistributable, so tests assemble
//! recordings byte by byte through the crate's own header codecs.
//!
//! ```rust,ignore
//! let bytes = RecordingBuilder::new().frame(0, 1, 500).corrupt_frame(1, 1, 500).build();
//! ```

#![cfg(any(test, feature = "benchmark"))]

use std::path::{Path, PathBuf};

use crate::format::{FileHeader, FixedText, FrameHeader, beam_count};

/// Sentinel written into frame headers that should fail validation.
pub const CORRUPT_SENTINEL: u32 = 0xDEAD_BEEF;

/// Deterministic payload bytes for frame `index`.
///
/// Adjacent bytes never repeat, so no window of a payload can ever read back as
/// the four-byte sentinel.
pub fn payload_pattern(index: u32, len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i as u64 * 7 + index as u64) % 251) as u8).collect()
}

/// A file header for a recording declaring `frame_count` frames.
pub fn file_header(frame_count: u32) -> FileHeader {
    FileHeader {
        frame_count,
        frame_rate: 10,
        num_raw_beams: 48,
        sample_rate: 1_000_000.0,
        samples_per_channel: 500,
        serial_number: 1234,
        date: FixedText::new("2019-06-14 09:30:00"),
        header_id: FixedText::new("synthetic"),
        ..FileHeader::default()
    }
}

/// A valid frame header describing a `samples_per_beam × beam_count(ping_mode)` raster.
pub fn frame_header(index: u32, ping_mode: u32, samples_per_beam: u32) -> FrameHeader {
    let mut header = FrameHeader::default();
    header.frame_index = index;
    header.frame_time = 1_560_504_600_000_000 + index as u64 * 100_000;
    header.ping_mode = ping_mode;
    header.samples_per_beam = samples_per_beam;
    header.frame_rate = 10.0;
    header.sound_speed = 1480.0;
    header.window_length = 5.0;
    header
}

fn payload_len(ping_mode: u32, samples_per_beam: u32) -> usize {
    samples_per_beam as usize * beam_count(ping_mode).unwrap_or(0)
}

/// Assembles a synthetic ARIS byte stream.
#[derive(Debug, Clone)]
pub struct RecordingBuilder {
    header: FileHeader,
    declared_frames: Option<u32>,
    frames: u32,
    body: Vec<u8>,
}

impl Default for RecordingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self { header: file_header(0), declared_frames: None, frames: 0, body: Vec::new() }
    }

    /// Overwrite the file header sentinel.
    pub fn file_version(mut self, version: u32) -> Self {
        self.header.version = version;
        self
    }

    /// Declared frame count; defaults to the number of frame blocks appended.
    pub fn declared_frames(mut self, count: u32) -> Self {
        self.declared_frames = Some(count);
        self
    }

    /// Append a valid frame with a [`payload_pattern`] payload.
    pub fn frame(self, index: u32, ping_mode: u32, samples_per_beam: u32) -> Self {
        let payload = payload_pattern(index, payload_len(ping_mode, samples_per_beam));
        self.frame_with(frame_header(index, ping_mode, samples_per_beam), &payload)
    }

    /// Append a frame whose header sentinel is [`CORRUPT_SENTINEL`], with a
    /// payload sized from its own (claimed) geometry.
    pub fn corrupt_frame(self, index: u32, ping_mode: u32, samples_per_beam: u32) -> Self {
        let len = payload_len(ping_mode, samples_per_beam);
        self.corrupt_frame_with_payload(index, ping_mode, samples_per_beam, len)
    }

    /// Append a corrupt frame whose real payload length differs from what its header claims.
    pub fn corrupt_frame_with_payload(
        self,
        index: u32,
        ping_mode: u32,
        samples_per_beam: u32,
        payload_len: usize,
    ) -> Self {
        let mut header = frame_header(index, ping_mode, samples_per_beam);
        header.version = CORRUPT_SENTINEL;
        self.frame_with(header, &payload_pattern(index, payload_len))
    }

    /// Append an arbitrary header and payload.
    pub fn frame_with(mut self, header: FrameHeader, payload: &[u8]) -> Self {
        self.body.extend_from_slice(&header.encode());
        self.body.extend_from_slice(payload);
        self.frames += 1;
        self
    }

    /// Append raw bytes that do not count as a frame.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut header = self.header;
        header.frame_count = self.declared_frames.unwrap_or(self.frames);
        let mut bytes = header.encode();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// Two valid 500-sample, 48-beam frames.
pub fn two_frame_recording() -> Vec<u8> {
    RecordingBuilder::new().frame(0, 1, 500).frame(1, 1, 500).build()
}

/// A valid frame followed by one whose sentinel is corrupt.
pub fn corrupted_second_frame_recording() -> Vec<u8> {
    RecordingBuilder::new().frame(0, 1, 500).corrupt_frame(1, 1, 500).build()
}

/// Write `bytes` to `dir/name`, creating `dir` as needed.
pub fn write_recording(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
