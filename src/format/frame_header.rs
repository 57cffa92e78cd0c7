//! Per-frame ARIS header codec and ping-mode geometry.
//!
//! Every frame starts with a 1024-byte header. The fields the decoder needs
//! (index, sentinel, ping mode, samples per beam) are decoded alongside the
//! commonly used acquisition and attitude fields; the rest of the block is kept
//! verbatim so [`FrameHeader::encode`] reproduces it byte for byte.
//!
//! The raster width is not stored in the header. It comes from the ping mode via
//! [`beam_count`], which must be consulted before any payload read.

use super::bytes::{
    read_f32, read_f64, read_i32, read_u16, read_u32, read_u64, write_f32, write_f64, write_i32,
    write_u16, write_u32, write_u64,
};
use super::{ARIS_MAGIC, FRAME_HEADER_SIZE};
use crate::{ArisError, Result};
use serde::Serialize;

/// Start of the reserved tail of the frame header.
pub const FRAME_RESERVED_START: usize = 744;

/// Beam count (raster column count) for a ping mode.
///
/// | ping mode | beams |
/// |---|---|
/// | 1, 2 | 48 |
/// | 3, 4, 5 | 96 |
/// | 6, 7, 8 | 64 |
/// | 9, 10, 11, 12 | 128 |
///
/// Any other value fails with [`ArisError::UnknownPingMode`].
pub fn beam_count(ping_mode: u32) -> Result<usize> {
    match ping_mode {
        1 | 2 => Ok(48),
        3..=5 => Ok(96),
        6..=8 => Ok(64),
        9..=12 => Ok(128),
        _ => Err(ArisError::UnknownPingMode { ping_mode, offset: None }),
    }
}

/// Raster dimensions of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameGeometry {
    /// Samples per beam (range bins)
    pub rows: usize,
    /// Beam count
    pub columns: usize,
}

impl FrameGeometry {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    /// Payload length in bytes, `None` if it would overflow `usize`.
    pub fn payload_len(&self) -> Option<usize> {
        self.rows.checked_mul(self.columns)
    }
}

/// Decoded ARIS frame header.
///
/// Two headers compare equal when they encode to the same block, so equality
/// covers the named fields and the opaque remainder alike.
#[derive(Debug, Clone, Serialize)]
pub struct FrameHeader {
    pub frame_index: u32,
    pub frame_time: u64,
    pub version: u32,
    pub status: u32,
    pub sonar_timestamp: u64,
    pub ts_day: u32,
    pub ts_hour: u32,
    pub ts_minute: u32,
    pub ts_second: u32,
    pub ts_hsecond: u32,
    pub transmit_mode: u32,
    pub window_start: f32,
    pub window_length: f32,
    pub threshold: u32,
    pub intensity: i32,
    pub receiver_gain: u32,
    pub deg_c1: u32,
    pub deg_c2: u32,
    pub humidity: u32,
    pub focus: u32,
    pub velocity: f32,
    pub depth: f32,
    pub altitude: f32,
    pub pitch: f32,
    pub roll: f32,
    pub heading: f32,
    pub compass_heading: f32,
    pub latitude: f64,
    pub longitude: f64,
    pub water_temp: f32,
    pub sample_rate: f32,
    pub ping_mode: u32,
    pub frequency_hi_low: u32,
    pub pulse_width: u32,
    pub cycle_period: u32,
    pub sample_period: u32,
    pub transmit_enable: u32,
    pub frame_rate: f32,
    pub sound_speed: f32,
    pub samples_per_beam: u32,
    pub enable_150v: u32,
    pub sample_start_delay: u32,
    pub large_lens: u32,
    pub system_type: u32,
    pub sonar_serial_number: u32,
    pub app_version_major: u16,
    pub app_version_minor: u16,
    /// Whole block as read; named fields are written over it on encode.
    #[serde(skip)]
    block: Box<[u8; FRAME_HEADER_SIZE]>,
}

impl Default for FrameHeader {
    fn default() -> Self {
        let mut header = Self::decode_block(Box::new([0u8; FRAME_HEADER_SIZE]));
        header.version = ARIS_MAGIC;
        header
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.encode() == other.encode()
    }
}

impl FrameHeader {
    /// Size of the on-disk frame header in bytes
    pub const HEADER_SIZE: usize = FRAME_HEADER_SIZE;

    /// Decode a frame header. `bytes` must be exactly [`FRAME_HEADER_SIZE`] long.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let block: [u8; FRAME_HEADER_SIZE] = bytes.try_into().map_err(|_| {
            ArisError::TruncatedHeader { expected: FRAME_HEADER_SIZE, found: bytes.len() }
        })?;
        Ok(Self::decode_block(Box::new(block)))
    }

    fn decode_block(block: Box<[u8; FRAME_HEADER_SIZE]>) -> Self {
        let b = &block[..];
        Self {
            frame_index: read_u32(b, 0),
            frame_time: read_u64(b, 4),
            version: read_u32(b, 12),
            status: read_u32(b, 16),
            sonar_timestamp: read_u64(b, 20),
            ts_day: read_u32(b, 28),
            ts_hour: read_u32(b, 32),
            ts_minute: read_u32(b, 36),
            ts_second: read_u32(b, 40),
            ts_hsecond: read_u32(b, 44),
            transmit_mode: read_u32(b, 48),
            window_start: read_f32(b, 52),
            window_length: read_f32(b, 56),
            threshold: read_u32(b, 60),
            intensity: read_i32(b, 64),
            receiver_gain: read_u32(b, 68),
            deg_c1: read_u32(b, 72),
            deg_c2: read_u32(b, 76),
            humidity: read_u32(b, 80),
            focus: read_u32(b, 84),
            velocity: read_f32(b, 124),
            depth: read_f32(b, 128),
            altitude: read_f32(b, 132),
            pitch: read_f32(b, 136),
            roll: read_f32(b, 144),
            heading: read_f32(b, 152),
            compass_heading: read_f32(b, 160),
            latitude: read_f64(b, 172),
            longitude: read_f64(b, 180),
            water_temp: read_f32(b, 224),
            sample_rate: read_f32(b, 420),
            ping_mode: read_u32(b, 436),
            frequency_hi_low: read_u32(b, 440),
            pulse_width: read_u32(b, 444),
            cycle_period: read_u32(b, 448),
            sample_period: read_u32(b, 452),
            transmit_enable: read_u32(b, 456),
            frame_rate: read_f32(b, 460),
            sound_speed: read_f32(b, 464),
            samples_per_beam: read_u32(b, 468),
            enable_150v: read_u32(b, 472),
            sample_start_delay: read_u32(b, 476),
            large_lens: read_u32(b, 480),
            system_type: read_u32(b, 484),
            sonar_serial_number: read_u32(b, 488),
            app_version_major: read_u16(b, 704),
            app_version_minor: read_u16(b, 706),
            block,
        }
    }

    /// Encode back into a [`FRAME_HEADER_SIZE`] block.
    pub fn encode(&self) -> Vec<u8> {
        let mut b = self.block.to_vec();

        write_u32(&mut b, 0, self.frame_index);
        write_u64(&mut b, 4, self.frame_time);
        write_u32(&mut b, 12, self.version);
        write_u32(&mut b, 16, self.status);
        write_u64(&mut b, 20, self.sonar_timestamp);
        write_u32(&mut b, 28, self.ts_day);
        write_u32(&mut b, 32, self.ts_hour);
        write_u32(&mut b, 36, self.ts_minute);
        write_u32(&mut b, 40, self.ts_second);
        write_u32(&mut b, 44, self.ts_hsecond);
        write_u32(&mut b, 48, self.transmit_mode);
        write_f32(&mut b, 52, self.window_start);
        write_f32(&mut b, 56, self.window_length);
        write_u32(&mut b, 60, self.threshold);
        write_i32(&mut b, 64, self.intensity);
        write_u32(&mut b, 68, self.receiver_gain);
        write_u32(&mut b, 72, self.deg_c1);
        write_u32(&mut b, 76, self.deg_c2);
        write_u32(&mut b, 80, self.humidity);
        write_u32(&mut b, 84, self.focus);
        write_f32(&mut b, 124, self.velocity);
        write_f32(&mut b, 128, self.depth);
        write_f32(&mut b, 132, self.altitude);
        write_f32(&mut b, 136, self.pitch);
        write_f32(&mut b, 144, self.roll);
        write_f32(&mut b, 152, self.heading);
        write_f32(&mut b, 160, self.compass_heading);
        write_f64(&mut b, 172, self.latitude);
        write_f64(&mut b, 180, self.longitude);
        write_f32(&mut b, 224, self.water_temp);
        write_f32(&mut b, 420, self.sample_rate);
        write_u32(&mut b, 436, self.ping_mode);
        write_u32(&mut b, 440, self.frequency_hi_low);
        write_u32(&mut b, 444, self.pulse_width);
        write_u32(&mut b, 448, self.cycle_period);
        write_u32(&mut b, 452, self.sample_period);
        write_u32(&mut b, 456, self.transmit_enable);
        write_f32(&mut b, 460, self.frame_rate);
        write_f32(&mut b, 464, self.sound_speed);
        write_u32(&mut b, 468, self.samples_per_beam);
        write_u32(&mut b, 472, self.enable_150v);
        write_u32(&mut b, 476, self.sample_start_delay);
        write_u32(&mut b, 480, self.large_lens);
        write_u32(&mut b, 484, self.system_type);
        write_u32(&mut b, 488, self.sonar_serial_number);
        write_u16(&mut b, 704, self.app_version_major);
        write_u16(&mut b, 706, self.app_version_minor);
        b
    }

    /// Whether the per-frame sentinel matches [`ARIS_MAGIC`].
    pub fn has_valid_version(&self) -> bool {
        self.version == ARIS_MAGIC
    }

    /// Beam count for this frame's ping mode.
    pub fn beam_count(&self) -> Result<usize> {
        beam_count(self.ping_mode)
    }

    /// Raster geometry: samples per beam × beam count.
    pub fn geometry(&self) -> Result<FrameGeometry> {
        Ok(FrameGeometry::new(self.samples_per_beam as usize, self.beam_count()?))
    }

    /// Reserved tail of the block (bytes 744..1024).
    pub fn reserved(&self) -> &[u8] {
        &self.block[FRAME_RESERVED_START..]
    }
}
