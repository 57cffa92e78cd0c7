//! ARIS recording format structures and codecs
//!
//! ## File Structure
//!
//! An ARIS recording is a flat sequence of fixed-layout blocks:
//!
//! 1. **File Header** (1024 bytes) - sentinel, declared frame count, acquisition settings
//! 2. **Frame Header** (1024 bytes) - per-frame metadata including ping mode and samples per beam
//! 3. **Frame Payload** (samples_per_beam × beam_count bytes) - row-major `u8` raster
//! 4. Frame header and payload repeat until end of file
//!
//! There is no index and no fixed stride: the position of frame N is only known
//! after walking frames 0..N.
//!
//! All fields are little-endian with no padding between them. Decoding works on
//! byte buffers at documented offsets; nothing is reinterpreted in place.

mod bytes;
pub mod file_header;
pub mod frame_header;

pub use bytes::FixedText;
pub use file_header::FileHeader;
pub use frame_header::{FrameGeometry, FrameHeader, beam_count};

/// Sentinel stored in both the file header and every frame header.
pub const ARIS_MAGIC: u32 = 0x0546_4444;

/// Size of the global file header in bytes.
pub const FILE_HEADER_SIZE: usize = 1024;

/// Size of each frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 1024;
