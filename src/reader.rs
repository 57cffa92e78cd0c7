//! Sequential frame reader with single-frame corruption recovery
//!
//! Frames have no index and no fixed stride, so the only way to find frame N is
//! to walk frames 0..N. [`FrameStreamReader`] does that walk once, forward only,
//! yielding one [`FrameOutcome`] per frame header it reads.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use arisfile::{FrameOutcome, FrameStreamReader};
//!
//! fn scan() -> arisfile::Result<()> {
//!     let (header, frames) = FrameStreamReader::open("survey.aris")?;
//!     println!("Header declares {} frames", header.frame_count);
//!
//!     for outcome in frames {
//!         match outcome? {
//!             FrameOutcome::Decoded(frame) => println!("frame {}", frame.index()),
//!             FrameOutcome::Skipped(skip) => println!("skipped at byte {}", skip.offset),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## State Machine
//!
//! ```text
//!              ┌──── Frame / SkipEvent ────┐
//!              ▼                           │
//!       ExpectHeader ──────────────────────┘
//!          │     │
//!   0 bytes│     │ truncated block, unknown ping mode,
//!          ▼     ▼ short payload, unresyncable skip
//!         Eof   Fatal
//! ```
//!
//! ## Resynchronization
//!
//! A frame header whose sentinel is wrong cannot be trusted for its geometry, so
//! the reader discards as many payload bytes as the last successfully decoded
//! frame carried and tries the next header. This assumes the raster geometry is
//! constant across the file. If a recording changes ping mode or samples per beam
//! and the frame after the change is corrupt, the skip is mis-sized and the
//! reader loses frame alignment; that usually ends in further skips or a
//! truncation error. With no frame decoded yet there is nothing to size the skip
//! from, and the stream is abandoned with [`ArisError::UnresyncableStream`].

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::iter::FusedIterator;
use std::path::Path;
use tracing::{debug, error, trace, warn};

use crate::format::{FILE_HEADER_SIZE, FRAME_HEADER_SIZE, FileHeader, FrameGeometry, FrameHeader};
use crate::types::{Frame, FrameOutcome, Raster, SkipEvent};
use crate::{ArisError, Result};

// Upper bound on payload pre-allocation; larger payloads grow as bytes arrive.
const MAX_PAYLOAD_PREALLOC: usize = 1 << 20;

/// Reader state. `Eof` and `Fatal` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    ExpectHeader,
    Eof,
    Fatal,
}

/// Lazy, forward-only decoder of the frames following a file header.
///
/// Construct a fresh reader to scan a stream again; a finished reader stays finished.
pub struct FrameStreamReader<R> {
    reader: R,
    state: ReaderState,
    position: u64,
    last_geometry: Option<FrameGeometry>,
}

impl FrameStreamReader<BufReader<File>> {
    /// Open a recording, validate its file header and position the reader on the first frame.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(FileHeader, Self)> {
        let file =
            File::open(path.as_ref()).map_err(|e| ArisError::file_error(path.as_ref(), e))?;
        Self::from_stream(BufReader::new(file))
    }
}

impl<R: Read> FrameStreamReader<R> {
    /// Wrap a stream already positioned just past a validated file header.
    pub fn new(reader: R) -> Self {
        Self::with_position(reader, FILE_HEADER_SIZE as u64)
    }

    /// Like [`FrameStreamReader::new`] with an explicit starting byte offset,
    /// used only for diagnostics.
    pub fn with_position(reader: R, position: u64) -> Self {
        Self { reader, state: ReaderState::ExpectHeader, position, last_geometry: None }
    }

    /// Decode and validate the file header from `reader`, then hand back a frame reader.
    pub fn from_stream(mut reader: R) -> Result<(FileHeader, Self)> {
        let header = FileHeader::parse_from_reader(&mut reader)?;
        header.validate()?;
        Ok((header, Self::new(reader)))
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Byte offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Geometry of the most recently decoded frame.
    pub fn last_geometry(&self) -> Option<FrameGeometry> {
        self.last_geometry
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Advance by one frame.
    ///
    /// Returns:
    /// - `Ok(Some(outcome))` - a decoded frame or a skip event
    /// - `Ok(None)` - clean end of stream, or the reader already finished
    /// - `Err(e)` - fatal error; every later call returns `Ok(None)`
    pub fn next_outcome(&mut self) -> Result<Option<FrameOutcome>> {
        if self.state != ReaderState::ExpectHeader {
            return Ok(None);
        }

        match self.step() {
            Ok(Some(outcome)) => Ok(Some(outcome)),
            Ok(None) => {
                debug!("End of frame stream at byte {}", self.position);
                self.state = ReaderState::Eof;
                Ok(None)
            }
            Err(e) => {
                error!("Frame stream abandoned at byte {}: {}", self.position, e);
                self.state = ReaderState::Fatal;
                Err(e)
            }
        }
    }

    fn step(&mut self) -> Result<Option<FrameOutcome>> {
        let offset = self.position;
        let mut block = [0u8; FRAME_HEADER_SIZE];
        let found = read_full(&mut self.reader, &mut block).map_err(|e| {
            ArisError::io_error(format!("frame header read at byte {}", offset), e)
        })?;
        self.position += found as u64;
        trace!("Read {} frame header bytes at offset {}", found, offset);

        if found == 0 {
            return Ok(None);
        }
        if found < FRAME_HEADER_SIZE {
            return Err(ArisError::TruncatedStream {
                offset,
                expected: FRAME_HEADER_SIZE,
                found,
            });
        }

        let header = FrameHeader::decode(&block)?;
        if !header.has_valid_version() {
            return self.skip(offset, &header).map(Some);
        }

        let geometry = header.geometry().map_err(|e| match e {
            ArisError::UnknownPingMode { ping_mode, .. } => {
                ArisError::UnknownPingMode { ping_mode, offset: Some(offset) }
            }
            other => other,
        })?;
        let expected = geometry.payload_len().ok_or(ArisError::OversizedFrame {
            offset,
            rows: geometry.rows,
            columns: geometry.columns,
        })?;

        let mut payload = Vec::with_capacity(expected.min(MAX_PAYLOAD_PREALLOC));
        self.reader.by_ref().take(expected as u64).read_to_end(&mut payload).map_err(|e| {
            ArisError::io_error(format!("payload read for frame {}", header.frame_index), e)
        })?;
        self.position += payload.len() as u64;

        let found = payload.len();
        let raster = Raster::new(geometry, payload).ok_or(ArisError::TruncatedPayload {
            offset,
            frame_index: header.frame_index,
            expected,
            found,
        })?;

        debug!(
            "Frame {} at byte {}: ping_mode={}, {}x{}",
            header.frame_index, offset, header.ping_mode, geometry.rows, geometry.columns
        );
        self.last_geometry = Some(geometry);

        Ok(Some(FrameOutcome::Decoded(Frame { header, raster, offset })))
    }

    fn skip(&mut self, offset: u64, header: &FrameHeader) -> Result<FrameOutcome> {
        let Some(geometry) = self.last_geometry else {
            return Err(ArisError::UnresyncableStream { offset, found_version: header.version });
        };

        let bytes_expected = (geometry.rows as u64).saturating_mul(geometry.columns as u64);
        let bytes_discarded =
            std::io::copy(&mut self.reader.by_ref().take(bytes_expected), &mut std::io::sink())
                .map_err(|e| {
                    ArisError::io_error(format!("resync discard at byte {}", offset), e)
                })?;
        self.position += bytes_discarded;

        warn!(
            "Frame header at byte {} has sentinel {:#010x} (claims frame {}), skipped {} bytes",
            offset, header.version, header.frame_index, bytes_discarded
        );

        Ok(FrameOutcome::Skipped(SkipEvent {
            offset,
            claimed_index: header.frame_index,
            found_version: header.version,
            bytes_expected,
            bytes_discarded,
        }))
    }
}

impl<R: Read> Iterator for FrameStreamReader<R> {
    type Item = Result<FrameOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_outcome().transpose()
    }
}

impl<R: Read> FusedIterator for FrameStreamReader<R> {}

/// Fill `buf` from `reader` until it is full or the stream ends.
///
/// Returns the number of bytes read; fewer than `buf.len()` means end of stream.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
