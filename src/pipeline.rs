//! Conversion pipeline: header, frame stream, sink
//!
//! One call converts one recording. The pipeline validates the file header,
//! hands it to the sink, then drives a [`FrameStreamReader`] to the end of the
//! stream, forwarding decoded frames and skip events as they arrive. Nothing is
//! buffered beyond the frame currently in flight.
//!
//! Cancellation is cooperative and only observed between frames, so a sink never
//! sees half a frame.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::format::FileHeader;
use crate::reader::FrameStreamReader;
use crate::sink::RecordSink;
use crate::types::FrameOutcome;
use crate::{ArisError, ConversionConfig, Result};

/// Counts reported at the end of a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub frames_decoded: u64,
    pub frames_skipped: u64,
    /// Frames handed to the sink after decimation
    pub frames_written: u64,
    /// Frame count claimed by the file header
    pub declared_frame_count: u32,
    /// Bytes read from the start of the recording, file header included
    pub bytes_consumed: u64,
    pub cancelled: bool,
}

impl ConversionSummary {
    /// Whether the decoded frame count differs from the count the file header declares.
    pub fn count_mismatch(&self) -> bool {
        self.frames_decoded != u64::from(self.declared_frame_count)
    }
}

/// Drives one recording from bytes to a [`RecordSink`].
#[derive(Debug, Clone)]
pub struct ConversionPipeline {
    frame_interval: u32,
    cancel: CancellationToken,
    frame_counter: Option<Arc<AtomicU64>>,
}

impl Default for ConversionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionPipeline {
    pub fn new() -> Self {
        Self { frame_interval: 1, cancel: CancellationToken::new(), frame_counter: None }
    }

    /// Pipeline configured from a validated [`ConversionConfig`].
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new().with_frame_interval(config.frame_interval)
    }

    /// Keep every `interval`th decoded frame, starting with the first. 0 behaves like 1.
    pub fn with_frame_interval(mut self, interval: u32) -> Self {
        self.frame_interval = interval.max(1);
        self
    }

    /// Stop at the next frame boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Increment `counter` once per decoded frame, for progress reporting.
    pub fn with_frame_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.frame_counter = Some(counter);
        self
    }

    pub fn frame_interval(&self) -> u32 {
        self.frame_interval
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Decode and validate only the file header.
    pub fn inspect<R: Read>(mut input: R) -> Result<FileHeader> {
        let header = FileHeader::parse_from_reader(&mut input)?;
        header.validate()?;
        Ok(header)
    }

    /// [`ConversionPipeline::inspect`] on a file path.
    pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<FileHeader> {
        let file =
            File::open(path.as_ref()).map_err(|e| ArisError::file_error(path.as_ref(), e))?;
        Self::inspect(BufReader::new(file))
    }

    /// Open `path` and convert it into `sink`.
    pub fn run_file<P: AsRef<Path>, S: RecordSink + ?Sized>(
        &self,
        path: P,
        sink: &mut S,
    ) -> Result<ConversionSummary> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ArisError::file_error(path, e))?;
        info!("Converting {}", path.display());
        self.run(BufReader::new(file), sink)
    }

    /// Convert one recording read from `input` into `sink`.
    ///
    /// A file header that fails to decode or validate is returned as an error
    /// before the sink sees anything. Fatal stream errors are returned after the
    /// header and any earlier frames have been written; `finish` is not called
    /// in that case.
    pub fn run<R: Read, S: RecordSink + ?Sized>(
        &self,
        input: R,
        sink: &mut S,
    ) -> Result<ConversionSummary> {
        let (header, mut reader) = FrameStreamReader::from_stream(input)?;
        debug!(
            "File header: {} frames declared, {} raw beams, serial {}",
            header.frame_count, header.num_raw_beams, header.serial_number
        );
        sink.write_header(&header)?;

        let mut summary = ConversionSummary {
            declared_frame_count: header.frame_count,
            ..ConversionSummary::default()
        };

        loop {
            if self.cancel.is_cancelled() {
                info!(
                    "Conversion cancelled after {} frames at byte {}",
                    summary.frames_decoded,
                    reader.position()
                );
                summary.cancelled = true;
                break;
            }

            let outcome = match reader.next_outcome() {
                Ok(Some(outcome)) => outcome,
                Ok(None) => break,
                Err(e) => {
                    error!(
                        "Stopped after {} decoded and {} skipped frames ({} bytes): {}",
                        summary.frames_decoded,
                        summary.frames_skipped,
                        reader.position(),
                        e
                    );
                    return Err(e);
                }
            };

            match outcome {
                FrameOutcome::Decoded(frame) => {
                    let ordinal = summary.frames_decoded;
                    summary.frames_decoded += 1;
                    if let Some(counter) = &self.frame_counter {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    if let Some((min, max)) = frame.raster.intensity_range() {
                        debug!("Frame {} intensity range {}..={}", frame.index(), min, max);
                    }
                    if ordinal % u64::from(self.frame_interval) == 0 {
                        sink.write_frame(frame)?;
                        summary.frames_written += 1;
                    }
                }
                FrameOutcome::Skipped(skip) => {
                    summary.frames_skipped += 1;
                    sink.record_skip(&skip)?;
                }
            }
        }

        summary.bytes_consumed = reader.position();

        if summary.count_mismatch() && !summary.cancelled {
            warn!(
                "Header declares {} frames but {} were decoded ({} skipped)",
                summary.declared_frame_count, summary.frames_decoded, summary.frames_skipped
            );
        }

        sink.finish(&summary)?;
        info!(
            "Decoded {} frames, skipped {}, wrote {}",
            summary.frames_decoded, summary.frames_skipped, summary.frames_written
        );
        Ok(summary)
    }
}
