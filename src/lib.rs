//! Streaming decoder for ARIS imaging-sonar recordings.
//!
//! An ARIS file is a 1024-byte file header followed by a run of frames, each a
//! 1024-byte frame header plus a raster whose width depends on the frame's ping
//! mode. This crate decodes those files one frame at a time, recovers from
//! isolated corrupt frame headers, and converts recordings into directory trees
//! of YAML metadata and raw rasters.
//!
//! # Features
//!
//! - **Byte-exact codecs**: File and frame headers decode and re-encode losslessly
//! - **Streaming**: One frame in memory at a time, whatever the recording size
//! - **Corruption recovery**: Bad frame sentinels become [`SkipEvent`]s, not failures
//! - **Batch conversion**: Concurrent per-file conversion with progress and cancellation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use arisfile::{ConversionPipeline, DirectorySink};
//!
//! fn main() -> arisfile::Result<()> {
//!     let mut sink = DirectorySink::create("converted/survey")?;
//!     let summary = ConversionPipeline::new().run_file("survey.aris", &mut sink)?;
//!
//!     println!("{} frames, {} skipped", summary.frames_decoded, summary.frames_skipped);
//!     if summary.count_mismatch() {
//!         println!("Header declared {} frames", summary.declared_frame_count);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
pub mod format;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Decoding and conversion
pub mod batch;
pub mod config;
pub mod pipeline;
pub mod reader;
pub mod sink;

// Core exports
pub use error::*;
pub use format::{
    ARIS_MAGIC, FILE_HEADER_SIZE, FRAME_HEADER_SIZE, FileHeader, FixedText, FrameGeometry,
    FrameHeader, beam_count,
};
pub use types::*;

// Conversion exports
pub use batch::{BatchConverter, BatchProgress, BatchReport, FileOutcome, FileReport, discover_inputs};
pub use config::ConversionConfig;
pub use pipeline::{ConversionPipeline, ConversionSummary};
pub use reader::{FrameStreamReader, ReaderState};
pub use sink::{DirectorySink, MemorySink, RecordSink};
