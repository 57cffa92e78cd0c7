//! Directory-tree sink
//!
//! ```text
//! <root>/
//!   file_header.yaml
//!   frames/frame_000000.yaml   header fields, geometry, intensity range
//!   frames/frame_000000.raw    row-major payload bytes (optional)
//!   skips.yaml
//!   summary.yaml
//! ```
//!
//! Files are named by the frame's ordinal in the output, not by the frame index
//! stored in its header, so duplicate or out-of-order indices never collide.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::RecordSink;
use crate::format::{FileHeader, FrameGeometry, FrameHeader};
use crate::pipeline::ConversionSummary;
use crate::types::{Frame, SkipEvent};
use crate::{ArisError, Result};

const FRAMES_DIR: &str = "frames";
const FILE_HEADER_FILE: &str = "file_header.yaml";
const SKIPS_FILE: &str = "skips.yaml";
const SUMMARY_FILE: &str = "summary.yaml";

/// Per-frame YAML document.
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    /// Byte offset of the frame header in the recording
    pub offset: u64,
    pub geometry: FrameGeometry,
    pub intensity_min: Option<u8>,
    pub intensity_max: Option<u8>,
    /// Name of the raster file next to this document, when written
    pub raster_file: Option<String>,
    pub header: &'a FrameHeader,
}

/// Writes each recording as a directory of YAML documents and raw rasters.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    write_rasters: bool,
    frames_written: u64,
    skips: Vec<SkipEvent>,
}

impl DirectorySink {
    /// Create the output tree under `root`.
    ///
    /// Output left by an earlier conversion is removed so the tree reflects this
    /// run only. `summary.yaml` appears again only once this run finishes.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for name in [SUMMARY_FILE, SKIPS_FILE, FILE_HEADER_FILE] {
            let path = root.join(name);
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ArisError::sink_error(format!("removing {}", path.display()), e));
                }
            }
        }

        let frames = root.join(FRAMES_DIR);
        if frames.exists() {
            fs::remove_dir_all(&frames).map_err(|e| {
                ArisError::sink_error(format!("clearing {}", frames.display()), e)
            })?;
        }
        fs::create_dir_all(&frames)
            .map_err(|e| ArisError::sink_error(format!("creating {}", frames.display()), e))?;
        debug!("Directory sink ready at {}", root.display());
        Ok(Self { root, write_rasters: true, frames_written: 0, skips: Vec::new() })
    }

    /// Whether to write `.raw` raster files next to the frame documents.
    pub fn with_rasters(mut self, write_rasters: bool) -> Self {
        self.write_rasters = write_rasters;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_yaml<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(value)
            .map_err(|e| ArisError::sink_error(format!("serializing {}", path.display()), e))?;
        fs::write(path, yaml)
            .map_err(|e| ArisError::sink_error(format!("writing {}", path.display()), e))
    }
}

impl RecordSink for DirectorySink {
    fn write_header(&mut self, header: &FileHeader) -> Result<()> {
        self.write_yaml(&self.root.join(FILE_HEADER_FILE), header)
    }

    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        let stem = format!("frame_{:06}", self.frames_written);
        let frames = self.root.join(FRAMES_DIR);

        let raster_file = if self.write_rasters {
            let name = format!("{}.raw", stem);
            let path = frames.join(&name);
            fs::write(&path, frame.raster.as_bytes())
                .map_err(|e| ArisError::sink_error(format!("writing {}", path.display()), e))?;
            Some(name)
        } else {
            None
        };

        let range = frame.raster.intensity_range();
        let record = FrameRecord {
            offset: frame.offset,
            geometry: frame.raster.geometry(),
            intensity_min: range.map(|(min, _)| min),
            intensity_max: range.map(|(_, max)| max),
            raster_file,
            header: &frame.header,
        };
        self.write_yaml(&frames.join(format!("{}.yaml", stem)), &record)?;

        self.frames_written += 1;
        Ok(())
    }

    fn record_skip(&mut self, skip: &SkipEvent) -> Result<()> {
        self.skips.push(skip.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &ConversionSummary) -> Result<()> {
        self.write_yaml(&self.root.join(SKIPS_FILE), &self.skips)?;
        self.write_yaml(&self.root.join(SUMMARY_FILE), summary)?;
        info!(
            "Wrote {} frames and {} skip records to {}",
            self.frames_written,
            self.skips.len(),
            self.root.display()
        );
        Ok(())
    }
}
