//! Error types for ARIS decoding.
//!
//! Every error in this module is fatal for the file being decoded. Recoverable,
//! single-frame corruption is not an error at all: the stream reader reports it as a
//! [`SkipEvent`](crate::SkipEvent) and keeps going.
//!
//! ## Error Categories
//!
//! - **Header Errors**: Missing bytes or a bad sentinel in the global file header
//! - **Stream Errors**: Truncated frame blocks, unknown ping modes, unresyncable corruption
//! - **File Errors**: Problems opening or reading recordings from disk
//! - **Sink Errors**: Failures writing decoded records, or two inputs mapped to one output
//! - **Config Errors**: Invalid or unreadable conversion configuration
//!
//! ## Diagnostics
//!
//! ```rust
//! use arisfile::ArisError;
//!
//! let error = ArisError::BadMagic { expected: 0x05464444, found: 0 };
//! assert!(error.is_corruption());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ARIS operations.
pub type Result<T, E = ArisError> = std::result::Result<T, E>;

/// Main error type for ARIS decoding and conversion.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ArisError {
    #[error("Malformed file header: need {expected} bytes, found {found}")]
    MalformedHeader { expected: usize, found: usize },

    #[error("Bad file header sentinel: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("Truncated frame header: need exactly {expected} bytes, got {found}")]
    TruncatedHeader { expected: usize, found: usize },

    #[error("Unknown ping mode {ping_mode}{}", describe_offset(.offset))]
    UnknownPingMode { ping_mode: u32, offset: Option<u64> },

    #[error("Truncated stream at byte {offset}: frame header needs {expected} bytes, found {found}")]
    TruncatedStream { offset: u64, expected: usize, found: usize },

    #[error(
        "Truncated payload for frame {frame_index} at byte {offset}: expected {expected} bytes, found {found}"
    )]
    TruncatedPayload { offset: u64, frame_index: u32, expected: usize, found: usize },

    #[error(
        "Corrupt frame header at byte {offset} (sentinel {found_version:#010x}) before any frame geometry is known"
    )]
    UnresyncableStream { offset: u64, found_version: u32 },

    #[error("Frame header at byte {offset} declares a {rows}x{columns} raster that cannot be addressed")]
    OversizedFrame { offset: u64, rows: usize, columns: usize },

    #[error("ARIS file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error during {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sink write failed: {context}")]
    Sink {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Output {} for {} is already used by {}", .output.display(), .input.display(), .claimed_by.display())]
    OutputConflict { output: PathBuf, input: PathBuf, claimed_by: PathBuf },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },
}

fn describe_offset(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!(" in frame header at byte {}", offset),
        None => String::new(),
    }
}

impl ArisError {
    /// Returns whether this error signals corrupt or truncated recording data,
    /// as opposed to an environment problem (I/O, sink, configuration).
    pub fn is_corruption(&self) -> bool {
        match self {
            ArisError::MalformedHeader { .. } => true,
            ArisError::BadMagic { .. } => true,
            ArisError::TruncatedHeader { .. } => true,
            ArisError::UnknownPingMode { .. } => true,
            ArisError::TruncatedStream { .. } => true,
            ArisError::TruncatedPayload { .. } => true,
            ArisError::UnresyncableStream { .. } => true,
            ArisError::OversizedFrame { .. } => true,
            ArisError::File { .. } => false,
            ArisError::Io { .. } => false,
            ArisError::Sink { .. } => false,
            ArisError::OutputConflict { .. } => false,
            ArisError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ArisError::MalformedHeader { .. } | ArisError::BadMagic { .. } => vec![
                "Verify the input is an ARIS (.aris) recording",
                "Check that the file was fully copied from the sonar",
            ],
            ArisError::TruncatedHeader { .. } => {
                vec!["Pass exactly one frame header block to the codec"]
            }
            ArisError::UnknownPingMode { .. } => vec![
                "Check the recording was produced by supported ARIS firmware",
                "Inspect the frame header at the reported offset",
            ],
            ArisError::TruncatedStream { .. } | ArisError::TruncatedPayload { .. } => vec![
                "The recording ends mid-frame; frames before the offset were decoded",
                "Re-export the recording if the acquisition was interrupted",
            ],
            ArisError::UnresyncableStream { .. } => vec![
                "The first frame header is corrupt so frame size cannot be inferred",
                "Inspect the bytes directly after the file header",
            ],
            ArisError::OversizedFrame { .. } => vec![
                "Inspect samples_per_beam in the frame header at the reported offset",
            ],
            ArisError::File { .. } | ArisError::Io { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            ArisError::Sink { .. } => vec![
                "Ensure the output directory is writable",
                "Ensure sufficient disk space",
            ],
            ArisError::OutputConflict { .. } => vec![
                "Rename one of the recordings so their names differ",
                "Convert the recordings into separate output directories",
            ],
            ArisError::Config { .. } => vec![
                "Check configuration keys and value ranges",
                "Remove unknown keys from the configuration file",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArisError::File { path: path.into(), source }
    }

    /// Helper constructor for stream I/O errors.
    pub fn io_error(context: impl Into<String>, source: std::io::Error) -> Self {
        ArisError::Io { context: context.into(), source }
    }

    /// Helper constructor for sink errors.
    pub fn sink_error(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ArisError::Sink { context: context.into(), source: Some(Box::new(source)) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        ArisError::Config { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for ArisError {
    fn from(err: std::io::Error) -> Self {
        ArisError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            found in any::<u32>(),
            offset in any::<u64>(),
            expected in 0usize..1_000_000usize,
            short in 0usize..1024usize,
            frame_index in any::<u32>(),
          ) {
            let magic = ArisError::BadMagic { expected: crate::ARIS_MAGIC, found };
            let hex = format!("{:#010x}", found);
            prop_assert!(magic.to_string().contains(&hex));

            let payload = ArisError::TruncatedPayload { offset, frame_index, expected, found: short };
            let message = payload.to_string();
            prop_assert!(message.contains(&offset.to_string()));
            prop_assert!(message.contains(&expected.to_string()));
            prop_assert!(message.contains(&frame_index.to_string()));

            let stream = ArisError::TruncatedStream { offset, expected: 1024, found: short };
            prop_assert!(stream.to_string().contains(&short.to_string()));
          }

          #[test]
          fn io_conversion_keeps_source_message(reason in ".*") {
            let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone());
            let converted: ArisError = io_err.into();
            match converted {
              ArisError::File { source, .. } => prop_assert_eq!(source.to_string(), reason),
              _ => prop_assert!(false, "Expected File error from io::Error conversion"),
            }
          }
        }
    }

    #[test]
    fn unknown_ping_mode_mentions_offset_only_when_known() {
        let bare = ArisError::UnknownPingMode { ping_mode: 42, offset: None };
        assert_eq!(bare.to_string(), "Unknown ping mode 42");

        let located = ArisError::UnknownPingMode { ping_mode: 42, offset: Some(2048) };
        assert!(located.to_string().contains("at byte 2048"));
    }

    #[test]
    fn corruption_classification() {
        assert!(ArisError::MalformedHeader { expected: 1024, found: 0 }.is_corruption());
        assert!(ArisError::UnresyncableStream { offset: 1024, found_version: 0 }.is_corruption());
        assert!(!ArisError::config_error("test", "bad").is_corruption());

        let file_error = ArisError::file_error(
            "/missing.aris",
            std::io::Error::new(std::io::ErrorKind::NotFound, "test"),
        );
        assert!(!file_error.is_corruption());
        assert!(matches!(file_error, ArisError::File { .. }));
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ArisError>();

        let error = ArisError::sink_error("frame 3", std::io::Error::other("disk full"));
        let source = std::error::Error::source(&error).expect("sink error keeps its source");
        assert_eq!(source.to_string(), "disk full");
    }

    #[test]
    fn every_error_has_recovery_suggestions() {
        let errors = [
            ArisError::MalformedHeader { expected: 1024, found: 3 },
            ArisError::BadMagic { expected: 1, found: 2 },
            ArisError::TruncatedHeader { expected: 1024, found: 2 },
            ArisError::UnknownPingMode { ping_mode: 99, offset: None },
            ArisError::TruncatedStream { offset: 0, expected: 1024, found: 1 },
            ArisError::TruncatedPayload { offset: 0, frame_index: 0, expected: 2, found: 1 },
            ArisError::UnresyncableStream { offset: 0, found_version: 0 },
            ArisError::OversizedFrame { offset: 0, rows: usize::MAX, columns: 128 },
            ArisError::io_error("read", std::io::Error::other("boom")),
            ArisError::config_error("jobs", "must be positive"),
            ArisError::OutputConflict {
                output: PathBuf::from("/out/run"),
                input: PathBuf::from("/b/run.aris"),
                claimed_by: PathBuf::from("/a/run.aris"),
            },
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{:?} has no suggestions", error);
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }
}
