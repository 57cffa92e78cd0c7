//! Core types for decoded ARIS data.
//!
//! - [`Frame`] pairs a [`FrameHeader`](crate::FrameHeader) with its [`Raster`]
//! - [`SkipEvent`] records a frame dropped during resynchronization
//! - [`FrameOutcome`] is what the stream reader yields per step
//!
//! Recoverable corruption lives in the data (`FrameOutcome::Skipped`), fatal
//! corruption in the error channel, so callers branch on severity with a `match`.

mod frame;

pub use frame::{Frame, FrameOutcome, Raster, SkipEvent};
