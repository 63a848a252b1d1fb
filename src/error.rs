use thiserror::Error;

use crate::config::InspectionMode;
use crate::models::ZoneLabel;

/// Failures surfaced by frame sources, configuration and filter controls.
///
/// Measurement degeneracies (a zone with fewer than two contours) are not
/// errors; they show up as an undefined distance in the report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VisionError {
    #[error("frame source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("invalid filter parameter: {reason}")]
    InvalidFilterParameter { reason: String },

    #[error(
        "zone {label} of {mode} mode ({x1},{y1})-({x2},{y2}) does not fit a {frame_width}x{frame_height} frame"
    )]
    ZoneOutOfBounds {
        mode: InspectionMode,
        label: ZoneLabel,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("frame acquisition failed: {reason}")]
    AcquisitionReadFailure { reason: String },

    #[error("invalid inspection config: {reason}")]
    Config { reason: String },
}

impl VisionError {
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable { reason: reason.into() }
    }

    pub fn invalid_filter(reason: impl Into<String>) -> Self {
        Self::InvalidFilterParameter { reason: reason.into() }
    }

    pub fn read_failure(reason: impl Into<String>) -> Self {
        Self::AcquisitionReadFailure { reason: reason.into() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }
}
