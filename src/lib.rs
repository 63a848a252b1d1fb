pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod source;

pub use config::{BandPass, Calibration, FilterConfig, FilterControls, InspectionConfig, InspectionMode, ZoneSet};
pub use detection::ZoneContourMeasurer;
pub use error::VisionError;
pub use models::{Contour, Frame, Measurement, MeasurementReport, WorkingFrame, ZoneDefinition, ZoneLabel};
pub use pipeline::{Inspection, Inspector, Pipeline, PipelineData, PipelineStep, process};
pub use source::{FrameSource, LiveFeed, StaticSequence};
