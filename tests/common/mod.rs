#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from gluegap for tests
pub use gluegap::{
    BandPass, Contour, FilterConfig, Frame, InspectionConfig, InspectionMode, Measurement, MeasurementReport,
    VisionError, WorkingFrame, ZoneContourMeasurer, ZoneDefinition, ZoneLabel,
};
