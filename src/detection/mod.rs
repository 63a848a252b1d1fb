pub mod annotation;
pub mod contours;
pub mod preprocessing;
pub mod steps;

use image::GrayImage;
use tracing::{debug, warn};

use crate::config::{Calibration, EdgeThresholds, InspectionConfig, InspectionMode, ZoneSet};
use crate::error::VisionError;
use crate::models::{Contour, Measurement, MeasurementReport, WorkingFrame, ZoneDefinition};

/// Smallest crop side the edge detector can work on.
const MIN_ZONE_SIDE: u32 = 3;

/// Per-zone edge detection, contour extraction and gap measurement for
/// the zones of one inspection mode.
#[derive(Debug, Clone)]
pub struct ZoneContourMeasurer {
    zones: ZoneSet,
    edges: EdgeThresholds,
    calibration: Calibration,
}

/// Contours of one zone, already translated into frame coordinates.
#[derive(Debug, Clone)]
pub struct ZoneResult {
    pub zone: ZoneDefinition,
    pub contours: Vec<Contour>,
    pub measurement: Measurement,
}

impl ZoneContourMeasurer {
    pub fn new(zones: ZoneSet, edges: EdgeThresholds, calibration: Calibration) -> Self {
        Self { zones, edges, calibration }
    }

    pub fn from_config(config: &InspectionConfig, mode: InspectionMode) -> Result<Self, VisionError> {
        Ok(Self::new(config.zone_set(mode)?, config.edges, config.calibration))
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Detect and measure inside one zone of an 8-bit luma frame.
    pub fn measure_zone(&self, gray: &GrayImage, zone: &ZoneDefinition) -> ZoneResult {
        let crop = image::imageops::crop_imm(gray, zone.x1, zone.y1, zone.width(), zone.height()).to_image();

        let local = if crop.width() < MIN_ZONE_SIDE || crop.height() < MIN_ZONE_SIDE {
            Vec::new()
        } else {
            let edges = preprocessing::detect_edges(&crop, self.edges);
            contours::find_external_contours(&edges)
        };

        let distance_px = contours::gap_between_first_two(&local);
        let measurement = Measurement {
            zone: zone.label,
            contour_count: local.len(),
            distance_px,
            distance_mm: distance_px.map(|px| self.calibration.to_mm(px)),
        };

        debug!(
            zone = %zone.label,
            contours = local.len(),
            distance_px = ?distance_px,
            "measured zone"
        );

        let contours = local
            .iter()
            .map(|c| c.translated(zone.x1 as i32, zone.y1 as i32))
            .collect();

        ZoneResult { zone: *zone, contours, measurement }
    }

    /// Measure every zone, draw the contours and zone outlines onto `frame`.
    ///
    /// Detection always reads the frame as it was before any overlay was
    /// drawn, so zones never see each other's annotations.
    pub fn measure(&self, frame: &mut WorkingFrame) -> MeasurementReport {
        let gray = frame.to_gray();
        self.check_frame_size(gray.dimensions());

        let mut measurements = Vec::with_capacity(self.zones.zones().len());
        for zone in self.zones.zones() {
            let result = self.measure_zone(&gray, zone);
            annotation::draw_contours(frame, &result.contours);
            measurements.push(result.measurement);
        }
        self.outline_zones(frame);

        MeasurementReport::new(measurements)
    }

    /// Draw the zone rectangles only.
    pub fn outline_zones(&self, frame: &mut WorkingFrame) {
        for zone in self.zones.zones() {
            annotation::draw_zone(frame, zone);
        }
    }

    fn check_frame_size(&self, actual: (u32, u32)) {
        let expected = self.zones.frame_size();
        if actual != expected {
            warn!(
                mode = %self.zones.mode(),
                ?expected,
                ?actual,
                "frame size differs from zone layout, zones are clipped"
            );
        }
    }
}
