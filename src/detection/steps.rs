use std::sync::Arc;

use crate::config::BandPass;
use crate::detection::{ZoneContourMeasurer, preprocessing};
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep};

/// Keep samples inside `[min, max]`, zero the rest
pub struct BandPassStep {
    pub band: BandPass,
}

impl PipelineStep for BandPassStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> PipelineData {
        PipelineData {
            image: preprocessing::apply_bandpass(&data.image, self.band),
            ..data
        }
    }

    fn name(&self) -> &str {
        "Band-pass"
    }
}

/// Grayscale Laplacian edge emphasis
pub struct LaplacianStep;

impl PipelineStep for LaplacianStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> PipelineData {
        PipelineData {
            image: preprocessing::apply_laplacian(&data.image),
            laplacian_applied: true,
            ..data
        }
    }

    fn name(&self) -> &str {
        "Laplacian"
    }
}

/// Draw the inspection zones and, when `measure` is set, detect contours
/// and measure the gap in each zone.
pub struct ZoneOverlayStep {
    pub measurer: Arc<ZoneContourMeasurer>,
    pub measure: bool,
}

impl PipelineStep for ZoneOverlayStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> PipelineData {
        let mut image = data.image;
        let report = if self.measure {
            Some(self.measurer.measure(&mut image))
        } else {
            self.measurer.outline_zones(&mut image);
            None
        };
        PipelineData {
            image,
            report,
            ..data
        }
    }

    fn name(&self) -> &str {
        if self.measure { "Contour Detection" } else { "Zone Overlay" }
    }
}
