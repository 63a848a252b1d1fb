use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::VisionError;
use crate::models::{ZoneDefinition, ZoneLabel};

/// Camera framing differs between the two modes, so each one carries its own zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionMode {
    Static,
    Live,
}

impl fmt::Display for InspectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            InspectionMode::Static => "static",
            InspectionMode::Live => "live",
        })
    }
}

/// Pixel to millimetre conversion of the bench camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub mm_per_px: f64,
}

impl Calibration {
    pub fn to_mm(&self, distance_px: f64) -> f64 {
        distance_px * self.mm_per_px
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self { mm_per_px: 0.2 }
    }
}

/// Hysteresis thresholds of the Canny detector run inside each zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self { low: 100.0, high: 200.0 }
    }
}

/// Zones of one mode, expressed for frames of `frame_width` x `frame_height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneLayout {
    pub frame_width: u32,
    pub frame_height: u32,
    pub zones: Vec<ZoneDefinition>,
}

impl ZoneLayout {
    fn static_default() -> Self {
        use ZoneLabel::*;
        Self {
            frame_width: 800,
            frame_height: 500,
            zones: vec![
                ZoneDefinition::new(Left, 70, 75, 100, 170),
                ZoneDefinition::new(Right, 320, 75, 360, 180),
                ZoneDefinition::new(Top, 110, 55, 300, 80),
                ZoneDefinition::new(Bottom, 110, 170, 300, 220),
            ],
        }
    }

    fn live_default() -> Self {
        use ZoneLabel::*;
        Self {
            frame_width: 640,
            frame_height: 480,
            zones: vec![
                ZoneDefinition::new(Left, 230, 290, 260, 370),
                ZoneDefinition::new(Right, 280, 380, 490, 405),
                ZoneDefinition::new(Top, 500, 290, 520, 370),
                ZoneDefinition::new(Bottom, 280, 245, 490, 270),
            ],
        }
    }
}

/// A validated zone layout. Only obtainable through [`ZoneSet::new`] or
/// [`InspectionConfig::zone_set`], so per-frame code never re-checks bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSet {
    mode: InspectionMode,
    frame_width: u32,
    frame_height: u32,
    zones: Vec<ZoneDefinition>,
}

impl ZoneSet {
    pub fn new(mode: InspectionMode, layout: &ZoneLayout) -> Result<Self, VisionError> {
        if layout.frame_width == 0 || layout.frame_height == 0 {
            return Err(VisionError::config(format!("{mode} layout has an empty frame size")));
        }

        let mut zones = layout.zones.clone();
        for zone in &zones {
            if !zone.fits(layout.frame_width, layout.frame_height) {
                return Err(VisionError::ZoneOutOfBounds {
                    mode,
                    label: zone.label,
                    x1: zone.x1,
                    y1: zone.y1,
                    x2: zone.x2,
                    y2: zone.y2,
                    frame_width: layout.frame_width,
                    frame_height: layout.frame_height,
                });
            }
        }

        zones.sort_by_key(|z| z.label);
        if let Some(pair) = zones.windows(2).find(|w| w[0].label == w[1].label) {
            return Err(VisionError::config(format!(
                "{mode} layout defines zone {} more than once",
                pair[0].label
            )));
        }

        Ok(Self {
            mode,
            frame_width: layout.frame_width,
            frame_height: layout.frame_height,
            zones,
        })
    }

    pub fn mode(&self) -> InspectionMode {
        self.mode
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Zones in report order (left, right, top, bottom).
    pub fn zones(&self) -> &[ZoneDefinition] {
        &self.zones
    }
}

/// Everything the inspection needs besides the per-cycle filter toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionConfig {
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default)]
    pub edges: EdgeThresholds,
    pub modes: BTreeMap<InspectionMode, ZoneLayout>,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        let mut modes = BTreeMap::new();
        modes.insert(InspectionMode::Static, ZoneLayout::static_default());
        modes.insert(InspectionMode::Live, ZoneLayout::live_default());
        Self {
            calibration: Calibration::default(),
            edges: EdgeThresholds::default(),
            modes,
        }
    }
}

impl InspectionConfig {
    /// Load a JSON config and validate it before anything gets processed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), modes = config.modes.len(), "loaded inspection config");
        Ok(config)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VisionError> {
        let scale = self.calibration.mm_per_px;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(VisionError::config(format!("mm_per_px must be positive, got {scale}")));
        }
        let EdgeThresholds { low, high } = self.edges;
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
            return Err(VisionError::config(format!(
                "edge thresholds must satisfy 0 <= low <= high, got {low}/{high}"
            )));
        }
        for (mode, layout) in &self.modes {
            ZoneSet::new(*mode, layout)?;
        }
        Ok(())
    }

    pub fn zone_set(&self, mode: InspectionMode) -> Result<ZoneSet, VisionError> {
        let layout = self
            .modes
            .get(&mode)
            .ok_or_else(|| VisionError::config(format!("no zone layout for {mode} mode")))?;
        ZoneSet::new(mode, layout)
    }
}

/// Band-pass window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandPass {
    min: u8,
    max: u8,
}

impl BandPass {
    pub fn new(min: u8, max: u8) -> Result<Self, VisionError> {
        if min > max {
            return Err(VisionError::invalid_filter(format!(
                "band-pass minimum {min} is above maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Parse the raw text of the two threshold inputs.
    pub fn parse(min: &str, max: &str) -> Result<Self, VisionError> {
        let parse_one = |name: &str, text: &str| {
            text.trim().parse::<u8>().map_err(|_| {
                VisionError::invalid_filter(format!("band-pass {name} {text:?} is not an integer in 0..=255"))
            })
        };
        Self::new(parse_one("minimum", min)?, parse_one("maximum", max)?)
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for BandPass {
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

/// Filter toggles for one processing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterConfig {
    pub bandpass_enabled: bool,
    pub bandpass: BandPass,
    pub laplacian_enabled: bool,
    pub edge_detection_enabled: bool,
    pub zone_overlay_enabled: bool,
}

impl FilterConfig {
    /// Whether the zone overlay stage runs at all.
    pub fn overlay_requested(&self) -> bool {
        self.edge_detection_enabled || self.zone_overlay_enabled
    }
}

/// Mutable toggle state owned by the UI side. Produces one immutable
/// [`FilterConfig`] per cycle; rejected threshold edits leave it untouched.
#[derive(Debug, Clone, Default)]
pub struct FilterControls {
    current: FilterConfig,
}

impl FilterControls {
    pub fn new(initial: FilterConfig) -> Self {
        Self { current: initial }
    }

    pub fn set_bandpass_enabled(&mut self, enabled: bool) {
        self.current.bandpass_enabled = enabled;
    }

    pub fn set_laplacian_enabled(&mut self, enabled: bool) {
        self.current.laplacian_enabled = enabled;
    }

    pub fn set_edge_detection_enabled(&mut self, enabled: bool) {
        self.current.edge_detection_enabled = enabled;
    }

    pub fn set_zone_overlay_enabled(&mut self, enabled: bool) {
        self.current.zone_overlay_enabled = enabled;
    }

    /// Apply new threshold text. On error the previous thresholds stay in effect.
    pub fn update_bandpass(&mut self, min: &str, max: &str) -> Result<(), VisionError> {
        match BandPass::parse(min, max) {
            Ok(bandpass) => {
                self.current.bandpass = bandpass;
                Ok(())
            }
            Err(err) => {
                warn!(%err, "ignoring band-pass update");
                Err(err)
            }
        }
    }

    pub fn snapshot(&self) -> FilterConfig {
        self.current
    }
}
