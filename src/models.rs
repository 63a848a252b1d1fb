use std::fmt;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Signed second-derivative response produced by the Laplacian stage.
pub type LaplacianImage = ImageBuffer<Luma<i16>, Vec<i16>>;

/// An 8-bit frame as produced by a source, either single-channel or RGB.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Frame {
    /// Keep single-channel images single-channel, everything else becomes RGB8.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => Frame::Gray(gray),
            DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
                Frame::Gray(img.to_luma8())
            }
            other => Frame::Color(other.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Gray(img) => img.dimensions(),
            Frame::Color(img) => img.dimensions(),
        }
    }

    pub fn channels(&self) -> u8 {
        match self {
            Frame::Gray(_) => 1,
            Frame::Color(_) => 3,
        }
    }

    /// Resize to the given size, returning an unchanged copy when it already matches.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let filter = image::imageops::FilterType::CatmullRom;
        match self {
            Frame::Gray(img) => Frame::Gray(image::imageops::resize(img, width, height, filter)),
            Frame::Color(img) => Frame::Color(image::imageops::resize(img, width, height, filter)),
        }
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match self {
            Frame::Gray(img) => DynamicImage::ImageLuma8(img.clone()),
            Frame::Color(img) => DynamicImage::ImageRgb8(img.clone()),
        }
    }
}

/// The frame a pipeline works on. Once the Laplacian stage has run the
/// frame is a single-channel signed map and stays that way.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkingFrame {
    Gray(GrayImage),
    Color(RgbImage),
    Laplacian(LaplacianImage),
}

impl From<Frame> for WorkingFrame {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Gray(img) => WorkingFrame::Gray(img),
            Frame::Color(img) => WorkingFrame::Color(img),
        }
    }
}

impl WorkingFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            WorkingFrame::Gray(img) => img.dimensions(),
            WorkingFrame::Color(img) => img.dimensions(),
            WorkingFrame::Laplacian(img) => img.dimensions(),
        }
    }

    pub fn channels(&self) -> u8 {
        match self {
            WorkingFrame::Color(_) => 3,
            WorkingFrame::Gray(_) | WorkingFrame::Laplacian(_) => 1,
        }
    }

    pub fn is_grayscale(&self) -> bool {
        self.channels() == 1
    }

    /// 8-bit luma view used for edge detection and display. Laplacian
    /// responses saturate into [0, 255].
    pub fn to_gray(&self) -> GrayImage {
        match self {
            WorkingFrame::Gray(img) => img.clone(),
            WorkingFrame::Color(img) => image::imageops::grayscale(img),
            WorkingFrame::Laplacian(img) => {
                ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
                    Luma([saturate_u8(img.get_pixel(x, y)[0])])
                })
            }
        }
    }

    /// Displayable 8-bit image (used for PNG output).
    pub fn to_dynamic(&self) -> DynamicImage {
        match self {
            WorkingFrame::Gray(img) => DynamicImage::ImageLuma8(img.clone()),
            WorkingFrame::Color(img) => DynamicImage::ImageRgb8(img.clone()),
            WorkingFrame::Laplacian(_) => DynamicImage::ImageLuma8(self.to_gray()),
        }
    }
}

pub(crate) fn saturate_u8(v: i16) -> u8 {
    v.clamp(0, 255) as u8
}

/// Closed boundary as an ordered list of integer `(x, y)` points.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contour {
    points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn new(points: Vec<(i32, i32)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shift every point, e.g. from zone-local to frame coordinates.
    pub fn translated(&self, dx: i32, dy: i32) -> Contour {
        Contour {
            points: self.points.iter().map(|&(x, y)| (x + dx, y + dy)).collect(),
        }
    }

    /// Inclusive `(min_x, min_y, max_x, max_y)`, `None` for an empty contour.
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let (&(x0, y0), rest) = self.points.split_first()?;
        Some(rest.iter().fold((x0, y0, x0, y0), |(min_x, min_y, max_x, max_y), &(x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        }))
    }
}

/// Gap regions around a glued piece. The declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneLabel {
    Left,
    Right,
    Top,
    Bottom,
}

impl ZoneLabel {
    pub const ALL: [ZoneLabel; 4] = [ZoneLabel::Left, ZoneLabel::Right, ZoneLabel::Top, ZoneLabel::Bottom];

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneLabel::Left => "left",
            ZoneLabel::Right => "right",
            ZoneLabel::Top => "top",
            ZoneLabel::Bottom => "bottom",
        }
    }
}

impl fmt::Display for ZoneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Axis-aligned inspection rectangle, `x2`/`y2` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    pub label: ZoneLabel,
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl ZoneDefinition {
    pub const fn new(label: ZoneLabel, x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { label, x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// `0 <= x1 < x2 <= width` and `0 <= y1 < y2 <= height`.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x1 < self.x2 && self.x2 <= width && self.y1 < self.y2 && self.y2 <= height
    }
}

/// Gap measured in one zone. Distances are `None` when the zone yielded
/// fewer than two contours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub zone: ZoneLabel,
    pub contour_count: usize,
    pub distance_px: Option<f64>,
    pub distance_mm: Option<f64>,
}

impl Measurement {
    pub fn is_defined(&self) -> bool {
        self.distance_px.is_some()
    }
}

/// Per-zone measurements in fixed zone order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementReport {
    measurements: Vec<Measurement>,
}

impl MeasurementReport {
    pub fn new(mut measurements: Vec<Measurement>) -> Self {
        measurements.sort_by_key(|m| m.zone);
        Self { measurements }
    }

    pub fn get(&self, zone: ZoneLabel) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.zone == zone)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

impl fmt::Display for MeasurementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.measurements {
            match m.distance_mm {
                Some(mm) => writeln!(f, "{:<6} : {:.2} mm ({} contours)", m.zone, mm, m.contour_count)?,
                None => writeln!(f, "{:<6} : n/a ({} contours)", m.zone, m.contour_count)?,
            }
        }
        Ok(())
    }
}
