use image::{GrayImage, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::laplacian_filter;
use imageproc::map::map_subpixels;
use imageproc::stats::histogram as channel_histogram;

use crate::config::{BandPass, EdgeThresholds};
use crate::models::{LaplacianImage, WorkingFrame, saturate_u8};

/// Convert image to grayscale
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Zero every sample outside the band. Shape and channel count are kept;
/// a Laplacian frame keeps only responses inside the band.
pub fn apply_bandpass(frame: &WorkingFrame, band: BandPass) -> WorkingFrame {
    let keep = |v: u8| if band.contains(v) { v } else { 0 };
    match frame {
        WorkingFrame::Gray(img) => WorkingFrame::Gray(map_subpixels(img, keep)),
        WorkingFrame::Color(img) => WorkingFrame::Color(map_subpixels(img, keep)),
        WorkingFrame::Laplacian(img) => {
            let (min, max) = (i16::from(band.min()), i16::from(band.max()));
            WorkingFrame::Laplacian(map_subpixels(img, |v: i16| if (min..=max).contains(&v) { v } else { 0 }))
        }
    }
}

/// Second-derivative response of the luma channel. Always single-channel.
pub fn apply_laplacian(frame: &WorkingFrame) -> WorkingFrame {
    let response: LaplacianImage = match frame {
        WorkingFrame::Gray(img) => laplacian_filter(img),
        WorkingFrame::Color(img) => laplacian_filter(&to_grayscale(img)),
        WorkingFrame::Laplacian(_) => laplacian_filter(&frame.to_gray()),
    };
    WorkingFrame::Laplacian(response)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, thresholds: EdgeThresholds) -> GrayImage {
    canny(img, thresholds.low, thresholds.high)
}

/// 256 intensity bins accumulated over every channel of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub bins: [u64; 256],
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Most populated bin, lowest value on ties.
    pub fn peak(&self) -> (u8, u64) {
        let (value, count) = self
            .bins
            .iter()
            .enumerate()
            .fold((0, 0), |best, (v, &c)| if c > best.1 { (v, c) } else { best });
        (value as u8, count)
    }

    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: u64 = self.bins.iter().enumerate().map(|(v, &c)| v as u64 * c).sum();
        weighted as f64 / total as f64
    }
}

/// Histogram over the frame's current representation. Laplacian responses
/// are clamped into [0, 255] so the bins always add up to the sample count.
pub fn histogram(frame: &WorkingFrame) -> Histogram {
    let mut bins = [0u64; 256];
    match frame {
        WorkingFrame::Gray(img) => accumulate(&mut bins, &channel_histogram(img).channels),
        WorkingFrame::Color(img) => accumulate(&mut bins, &channel_histogram(img).channels),
        WorkingFrame::Laplacian(img) => {
            for v in img.iter() {
                bins[usize::from(saturate_u8(*v))] += 1;
            }
        }
    }
    Histogram { bins }
}

fn accumulate(bins: &mut [u64; 256], channels: &[[u32; 256]]) {
    for channel in channels {
        for (bin, count) in bins.iter_mut().zip(channel.iter()) {
            *bin += u64::from(*count);
        }
    }
}
