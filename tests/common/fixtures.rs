use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use gluegap::config::{InspectionMode, ZoneLayout, ZoneSet};
use gluegap::source::CaptureHandle;
use gluegap::{Frame, VisionError, ZoneDefinition};
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

/// Black single-channel frame.
pub fn black_gray(width: u32, height: u32) -> GrayImage {
    GrayImage::new(width, height)
}

/// Horizontal 0..=255 ramp repeated on every row.
pub fn gray_ramp(width: u32, height: u32) -> GrayImage {
    ImageBuffer::from_fn(width, height, |x, _| Luma([(x * 255 / (width - 1)) as u8]))
}

/// RGB gradient, every channel different.
pub fn color_gradient(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
    })
}

/// Fill `[x0, x1) x [y0, y1)` with white.
pub fn fill_white(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Luma([255]));
        }
    }
}

/// 1px white rectangle outline with inclusive corners, as an edge detector would emit.
pub fn outline(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for x in x0..=x1 {
        img.put_pixel(x, y0, Luma([255]));
        img.put_pixel(x, y1, Luma([255]));
    }
    for y in y0..=y1 {
        img.put_pixel(x0, y, Luma([255]));
        img.put_pixel(x1, y, Luma([255]));
    }
}

/// 400x300 black frame with two 10px wide white bars at x=50 and x=150.
/// The bars stop 50px short of the border: Canny skips border rows, so
/// full-height bars split into four open edge lines instead of two outlines.
pub fn two_bars_frame() -> GrayImage {
    let mut img = black_gray(400, 300);
    fill_white(&mut img, 50, 50, 60, 250);
    fill_white(&mut img, 150, 50, 160, 250);
    img
}

pub fn zone_set(width: u32, height: u32, zones: Vec<ZoneDefinition>) -> ZoneSet {
    ZoneSet::new(InspectionMode::Static, &ZoneLayout { frame_width: width, frame_height: height, zones })
        .expect("test layout should be valid")
}

/// Poll `cond` until it holds or `timeout` expires.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Instrumented capture handle: counts reads, can fail after N frames and
/// records whether it was released.
pub struct CountingCapture {
    pub reads: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
    pub fail_after: Option<usize>,
    pub delay: Duration,
    pub size: (u32, u32),
}

impl CountingCapture {
    pub fn new(size: (u32, u32), delay: Duration) -> Self {
        Self {
            reads: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
            fail_after: None,
            delay,
            size,
        }
    }

    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }
}

impl CaptureHandle for CountingCapture {
    fn read(&mut self) -> Result<Frame, VisionError> {
        thread::sleep(self.delay);
        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_after.is_some_and(|limit| n > limit) {
            return Err(VisionError::read_failure("camera unplugged"));
        }
        Ok(Frame::Gray(GrayImage::from_pixel(self.size.0, self.size.1, Luma([(n % 256) as u8]))))
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
