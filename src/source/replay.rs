use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use image::ImageReader;
use tracing::debug;

use crate::error::VisionError;
use crate::models::Frame;
use crate::source::acquisition::{CaptureBackend, CaptureHandle};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Load one image file, or every image of a directory in file-name order.
pub fn load_image_frames<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>, VisionError> {
    let path = path.as_ref();
    let files = image_files(path)?;
    let mut frames = Vec::with_capacity(files.len());
    for file in &files {
        let img = ImageReader::open(file)
            .map_err(|e| VisionError::source_unavailable(format!("{}: {e}", file.display())))?
            .decode()
            .map_err(|e| VisionError::source_unavailable(format!("failed to decode {}: {e}", file.display())))?;
        frames.push(Frame::from_dynamic(img));
    }
    debug!(path = %path.display(), frames = frames.len(), "loaded image frames");
    Ok(frames)
}

fn image_files(path: &Path) -> Result<Vec<PathBuf>, VisionError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path)
        .map_err(|e| VisionError::source_unavailable(format!("{}: {e}", path.display())))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Opens [`ReplayCapture`] handles: a directory (or single image) replayed
/// as an endless stream. Accepts plain paths and `file://` URIs.
#[derive(Debug, Clone, Default)]
pub struct ReplayBackend {
    /// Delay before each frame, standing in for the camera frame period
    pub frame_interval: Duration,
}

impl ReplayBackend {
    pub fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }
}

impl CaptureBackend for ReplayBackend {
    type Handle = ReplayCapture;

    fn open(&self, uri: &str) -> Result<ReplayCapture, VisionError> {
        let path = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
        let frames = load_image_frames(path)?;
        if frames.is_empty() {
            return Err(VisionError::source_unavailable(format!(
                "no images to replay in {}",
                path.display()
            )));
        }
        Ok(ReplayCapture {
            frames,
            cursor: 0,
            frame_interval: self.frame_interval,
            released: false,
        })
    }
}

/// Capture handle cycling through pre-loaded frames.
#[derive(Debug)]
pub struct ReplayCapture {
    frames: Vec<Frame>,
    cursor: usize,
    frame_interval: Duration,
    released: bool,
}

impl CaptureHandle for ReplayCapture {
    fn read(&mut self) -> Result<Frame, VisionError> {
        if self.released {
            return Err(VisionError::read_failure("replay capture already released"));
        }
        if !self.frame_interval.is_zero() {
            thread::sleep(self.frame_interval);
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
        self.cursor = 0;
    }
}
