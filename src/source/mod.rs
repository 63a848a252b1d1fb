pub mod acquisition;
pub mod mailbox;
pub mod replay;

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::InspectionMode;
use crate::error::VisionError;
use crate::models::Frame;

pub use acquisition::{AcquisitionLoop, CaptureBackend, CaptureHandle};
pub use mailbox::{FrameMailbox, PublishedFrame};
pub use replay::{ReplayBackend, ReplayCapture, load_image_frames};

/// Where the current frame comes from.
pub enum FrameSource {
    Static(StaticSequence),
    Live(LiveFeed),
}

impl FrameSource {
    pub fn mode(&self) -> InspectionMode {
        match self {
            FrameSource::Static(_) => InspectionMode::Static,
            FrameSource::Live(_) => InspectionMode::Live,
        }
    }

    /// The frame to process now; `None` only for a live feed that has not
    /// delivered anything yet.
    pub fn current(&self) -> Option<Arc<Frame>> {
        match self {
            FrameSource::Static(seq) => Some(seq.current()),
            FrameSource::Live(feed) => feed.current(),
        }
    }
}

/// A fixed, non-empty list of frames with a cursor.
#[derive(Debug, Clone)]
pub struct StaticSequence {
    frames: Vec<Arc<Frame>>,
    cursor: usize,
}

impl StaticSequence {
    pub fn new(frames: Vec<Frame>) -> Result<Self, VisionError> {
        if frames.is_empty() {
            return Err(VisionError::source_unavailable("static image set is empty"));
        }
        Ok(Self {
            frames: frames.into_iter().map(Arc::new).collect(),
            cursor: 0,
        })
    }

    /// Build a sequence with every frame resized to `width` x `height`.
    pub fn from_images(frames: Vec<Frame>, width: u32, height: u32) -> Result<Self, VisionError> {
        Self::new(frames.iter().map(|f| f.resized(width, height)).collect())
    }

    /// Load an image file or directory, resized to `frame_size`.
    pub fn load<P: AsRef<Path>>(path: P, frame_size: (u32, u32)) -> Result<Self, VisionError> {
        let frames = load_image_frames(path)?;
        Self::from_images(frames, frame_size.0, frame_size.1)
    }

    pub fn current(&self) -> Arc<Frame> {
        self.frames[self.cursor].clone()
    }

    /// Step forward; stays on the last frame.
    pub fn advance(&mut self) -> Arc<Frame> {
        if self.cursor + 1 < self.frames.len() {
            self.cursor += 1;
        }
        self.current()
    }

    /// Step back; stays on the first frame.
    pub fn retreat(&mut self) -> Arc<Frame> {
        self.cursor = self.cursor.saturating_sub(1);
        self.current()
    }

    pub fn index(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.frames.len()
    }
}

/// A live capture fed by an [`AcquisitionLoop`].
pub struct LiveFeed {
    acquisition: AcquisitionLoop<Box<dyn CaptureHandle>>,
}

impl LiveFeed {
    /// Open `uri` with `backend` and start acquiring. Frames are resized to
    /// `frame_size` when given.
    pub fn open<B>(backend: &B, uri: &str, frame_size: Option<(u32, u32)>) -> Result<Self, VisionError>
    where
        B: CaptureBackend,
    {
        let handle = backend.open(uri)?;
        info!(uri, "opened live capture");
        Self::start(Box::new(handle), frame_size)
    }

    /// Start acquiring from an already opened handle.
    pub fn start(handle: Box<dyn CaptureHandle>, frame_size: Option<(u32, u32)>) -> Result<Self, VisionError> {
        let mailbox = Arc::new(FrameMailbox::new());
        let acquisition = AcquisitionLoop::start(handle, mailbox, frame_size)?;
        Ok(Self { acquisition })
    }

    /// Most recent frame, never waits.
    pub fn current(&self) -> Option<Arc<Frame>> {
        self.latest().map(|p| p.frame)
    }

    pub fn latest(&self) -> Option<PublishedFrame> {
        self.acquisition.mailbox().latest()
    }

    pub fn published(&self) -> u64 {
        self.acquisition.mailbox().published()
    }

    pub fn is_running(&self) -> bool {
        self.acquisition.is_running()
    }

    /// Surface a read failure of the acquisition loop. The handle is
    /// released before the error is returned.
    pub fn poll_status(&mut self) -> Result<(), VisionError> {
        match self.acquisition.failure() {
            Some(err) => {
                self.shutdown();
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Wait for a frame newer than sequence `after`, checking every
    /// `interval`. Gives up with `Ok(None)` after `max_polls` checks that saw
    /// nothing new, so a stalled capture cannot hold the caller forever.
    pub fn next_after(
        &mut self,
        after: u64,
        interval: Duration,
        max_polls: u32,
    ) -> Result<Option<PublishedFrame>, VisionError> {
        for _ in 0..max_polls {
            self.poll_status()?;
            if let Some(published) = self.latest().filter(|p| p.sequence > after) {
                return Ok(Some(published));
            }
            thread::sleep(interval);
        }
        Ok(None)
    }

    /// Stop acquiring and release the capture handle.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        match self.acquisition.stop() {
            Some(mut handle) => {
                handle.release();
                info!("released live capture");
            }
            None => {
                if self.acquisition.failure().is_none() {
                    warn!("live capture was already stopped");
                }
            }
        }
    }
}
