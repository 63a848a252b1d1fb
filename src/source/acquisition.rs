use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::VisionError;
use crate::models::Frame;
use crate::source::mailbox::FrameMailbox;

/// An opened capture device.
pub trait CaptureHandle: Send + 'static {
    /// Blocking read of the next frame.
    fn read(&mut self) -> Result<Frame, VisionError>;

    /// Release the device. Called once, after the acquisition loop has exited.
    fn release(&mut self);
}

impl<T: CaptureHandle + ?Sized> CaptureHandle for Box<T> {
    fn read(&mut self) -> Result<Frame, VisionError> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Opens capture handles from a URI.
pub trait CaptureBackend {
    type Handle: CaptureHandle;

    fn open(&self, uri: &str) -> Result<Self::Handle, VisionError>;
}

#[derive(Debug, Default)]
struct LoopState {
    stop: AtomicBool,
    failure: Mutex<Option<VisionError>>,
}

/// Background thread that keeps reading a capture handle and publishes
/// every frame into a [`FrameMailbox`], overwriting unread ones.
///
/// The handle belongs to the thread while it runs and comes back to the
/// caller through [`AcquisitionLoop::stop`].
pub struct AcquisitionLoop<H: CaptureHandle> {
    state: Arc<LoopState>,
    mailbox: Arc<FrameMailbox>,
    worker: Option<JoinHandle<H>>,
}

impl<H: CaptureHandle> AcquisitionLoop<H> {
    /// Spawn the loop. Frames are resized to `frame_size` before publishing
    /// when one is given.
    pub fn start(
        handle: H,
        mailbox: Arc<FrameMailbox>,
        frame_size: Option<(u32, u32)>,
    ) -> Result<Self, VisionError> {
        let state = Arc::new(LoopState::default());
        let worker = {
            let state = state.clone();
            let mailbox = mailbox.clone();
            thread::Builder::new()
                .name("frame-acquisition".to_string())
                .spawn(move || acquire(handle, &state, &mailbox, frame_size))
                .map_err(|e| VisionError::source_unavailable(format!("cannot spawn acquisition thread: {e}")))?
        };
        info!("frame acquisition started");
        Ok(Self {
            state,
            mailbox,
            worker: Some(worker),
        })
    }

    pub fn mailbox(&self) -> &Arc<FrameMailbox> {
        &self.mailbox
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// The read failure that ended the loop, if any.
    pub fn failure(&self) -> Option<VisionError> {
        self.state.failure.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Signal the loop, wait for it to exit and hand the capture handle
    /// back. Returns `None` on every call after the first.
    pub fn stop(&mut self) -> Option<H> {
        self.state.stop.store(true, Ordering::Release);
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(handle) => {
                info!(published = self.mailbox.published(), "frame acquisition stopped");
                Some(handle)
            }
            Err(_) => {
                warn!("frame acquisition thread panicked, capture handle lost");
                None
            }
        }
    }
}

impl<H: CaptureHandle> Drop for AcquisitionLoop<H> {
    fn drop(&mut self) {
        if let Some(mut handle) = self.stop() {
            handle.release();
        }
    }
}

fn acquire<H: CaptureHandle>(
    mut handle: H,
    state: &LoopState,
    mailbox: &FrameMailbox,
    frame_size: Option<(u32, u32)>,
) -> H {
    while !state.stop.load(Ordering::Acquire) {
        match handle.read() {
            Ok(frame) => {
                // stop() may have been called while we were blocked in read()
                if state.stop.load(Ordering::Acquire) {
                    break;
                }
                let frame = match frame_size {
                    Some((width, height)) => frame.resized(width, height),
                    None => frame,
                };
                let sequence = mailbox.publish(frame);
                debug!(sequence, "published frame");
            }
            Err(err) => {
                warn!(%err, "capture read failed, stopping acquisition");
                *state.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                break;
            }
        }
    }
    handle
}
