use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;

use crate::models::Frame;

/// A frame as handed over by the acquisition loop.
#[derive(Debug, Clone)]
pub struct PublishedFrame {
    pub frame: Arc<Frame>,
    /// 1-based publish counter; gaps between consumed sequences are dropped frames
    pub sequence: u64,
    pub captured_at: OffsetDateTime,
}

/// Single-slot, latest-write-wins hand-off between one producer and any
/// number of readers. Reads never wait for a new frame.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    slot: Mutex<Option<PublishedFrame>>,
    published: AtomicU64,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with `frame`, discarding any unread value.
    pub fn publish(&self, frame: Frame) -> u64 {
        let mut slot = self.lock();
        let sequence = self.published.fetch_add(1, Ordering::AcqRel) + 1;
        *slot = Some(PublishedFrame {
            frame: Arc::new(frame),
            sequence,
            captured_at: OffsetDateTime::now_utc(),
        });
        sequence
    }

    /// Most recent frame, or `None` if nothing was published yet.
    pub fn latest(&self) -> Option<PublishedFrame> {
        self.lock().clone()
    }

    /// Number of frames published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    // The slot only ever holds a complete value, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Option<PublishedFrame>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
