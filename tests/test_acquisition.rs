//! Integration tests for the frame mailbox, the acquisition loop and live feeds.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use gluegap::LiveFeed;
use gluegap::source::{AcquisitionLoop, FrameMailbox, FrameSource};
use image::{GrayImage, Luma};

use common::*;

const TIMEOUT: Duration = Duration::from_secs(5);

fn gray_frame(value: u8) -> Frame {
    Frame::Gray(GrayImage::from_pixel(4, 4, Luma([value])))
}

#[test]
fn test_mailbox_latest_write_wins() {
    let mailbox = FrameMailbox::new();
    assert!(mailbox.latest().is_none());

    for v in [1, 2, 3] {
        mailbox.publish(gray_frame(v));
    }

    let latest = mailbox.latest().unwrap();
    assert_eq!(latest.sequence, 3);
    assert_eq!(*latest.frame, gray_frame(3));
    assert_eq!(mailbox.published(), 3);

    // reading does not consume
    assert_eq!(mailbox.latest().unwrap().sequence, 3);

    mailbox.clear();
    assert!(mailbox.latest().is_none());
    assert_eq!(mailbox.published(), 3);
}

#[test]
fn test_no_writes_after_stop() {
    let capture = CountingCapture::new((8, 8), Duration::from_millis(2));
    let reads = capture.reads.clone();
    let released = capture.released.clone();
    let mailbox = Arc::new(FrameMailbox::new());

    let mut acquisition = AcquisitionLoop::start(capture, mailbox.clone(), None).unwrap();
    assert!(wait_until(TIMEOUT, || mailbox.published() >= 3));

    let handle = acquisition.stop();
    assert!(handle.is_some());
    assert!(!acquisition.is_running());

    let published = mailbox.published();
    let read_count = reads.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(mailbox.published(), published, "mailbox written after stop");
    assert_eq!(reads.load(Ordering::SeqCst), read_count);

    // the handle belongs to the caller now; the loop never released it
    assert!(!released.load(Ordering::SeqCst));
    let mut handle = handle.unwrap();
    gluegap::source::CaptureHandle::release(&mut handle);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn test_stop_is_idempotent() {
    let mailbox = Arc::new(FrameMailbox::new());
    let mut acquisition =
        AcquisitionLoop::start(CountingCapture::new((4, 4), Duration::from_millis(1)), mailbox, None).unwrap();

    assert!(acquisition.stop().is_some());
    assert!(acquisition.stop().is_none());
    assert!(acquisition.stop().is_none());
}

#[test]
fn test_drop_stops_and_releases() {
    let capture = CountingCapture::new((4, 4), Duration::from_millis(1));
    let released = capture.released.clone();
    let reads = capture.reads.clone();
    let mailbox = Arc::new(FrameMailbox::new());

    let acquisition = AcquisitionLoop::start(capture, mailbox, None).unwrap();
    assert!(wait_until(TIMEOUT, || reads.load(Ordering::SeqCst) > 0));
    drop(acquisition);

    assert!(released.load(Ordering::SeqCst));
    let after = reads.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(reads.load(Ordering::SeqCst), after);
}

#[test]
fn test_read_failure_ends_the_loop() {
    let capture = CountingCapture::new((4, 4), Duration::from_millis(1)).failing_after(2);
    let mailbox = Arc::new(FrameMailbox::new());

    let mut acquisition = AcquisitionLoop::start(capture, mailbox.clone(), None).unwrap();
    assert!(wait_until(TIMEOUT, || !acquisition.is_running()));

    assert!(matches!(acquisition.failure(), Some(VisionError::AcquisitionReadFailure { .. })));
    assert_eq!(mailbox.published(), 2);
    // the last good frame stays readable
    assert_eq!(mailbox.latest().unwrap().sequence, 2);
    assert!(acquisition.stop().is_some());
}

#[test]
fn test_live_feed_resizes_and_serves_latest() {
    let capture = CountingCapture::new((64, 48), Duration::from_millis(1));
    let feed = LiveFeed::start(Box::new(capture), Some((32, 24))).unwrap();

    assert!(wait_until(TIMEOUT, || feed.published() >= 2));
    let frame = feed.current().unwrap();
    assert_eq!(frame.dimensions(), (32, 24));

    let source = FrameSource::Live(feed);
    assert_eq!(source.mode(), InspectionMode::Live);
    assert!(source.current().is_some());

    let FrameSource::Live(feed) = source else {
        unreachable!();
    };
    feed.close();
}

#[test]
fn test_live_feed_reports_failure_and_releases() {
    let capture = CountingCapture::new((4, 4), Duration::from_millis(1)).failing_after(1);
    let released = capture.released.clone();
    let mut feed = LiveFeed::start(Box::new(capture), None).unwrap();

    assert!(wait_until(TIMEOUT, || feed.poll_status().is_err()));
    assert!(released.load(Ordering::SeqCst));
    assert!(!feed.is_running());
    assert!(matches!(feed.poll_status(), Err(VisionError::AcquisitionReadFailure { .. })));
}

#[test]
fn test_current_is_none_before_first_frame() {
    let capture = CountingCapture::new((4, 4), Duration::from_millis(200));
    let feed = LiveFeed::start(Box::new(capture), None).unwrap();
    assert!(feed.current().is_none());
    feed.close();
}

#[test]
fn test_next_after_returns_newer_frame() {
    let capture = CountingCapture::new((4, 4), Duration::from_millis(1));
    let mut feed = LiveFeed::start(Box::new(capture), None).unwrap();

    let first = feed.next_after(0, Duration::from_millis(2), 2_000).unwrap().unwrap();
    let second = feed.next_after(first.sequence, Duration::from_millis(2), 2_000).unwrap().unwrap();
    assert!(second.sequence > first.sequence);
    feed.close();
}

#[test]
fn test_next_after_gives_up_on_stalled_capture() {
    // Reads block far longer than the polling budget
    let capture = CountingCapture::new((4, 4), Duration::from_millis(300));
    let mut feed = LiveFeed::start(Box::new(capture), None).unwrap();

    let started = std::time::Instant::now();
    let next = feed.next_after(0, Duration::from_millis(5), 5).unwrap();
    assert!(next.is_none());
    assert!(started.elapsed() < Duration::from_millis(250));
    feed.close();
}

#[test]
fn test_next_after_surfaces_read_failure() {
    let capture = CountingCapture::new((4, 4), Duration::from_millis(1)).failing_after(0);
    let released = capture.released.clone();
    let mut feed = LiveFeed::start(Box::new(capture), None).unwrap();

    let result = feed.next_after(0, Duration::from_millis(5), 1_000);
    assert!(matches!(result, Err(VisionError::AcquisitionReadFailure { .. })));
    assert!(released.load(Ordering::SeqCst));
}
