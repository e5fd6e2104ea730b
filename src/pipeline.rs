/*
 * @file pipeline.rs
 * @brief Threaded capture and detection pipeline
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Capture pipeline: one producer thread reading frames, one consumer
//! running pose estimation and gesture detection.
//!
//! The queue between them holds at most two frames and drops the oldest
//! when full, so the consumer always works on recent images instead of
//! falling behind a backlog.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use tracing::{debug, error, info, warn};

use crate::detector::GestureDetector;
use crate::error::{EstimatorError, SourceError};
use crate::landmarks::{FrameSample, HandObservation};

/// Frames buffered between capture and processing.
pub const FRAME_QUEUE_CAPACITY: usize = 2;

/// Pause after a failed frame read before trying again.
pub const READ_BACKOFF: Duration = Duration::from_millis(10);

/// How long the consumer waits for a frame before re-checking its exit conditions.
pub const FRAME_WAIT: Duration = Duration::from_millis(20);

/// A frame as delivered by a [`VideoSource`].
#[derive(Clone, Debug)]
pub struct CapturedFrame<I> {
    pub image: I,
    pub timestamp: Instant,
    pub width: u32,
    pub height: u32,
}

/// Anything that yields frames: a network camera, a file, a device.
pub trait VideoSource: Send {
    type Image: Send + 'static;

    /// Human-readable name for logs.
    fn describe(&self) -> String;

    /// Prepares the source. A failure here is fatal for the session.
    fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Reads the next frame; `Ok(None)` marks end of stream.
    fn read_frame(&mut self) -> Result<Option<CapturedFrame<Self::Image>>, SourceError>;
}

/// Finds hands in a frame.
pub trait HandPoseEstimator<I> {
    fn estimate(&mut self, image: &I) -> Result<Vec<HandObservation>, EstimatorError>;
}

/// Bounded queue with latest-frame-wins overflow.
///
/// Both ends are held by every clone, so the producer can evict the oldest
/// entry itself when the queue is full.
pub struct LatestFrameQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Clone for LatestFrameQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> LatestFrameQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Enqueues `item`, dropping the oldest queued items to make room.
    ///
    /// # Returns
    /// Number of items dropped.
    pub fn push(&self, mut item: T) -> usize {
        let mut dropped = 0;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(rejected)) => {
                    item = rejected;
                    if self.rx.try_recv().is_ok() {
                        dropped += 1;
                    }
                }
                Err(TrySendError::Disconnected(_)) => return dropped,
            }
        }
    }

    /// Waits up to `timeout` for the next item.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Cooperative stop flag shared between the session and both pipeline threads.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runtime commands accepted while the pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Quit,
    Reset,
    MoreSensitive,
    LessSensitive,
    ToggleGunSensitivity,
}

impl Control {
    /// Parses one line of keyboard input (`q`, `r`, `+`/`=`, `-`, `g`).
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "q" | "Q" | "quit" | "exit" => Some(Self::Quit),
            "r" | "R" => Some(Self::Reset),
            "+" | "=" => Some(Self::MoreSensitive),
            "-" => Some(Self::LessSensitive),
            "g" | "G" => Some(Self::ToggleGunSensitivity),
            _ => None,
        }
    }

    /// Applies the command to the detector. Returns `false` for [`Control::Quit`].
    pub fn apply(self, detector: &mut GestureDetector) -> bool {
        match self {
            Self::Quit => return false,
            Self::Reset => detector.reset_counters(),
            Self::MoreSensitive => {
                detector.increase_wave_sensitivity();
            }
            Self::LessSensitive => {
                detector.decrease_wave_sensitivity();
            }
            Self::ToggleGunSensitivity => {
                detector.toggle_gun_sensitivity();
            }
        }
        true
    }
}

/// Frames-per-second estimate refreshed once per second.
#[derive(Clone, Debug)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    current: f32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
            current: 0.0,
        }
    }

    /// Counts one frame and returns the current estimate.
    pub fn tick(&mut self, now: Instant) -> f32 {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.current = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = now;
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }
}

/// Totals reported when the pipeline ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_dropped: u64,
    pub waves: u64,
    pub guns: u64,
    pub fps: f32,
}

/// Raises the capture-finished flag when dropped, including while a
/// panicking source unwinds the capture thread.
struct FinishedGuard(Arc<AtomicBool>);

impl Drop for FinishedGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Starts the capture thread.
///
/// # Details
/// Reads until the stop signal is raised, the stream ends, or the source
/// reports itself unavailable. Transient read failures back off for
/// [`READ_BACKOFF`] and retry.
///
/// # Arguments
/// * `source` - Frame producer, owned by the new thread.
/// * `queue` - Latest-frame-wins queue shared with the consumer.
/// * `stop` - Cooperative stop flag.
/// * `finished` - Raised when the thread exits, whether normally or by panic.
/// * `dropped` - Running count of frames evicted from the queue.
///
/// # Returns
/// * `JoinHandle<()>` - Handle of the capture thread.
fn spawn_capture<S>(
    mut source: S,
    queue: LatestFrameQueue<CapturedFrame<S::Image>>,
    stop: StopSignal,
    finished: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) -> JoinHandle<()>
where
    S: VideoSource + 'static,
{
    thread::spawn(move || {
        let _finished = FinishedGuard(finished);
        while !stop.is_stopped() {
            match source.read_frame() {
                Ok(Some(frame)) => {
                    let evicted = queue.push(frame);
                    if evicted > 0 {
                        dropped.fetch_add(evicted as u64, Ordering::Relaxed);
                    }
                }
                Ok(None) => {
                    info!(source = %source.describe(), "end of stream");
                    break;
                }
                Err(SourceError::Read(reason)) => {
                    debug!(%reason, "frame read failed, retrying");
                    thread::sleep(READ_BACKOFF);
                }
                Err(err @ SourceError::Unavailable(_)) => {
                    error!(%err, "capture stopped");
                    break;
                }
            }
        }
    })
}

/// Runs the capture pipeline until quit, stop, or end of stream.
///
/// # Details
/// Opens the source, starts the capture thread, then processes frames on the
/// calling thread: estimate hands, feed the detector, apply any pending
/// controls. Estimator failures count as frames with no hands.
///
/// # Arguments
/// * `source` - Frame producer; moved onto the capture thread.
/// * `estimator` - Hand pose estimator for the source's images.
/// * `detector` - Gesture detector that receives every processed frame.
/// * `controls` - Runtime commands; a disconnected channel is ignored.
/// * `stop` - Cooperative stop flag, also raised here on exit.
///
/// # Errors
/// Returns [`SourceError::Unavailable`] when the source cannot be opened.
pub fn run_pipeline<S, E>(
    mut source: S,
    mut estimator: E,
    detector: &mut GestureDetector,
    controls: &Receiver<Control>,
    stop: &StopSignal,
) -> Result<SessionStats, SourceError>
where
    S: VideoSource + 'static,
    E: HandPoseEstimator<S::Image>,
{
    source.open()?;
    info!(source = %source.describe(), "gesture detection started");

    let queue = LatestFrameQueue::new(FRAME_QUEUE_CAPACITY);
    let finished = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicU64::new(0));
    let capture = spawn_capture(
        source,
        queue.clone(),
        stop.clone(),
        finished.clone(),
        dropped.clone(),
    );

    let mut fps = FpsCounter::new(Instant::now());
    let mut frames_processed = 0u64;

    'consume: while !stop.is_stopped() {
        while let Ok(control) = controls.try_recv() {
            if !control.apply(detector) {
                info!("quit requested");
                break 'consume;
            }
        }

        let Some(frame) = queue.pop_timeout(FRAME_WAIT) else {
            if finished.load(Ordering::SeqCst) && queue.is_empty() {
                break;
            }
            continue;
        };

        frames_processed += 1;
        fps.tick(Instant::now());
        let hands = estimator.estimate(&frame.image).unwrap_or_else(|err| {
            warn!(%err, "treating frame as empty");
            Vec::new()
        });
        let sample = FrameSample::new(frame.timestamp, frame.width, frame.height, hands);
        let report = detector.process(&sample);
        debug!(
            hands = report.hand_count,
            gun = ?report.gun_confidences,
            "frame processed"
        );
    }

    stop.stop();
    if capture.join().is_err() {
        warn!("capture thread panicked");
    }

    let stats = SessionStats {
        frames_processed,
        frames_dropped: dropped.load(Ordering::Relaxed),
        waves: detector.wave_count(),
        guns: detector.gun_count(),
        fps: fps.current(),
    };
    info!(
        frames = stats.frames_processed,
        dropped = stats.frames_dropped,
        waves = stats.waves,
        guns = stats.guns,
        fps = stats.fps,
        "session statistics"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_keeps_newest_frames() {
        let queue = LatestFrameQueue::new(FRAME_QUEUE_CAPACITY);
        assert_eq!(queue.push(1), 0);
        assert_eq!(queue.push(2), 0);
        assert_eq!(queue.push(3), 1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn pop_times_out_on_empty_queue() {
        let queue: LatestFrameQueue<u8> = LatestFrameQueue::new(2);
        let started = Instant::now();
        assert_eq!(queue.pop_timeout(Duration::from_millis(5)), None);
        assert!(started.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn controls_parse_keyboard_input() {
        assert_eq!(Control::parse("q"), Some(Control::Quit));
        assert_eq!(Control::parse(" r \n"), Some(Control::Reset));
        assert_eq!(Control::parse("="), Some(Control::MoreSensitive));
        assert_eq!(Control::parse("+"), Some(Control::MoreSensitive));
        assert_eq!(Control::parse("-"), Some(Control::LessSensitive));
        assert_eq!(Control::parse("g"), Some(Control::ToggleGunSensitivity));
        assert_eq!(Control::parse("hello"), None);
    }

    #[test]
    fn controls_adjust_detector() {
        let mut detector = GestureDetector::default();
        assert!(Control::MoreSensitive.apply(&mut detector));
        assert_eq!(detector.config().wave_threshold, 25.0);
        assert!(Control::LessSensitive.apply(&mut detector));
        assert!(Control::LessSensitive.apply(&mut detector));
        assert_eq!(detector.config().wave_threshold, 35.0);
        assert!(!Control::Quit.apply(&mut detector));
    }

    #[test]
    fn fps_updates_once_per_second() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        for i in 1..30u32 {
            assert_eq!(fps.tick(start + Duration::from_millis(33) * i), 0.0);
        }
        let rate = fps.tick(start + Duration::from_secs(1));
        assert!((rate - 30.0).abs() < 0.01);
    }

    #[test]
    fn stop_signal_is_shared() {
        let stop = StopSignal::new();
        let other = stop.clone();
        other.stop();
        assert!(stop.is_stopped());
    }
}
