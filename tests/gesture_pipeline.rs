use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gesture_companion::error::{EstimatorError, SourceError};
use gesture_companion::pipeline::{run_pipeline, CapturedFrame, Control, StopSignal};
use gesture_companion::replay::{RecordedLandmarks, ReplaySource};
use gesture_companion::{
    GestureDetector, GestureEvent, GestureListener, HandObservation, HandPoseEstimator, VideoSource,
};

/// Yields `remaining` blank frames, or frames forever when `None`.
struct BlankFrames {
    remaining: Option<usize>,
    pace: Duration,
}

impl VideoSource for BlankFrames {
    type Image = u32;

    fn describe(&self) -> String {
        "blank".into()
    }

    fn read_frame(&mut self) -> Result<Option<CapturedFrame<u32>>, SourceError> {
        match self.remaining.as_mut() {
            Some(0) => return Ok(None),
            Some(n) => *n -= 1,
            None => {}
        }
        thread::sleep(self.pace);
        Ok(Some(CapturedFrame {
            image: 0,
            timestamp: Instant::now(),
            width: 640,
            height: 480,
        }))
    }
}

struct NoHands;

impl HandPoseEstimator<u32> for NoHands {
    fn estimate(&mut self, _image: &u32) -> Result<Vec<HandObservation>, EstimatorError> {
        Ok(Vec::new())
    }
}

struct FailingEstimator;

impl HandPoseEstimator<u32> for FailingEstimator {
    fn estimate(&mut self, _image: &u32) -> Result<Vec<HandObservation>, EstimatorError> {
        Err(EstimatorError("model not loaded".into()))
    }
}

struct BrokenCamera;

impl VideoSource for BrokenCamera {
    type Image = u32;

    fn describe(&self) -> String {
        "broken".into()
    }

    fn open(&mut self) -> Result<(), SourceError> {
        Err(SourceError::Unavailable("no device".into()))
    }

    fn read_frame(&mut self) -> Result<Option<CapturedFrame<u32>>, SourceError> {
        Ok(None)
    }
}

/// Yields one frame, then panics on the next read.
struct PanickingCamera {
    served: bool,
}

impl VideoSource for PanickingCamera {
    type Image = u32;

    fn describe(&self) -> String {
        "panicking".into()
    }

    fn read_frame(&mut self) -> Result<Option<CapturedFrame<u32>>, SourceError> {
        if self.served {
            panic!("camera driver crashed");
        }
        self.served = true;
        Ok(Some(CapturedFrame {
            image: 0,
            timestamp: Instant::now(),
            width: 640,
            height: 480,
        }))
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<GestureEvent>>>);

impl GestureListener for Recorder {
    fn on_wave(&mut self, event: &GestureEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

/// Sixteen frames of a hand swinging 40 px left and right, 40 ms apart.
///
/// The spacing lets the consumer keep up with the two-slot queue, and the
/// whole recording fits inside one wave cooldown.
fn wave_recording() -> String {
    let mut text = String::new();
    for i in 0..16 {
        let x = if i % 2 == 0 { 0.5 } else { 0.7 };
        let hand = vec![[x, 0.5f32]; 21];
        let line = serde_json::json!({
            "t": i as f64 * 0.04,
            "width": 200,
            "height": 100,
            "hands": [hand],
        });
        text.push_str(&line.to_string());
        text.push('\n');
    }
    text
}

#[test]
fn pipeline_ends_with_stream() {
    let mut detector = GestureDetector::default();
    let (_tx, controls) = crossbeam_channel::unbounded();
    let source = BlankFrames {
        remaining: Some(5),
        pace: Duration::from_millis(1),
    };
    let stats = run_pipeline(source, NoHands, &mut detector, &controls, &StopSignal::new()).unwrap();
    assert!(stats.frames_processed >= 1);
    assert!(stats.frames_processed + stats.frames_dropped == 5);
    assert_eq!((stats.waves, stats.guns), (0, 0));
}

#[test]
fn quit_control_stops_endless_source() {
    let mut detector = GestureDetector::default();
    let (tx, controls) = crossbeam_channel::unbounded();
    tx.send(Control::Quit).unwrap();
    let source = BlankFrames {
        remaining: None,
        pace: Duration::from_millis(1),
    };
    let stop = StopSignal::new();
    run_pipeline(source, NoHands, &mut detector, &controls, &stop).unwrap();
    assert!(stop.is_stopped());
}

#[test]
fn stop_signal_halts_pipeline() {
    let stop = StopSignal::new();
    let remote = stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.stop();
    });
    let mut detector = GestureDetector::default();
    let (_tx, controls) = crossbeam_channel::unbounded();
    let source = BlankFrames {
        remaining: None,
        pace: Duration::from_millis(2),
    };
    let stats = run_pipeline(source, FailingEstimator, &mut detector, &controls, &stop).unwrap();
    stopper.join().unwrap();
    assert!(stats.frames_processed >= 1);
}

#[test]
fn unavailable_source_fails_fast() {
    let mut detector = GestureDetector::default();
    let (_tx, controls) = crossbeam_channel::unbounded();
    let result = run_pipeline(BrokenCamera, NoHands, &mut detector, &controls, &StopSignal::new());
    assert!(matches!(result, Err(SourceError::Unavailable(_))));
}

#[test]
fn panicking_source_does_not_hang_pipeline() {
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut detector = GestureDetector::default();
        let (_tx, controls) = crossbeam_channel::unbounded();
        let source = PanickingCamera { served: false };
        let result = run_pipeline(source, NoHands, &mut detector, &controls, &StopSignal::new());
        let _ = done_tx.send(result.map(|stats| stats.frames_processed));
    });
    let processed = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("pipeline did not return after the source panicked")
        .unwrap();
    assert!(processed <= 1);
}

#[test]
fn out_of_range_replay_timestamp_is_skipped() {
    let mut detector = GestureDetector::default();
    let (_tx, controls) = crossbeam_channel::unbounded();
    let recording = concat!(
        "{\"t\":1e20,\"width\":1,\"height\":1}\n",
        "{\"t\":0.0,\"width\":1,\"height\":1}\n"
    );
    let source = ReplaySource::from_reader("bad", Cursor::new(recording), false);
    let stats = run_pipeline(source, RecordedLandmarks, &mut detector, &controls, &StopSignal::new())
        .unwrap();
    assert_eq!(stats.frames_processed + stats.frames_dropped, 1);
}

#[test]
fn reset_control_clears_counters() {
    let mut detector = GestureDetector::default();
    let (tx, controls) = crossbeam_channel::unbounded();
    tx.send(Control::MoreSensitive).unwrap();
    tx.send(Control::Reset).unwrap();
    let source = BlankFrames {
        remaining: Some(1),
        pace: Duration::ZERO,
    };
    run_pipeline(source, NoHands, &mut detector, &controls, &StopSignal::new()).unwrap();
    assert_eq!(detector.config().wave_threshold, 25.0);
    assert_eq!(detector.wave_count(), 0);
}

#[test]
fn paced_replay_reports_one_wave() {
    let recorder = Recorder::default();
    let mut detector = GestureDetector::default();
    detector.add_listener(Box::new(recorder.clone()));
    let (_tx, controls) = crossbeam_channel::unbounded();
    let source = ReplaySource::from_reader("wave", Cursor::new(wave_recording()), true);
    let stats = run_pipeline(source, RecordedLandmarks, &mut detector, &controls, &StopSignal::new())
        .unwrap();
    let events = recorder.0.lock().unwrap();
    assert_eq!(stats.waves, 1);
    assert_eq!(stats.guns, 0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].count, 1);
    assert_eq!(events[0].hand_index, Some(0));
}
