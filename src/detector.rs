/*
 * @file detector.rs
 * @brief Debounced gesture event detector
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

//! Debounced gesture event detector.
//!
//! Turns noisy per-frame classifier output into discrete, rate-limited
//! wave and gun events. Each detector owns its own history buffers, so one
//! instance serves exactly one camera feed.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{analyze_wave, gun_confidence, hand_center, WaveAnalysis};
use crate::history::BoundedHistory;
use crate::landmarks::{FrameSample, PixelPoint};

/// Capacity of the wave position window.
pub const POSITION_HISTORY_CAPACITY: usize = 15;

/// Capacity of the gun pose window.
pub const GUN_HISTORY_CAPACITY: usize = 10;

/// Refractory period after a confirmed wave; also how long the wave flag stays up.
pub const WAVE_COOLDOWN: Duration = Duration::from_millis(1_000);

/// Refractory period after a confirmed gun pose; also how long the gun flag stays up.
pub const GUN_COOLDOWN: Duration = Duration::from_millis(1_500);

/// Allowed wave threshold values, in pixels.
pub const WAVE_THRESHOLD_RANGE: RangeInclusive<f32> = 10.0..=100.0;

/// Step applied by the sensitivity controls.
pub const WAVE_THRESHOLD_STEP: f32 = 5.0;

/// Gun confidence threshold used in lenient mode.
pub const GUN_THRESHOLD_LENIENT: f32 = 0.6;

/// Gun confidence threshold used in strict mode.
pub const GUN_THRESHOLD_STRICT: f32 = 0.9;

/// Tunable detector parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum horizontal hand travel, in pixels, for a wave.
    pub wave_threshold: f32,
    /// Number of recent centers a wave verdict looks at.
    pub wave_frames_required: usize,
    /// Per-frame gun pose confidence that counts as a hit.
    pub gun_confidence_threshold: f32,
    /// Number of recent frames a gun verdict looks at.
    pub gun_hold_frames: usize,
    /// Share of those frames that must be hits.
    pub gun_hold_ratio: f32,
    /// Width frames are scaled down to before pixel measurements; 0 disables.
    pub target_width: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            wave_threshold: 30.0,
            wave_frames_required: 8,
            gun_confidence_threshold: 0.8,
            gun_hold_frames: 5,
            gun_hold_ratio: 0.8,
            target_width: 640,
        }
    }
}

/// The gestures the detector reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    Wave,
    Gun,
}

impl GestureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::Gun => "gun",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmed gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    /// Running total for this gesture kind, including this event.
    pub count: u64,
    pub timestamp: Instant,
    /// Estimator slot of the waving hand; `None` for gun events, which
    /// aggregate every hand in the frame.
    pub hand_index: Option<usize>,
}

/// Observer for confirmed gestures.
///
/// Listeners run synchronously on the detector's thread, so implementations
/// should hand work off (for example over a channel) rather than block.
pub trait GestureListener: Send {
    fn on_wave(&mut self, _event: &GestureEvent) {}
    fn on_gun(&mut self, _event: &GestureEvent) {}
}

/// Debounce state of one gesture kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownState {
    Idle,
    Cooldown,
}

/// Refractory timer: after firing, refuses to fire again until `period` has elapsed.
#[derive(Clone, Debug)]
struct Cooldown {
    period: Duration,
    last_fired: Option<Instant>,
}

impl Cooldown {
    fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    fn state(&self, now: Instant) -> CooldownState {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.period => {
                CooldownState::Cooldown
            }
            _ => CooldownState::Idle,
        }
    }

    /// Fires when idle and enters cooldown. Returns whether it fired.
    fn try_fire(&mut self, now: Instant) -> bool {
        if self.state(now) == CooldownState::Cooldown {
            return false;
        }
        self.last_fired = Some(now);
        true
    }
}

/// Transient UI flag that reads as active for `hold` after being raised.
#[derive(Clone, Debug)]
struct ActiveFlag {
    hold: Duration,
    raised_at: Option<Instant>,
}

impl ActiveFlag {
    fn new(hold: Duration) -> Self {
        Self {
            hold,
            raised_at: None,
        }
    }

    fn raise(&mut self, now: Instant) {
        self.raised_at = Some(now);
    }

    fn is_active(&self, now: Instant) -> bool {
        self.raised_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.hold)
    }

    fn expire(&mut self, now: Instant) {
        if !self.is_active(now) {
            self.raised_at = None;
        }
    }
}

/// Hand centers seen in one frame, keyed by estimator hand index.
///
/// Hands with malformed landmarks have no entry, so a gap in one hand's
/// track never shifts another hand's samples.
#[derive(Clone, Debug)]
struct PositionSample {
    centers: Vec<(usize, PixelPoint)>,
    timestamp: Instant,
}

impl PositionSample {
    fn center_of(&self, hand_index: usize) -> Option<PixelPoint> {
        self.centers
            .iter()
            .find(|(index, _)| *index == hand_index)
            .map(|&(_, center)| center)
    }
}

/// Per-frame output of [`GestureDetector::process`], for overlays and logs.
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    pub hand_count: usize,
    /// Center of each hand in frame order; `None` for malformed landmarks.
    pub centers: Vec<Option<PixelPoint>>,
    pub gun_confidences: Vec<f32>,
    /// Wave analysis of each hand in frame order; `None` while that hand's
    /// window is still filling or its landmarks are malformed.
    pub wave_analyses: Vec<Option<WaveAnalysis>>,
    pub events: Vec<GestureEvent>,
}

/// Point-in-time view of the detector for pollers.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSnapshot {
    pub wave_count: u64,
    pub gun_count: u64,
    pub wave_threshold: f32,
    pub gun_confidence_threshold: f32,
    pub wave_active: bool,
    pub gun_active: bool,
    pub last_gesture: Option<GestureKind>,
}

impl DetectorSnapshot {
    /// Overlay status line: the active gesture, or "Monitoring...".
    pub fn status(&self) -> &'static str {
        if self.wave_active {
            "WAVING!"
        } else if self.gun_active {
            "GUN!"
        } else {
            "Monitoring..."
        }
    }
}

/// Wave and gun gesture detector with debouncing.
///
/// # Details
/// Feed one [`FrameSample`] per processed frame through [`process`]. The
/// detector keeps a 15-entry window of hand centers for wave detection and a
/// 10-entry window of gun pose hits, applies a refractory period per gesture
/// kind, and notifies registered [`GestureListener`]s on every confirmation.
///
/// [`process`]: GestureDetector::process
pub struct GestureDetector {
    config: DetectorConfig,
    positions: BoundedHistory<PositionSample>,
    gun_hits: BoundedHistory<bool>,
    wave_count: u64,
    gun_count: u64,
    wave_cooldown: Cooldown,
    gun_cooldown: Cooldown,
    wave_flag: ActiveFlag,
    gun_flag: ActiveFlag,
    last_gesture: Option<GestureKind>,
    listeners: Vec<Box<dyn GestureListener>>,
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl GestureDetector {
    /// Creates a detector with empty histories and zeroed counters.
    ///
    /// # Arguments
    /// * `config` - Initial thresholds; the wave threshold is clamped to
    ///   [`WAVE_THRESHOLD_RANGE`].
    pub fn new(mut config: DetectorConfig) -> Self {
        config.wave_threshold = clamp_wave_threshold(config.wave_threshold);
        config.wave_frames_required = config.wave_frames_required.max(1);
        config.gun_hold_frames = config.gun_hold_frames.clamp(1, GUN_HISTORY_CAPACITY);
        Self {
            config,
            positions: BoundedHistory::new(POSITION_HISTORY_CAPACITY),
            gun_hits: BoundedHistory::new(GUN_HISTORY_CAPACITY),
            wave_count: 0,
            gun_count: 0,
            wave_cooldown: Cooldown::new(WAVE_COOLDOWN),
            gun_cooldown: Cooldown::new(GUN_COOLDOWN),
            wave_flag: ActiveFlag::new(WAVE_COOLDOWN),
            gun_flag: ActiveFlag::new(GUN_COOLDOWN),
            last_gesture: None,
            listeners: Vec::new(),
        }
    }

    /// Registers an observer for confirmed gestures.
    pub fn add_listener(&mut self, listener: Box<dyn GestureListener>) {
        self.listeners.push(listener);
    }

    /// Runs both classifiers and the debounce logic over one frame.
    ///
    /// # Details
    /// Hands whose landmarks are malformed are skipped for wave tracking and
    /// score zero for the gun pose; nothing here fails the frame. At most one
    /// event of each kind is produced per frame.
    ///
    /// # Arguments
    /// * `frame` - Landmarks and timing for the frame.
    ///
    /// # Returns
    /// Per-hand measurements plus any events confirmed on this frame.
    pub fn process(&mut self, frame: &FrameSample) -> FrameReport {
        let now = frame.timestamp;
        self.wave_flag.expire(now);
        self.gun_flag.expire(now);

        let (width, height) = frame.scaled_dimensions(self.config.target_width);
        let mut report = FrameReport {
            hand_count: frame.hands.len(),
            ..FrameReport::default()
        };

        for hand in &frame.hands {
            let center = match hand_center(hand, width, height) {
                Ok(center) => Some(center),
                Err(err) => {
                    warn!(hand = hand.index(), %err, "hand skipped for wave tracking");
                    None
                }
            };
            report.centers.push(center);
            report.gun_confidences.push(gun_confidence(hand));
        }

        if let Some(event) =
            self.analyze_wave_motion(frame, &report.centers, &mut report.wave_analyses)
        {
            report.events.push(event);
        }
        if let Some(event) = self.analyze_gun_pose(&report.gun_confidences, now) {
            report.events.push(event);
        }

        for event in &report.events {
            self.notify(event);
        }
        report
    }

    /// Updates the position window and checks every hand for a wave.
    ///
    /// # Details
    /// A frame with no hands clears the window, since the motion it held can
    /// no longer continue. Otherwise the frame's valid centers are recorded
    /// under their estimator hand index and each hand's recent track is
    /// tested. The first waving hand fires if the wave cooldown allows it.
    ///
    /// # Arguments
    /// * `frame` - The frame being processed, for its hands and timestamp.
    /// * `centers` - Center of each hand in frame order, `None` if malformed.
    /// * `analyses` - Receives one wave analysis per hand in frame order.
    ///
    /// # Returns
    /// * `Some(GestureEvent)` - A wave was confirmed on this frame.
    /// * `None` - No hand is waving, or the cooldown is still running.
    fn analyze_wave_motion(
        &mut self,
        frame: &FrameSample,
        centers: &[Option<PixelPoint>],
        analyses: &mut Vec<Option<WaveAnalysis>>,
    ) -> Option<GestureEvent> {
        let now = frame.timestamp;
        if frame.hands.is_empty() {
            if !self.positions.is_empty() {
                debug!("no hands in frame, clearing wave window");
                self.positions.clear();
            }
            return None;
        }

        let tracked = frame
            .hands
            .iter()
            .zip(centers)
            .filter_map(|(hand, center)| center.map(|center| (hand.index(), center)))
            .collect();
        self.positions.push(PositionSample {
            centers: tracked,
            timestamp: now,
        });

        let mut fired = None;
        for (hand, center) in frame.hands.iter().zip(centers) {
            let analysis = center
                .and_then(|_| self.wave_window(hand.index()))
                .map(|window| analyze_wave(&window, self.config.wave_threshold));
            analyses.push(analysis);
            let waving = analysis.is_some_and(|a| a.is_wave);
            if fired.is_none() && waving && self.wave_cooldown.try_fire(now) {
                fired = Some(hand.index());
            }
        }

        let hand_index = fired?;
        self.wave_count += 1;
        self.wave_flag.raise(now);
        self.last_gesture = Some(GestureKind::Wave);
        info!(
            count = self.wave_count,
            hand = hand_index,
            window_ms = self.window_span().as_millis() as u64,
            "wave detected"
        );
        Some(GestureEvent {
            kind: GestureKind::Wave,
            count: self.wave_count,
            timestamp: now,
            hand_index: Some(hand_index),
        })
    }

    /// Recent track of one hand.
    ///
    /// # Details
    /// Collects the hand's centers from the position window, oldest first,
    /// skipping frames where that hand was absent or malformed.
    ///
    /// # Arguments
    /// * `hand_index` - Estimator index of the hand.
    ///
    /// # Returns
    /// * `Some(Vec<PixelPoint>)` - The last `wave_frames_required` centers.
    /// * `None` - Fewer samples than that have been seen.
    fn wave_window(&self, hand_index: usize) -> Option<Vec<PixelPoint>> {
        let required = self.config.wave_frames_required;
        let track: Vec<PixelPoint> = self
            .positions
            .iter()
            .filter_map(|sample| sample.center_of(hand_index))
            .collect();
        if track.len() < required {
            return None;
        }
        Some(track[track.len() - required..].to_vec())
    }

    /// Time covered by the position window, oldest to newest sample.
    fn window_span(&self) -> Duration {
        match (self.positions.iter().next(), self.positions.iter().next_back()) {
            (Some(oldest), Some(newest)) => {
                newest.timestamp.saturating_duration_since(oldest.timestamp)
            }
            _ => Duration::ZERO,
        }
    }

    /// Records this frame's gun hit and checks the hold window.
    ///
    /// # Details
    /// The frame counts as a hit when its best hand reaches the gun
    /// confidence threshold; a frame with no hands is a miss. Once the window
    /// holds `gun_hold_frames` entries, the gun fires when at least
    /// `gun_hold_ratio` of them are hits and the gun cooldown allows it.
    ///
    /// # Arguments
    /// * `confidences` - Gun pose confidence of each hand in the frame.
    /// * `now` - Frame timestamp.
    ///
    /// # Returns
    /// * `Some(GestureEvent)` - A sustained gun pose was confirmed.
    /// * `None` - The pose is not held long enough, or the cooldown is running.
    fn analyze_gun_pose(&mut self, confidences: &[f32], now: Instant) -> Option<GestureEvent> {
        let best = confidences.iter().copied().fold(0.0_f32, f32::max);
        self.gun_hits
            .push(best >= self.config.gun_confidence_threshold);

        let hold = self.config.gun_hold_frames;
        if self.gun_hits.len() < hold {
            return None;
        }
        let hits = self.gun_hits.recent(hold).filter(|&&hit| hit).count();
        let sustained = hits as f32 >= hold as f32 * self.config.gun_hold_ratio;
        if !sustained || !self.gun_cooldown.try_fire(now) {
            return None;
        }

        self.gun_count += 1;
        self.gun_flag.raise(now);
        self.last_gesture = Some(GestureKind::Gun);
        info!(count = self.gun_count, "gun gesture detected");
        Some(GestureEvent {
            kind: GestureKind::Gun,
            count: self.gun_count,
            timestamp: now,
            hand_index: None,
        })
    }

    /// Delivers an event to every registered listener, in registration order.
    ///
    /// # Arguments
    /// * `event` - The confirmed gesture.
    fn notify(&mut self, event: &GestureEvent) {
        for listener in &mut self.listeners {
            match event.kind {
                GestureKind::Wave => listener.on_wave(event),
                GestureKind::Gun => listener.on_gun(event),
            }
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn wave_count(&self) -> u64 {
        self.wave_count
    }

    pub fn gun_count(&self) -> u64 {
        self.gun_count
    }

    pub fn last_gesture(&self) -> Option<GestureKind> {
        self.last_gesture
    }

    /// Whether a wave was confirmed within the last [`WAVE_COOLDOWN`].
    pub fn is_wave_active(&self, now: Instant) -> bool {
        self.wave_flag.is_active(now)
    }

    /// Whether a gun pose was confirmed within the last [`GUN_COOLDOWN`].
    pub fn is_gun_active(&self, now: Instant) -> bool {
        self.gun_flag.is_active(now)
    }

    /// Debounce state of one gesture kind at `now`.
    pub fn cooldown_state(&self, kind: GestureKind, now: Instant) -> CooldownState {
        match kind {
            GestureKind::Wave => self.wave_cooldown.state(now),
            GestureKind::Gun => self.gun_cooldown.state(now),
        }
    }

    pub fn snapshot(&self, now: Instant) -> DetectorSnapshot {
        DetectorSnapshot {
            wave_count: self.wave_count,
            gun_count: self.gun_count,
            wave_threshold: self.config.wave_threshold,
            gun_confidence_threshold: self.config.gun_confidence_threshold,
            wave_active: self.is_wave_active(now),
            gun_active: self.is_gun_active(now),
            last_gesture: self.last_gesture,
        }
    }

    /// Sets the wave threshold, clamped to [`WAVE_THRESHOLD_RANGE`].
    pub fn set_wave_threshold(&mut self, threshold: f32) -> f32 {
        self.config.wave_threshold = clamp_wave_threshold(threshold);
        self.config.wave_threshold
    }

    /// Lowers the wave threshold by one step so smaller waves count.
    pub fn increase_wave_sensitivity(&mut self) -> f32 {
        let threshold = self.set_wave_threshold(self.config.wave_threshold - WAVE_THRESHOLD_STEP);
        info!(threshold, "wave sensitivity increased");
        threshold
    }

    /// Raises the wave threshold by one step.
    pub fn decrease_wave_sensitivity(&mut self) -> f32 {
        let threshold = self.set_wave_threshold(self.config.wave_threshold + WAVE_THRESHOLD_STEP);
        info!(threshold, "wave sensitivity decreased");
        threshold
    }

    /// Flips the gun threshold between lenient and strict.
    pub fn toggle_gun_sensitivity(&mut self) -> f32 {
        self.config.gun_confidence_threshold =
            if self.config.gun_confidence_threshold < GUN_THRESHOLD_STRICT {
                GUN_THRESHOLD_STRICT
            } else {
                GUN_THRESHOLD_LENIENT
            };
        info!(
            threshold = self.config.gun_confidence_threshold,
            "gun sensitivity changed"
        );
        self.config.gun_confidence_threshold
    }

    /// Zeroes both counters and empties both windows.
    ///
    /// Cooldown timers keep running, so a gesture confirmed just before the
    /// reset still blocks an immediate repeat.
    pub fn reset_counters(&mut self) {
        self.wave_count = 0;
        self.gun_count = 0;
        self.positions.clear();
        self.gun_hits.clear();
        info!("gesture counters reset");
    }
}

/// Keeps a wave threshold inside [`WAVE_THRESHOLD_RANGE`].
fn clamp_wave_threshold(threshold: f32) -> f32 {
    threshold.clamp(*WAVE_THRESHOLD_RANGE.start(), *WAVE_THRESHOLD_RANGE.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::gun_hand;
    use crate::landmarks::{HandObservation, LANDMARK_COUNT};
    use std::sync::{Arc, Mutex};

    const FRAME_INTERVAL: Duration = Duration::from_millis(33);
    const WIDTH: u32 = 200;
    const HEIGHT: u32 = 100;

    /// Hand whose every landmark sits on the given pixel, so its center is that pixel.
    fn hand_at(x: f32, y: f32) -> HandObservation {
        HandObservation::from_points(
            0,
            &vec![(x / WIDTH as f32, y / HEIGHT as f32); LANDMARK_COUNT],
        )
    }

    fn frame(at: Instant, hands: Vec<HandObservation>) -> FrameSample {
        FrameSample::new(at, WIDTH, HEIGHT, hands)
    }

    fn wave_xs(count: usize) -> impl Iterator<Item = f32> {
        (0..count).map(|i| if i % 2 == 0 { 100.0 } else { 140.0 })
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<GestureEvent>>>);

    impl GestureListener for Recorder {
        fn on_wave(&mut self, event: &GestureEvent) {
            self.0.lock().unwrap().push(event.clone());
        }

        fn on_gun(&mut self, event: &GestureEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn short_window_never_waves() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        for (i, x) in wave_xs(7).enumerate() {
            let report = detector.process(&frame(start + FRAME_INTERVAL * i as u32, vec![hand_at(x, 50.0)]));
            assert!(report.events.is_empty());
            assert_eq!(report.wave_analyses, vec![None]);
        }
        assert_eq!(detector.wave_count(), 0);
    }

    #[test]
    fn eight_frame_oscillation_fires_exactly_one_wave() {
        let mut detector = GestureDetector::default();
        let recorder = Recorder::default();
        detector.add_listener(Box::new(recorder.clone()));
        let start = Instant::now();
        for (i, x) in wave_xs(8).enumerate() {
            detector.process(&frame(start + FRAME_INTERVAL * i as u32, vec![hand_at(x, 50.0)]));
        }
        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GestureKind::Wave);
        assert_eq!(events[0].count, 1);
        assert_eq!(events[0].hand_index, Some(0));
        assert_eq!(detector.wave_count(), 1);
        assert_eq!(detector.gun_count(), 0);
        assert_eq!(detector.last_gesture(), Some(GestureKind::Wave));
    }

    #[test]
    fn waves_respect_cooldown() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        let mut stamps = Vec::new();
        for (i, x) in wave_xs(60).enumerate() {
            let report = detector.process(&frame(start + FRAME_INTERVAL * i as u32, vec![hand_at(x, 50.0)]));
            stamps.extend(report.events.iter().map(|e| e.timestamp));
        }
        assert_eq!(stamps.len(), 2);
        assert_eq!(detector.wave_count(), 2);
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= WAVE_COOLDOWN);
        }
    }

    #[test]
    fn empty_frame_resets_window_but_not_detection() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        let mut at = start;
        for x in wave_xs(5) {
            detector.process(&frame(at, vec![hand_at(x, 50.0)]));
            at += FRAME_INTERVAL;
        }
        detector.process(&frame(at, Vec::new()));
        at += FRAME_INTERVAL;
        // Had the gap not cleared the window, the old samples would complete it early.
        for (i, x) in wave_xs(8).enumerate() {
            let report = detector.process(&frame(at, vec![hand_at(x, 50.0)]));
            at += FRAME_INTERVAL;
            if i < 7 {
                assert!(report.events.is_empty(), "fired early at sample {i}");
            }
        }
        assert_eq!(detector.wave_count(), 1);
    }

    #[test]
    fn gun_pose_fires_after_hold_and_respects_cooldown() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        let mut stamps = Vec::new();
        for i in 0..60u32 {
            let hand = HandObservation::from_points(0, &gun_hand());
            let report = detector.process(&frame(start + FRAME_INTERVAL * i, vec![hand]));
            if i < 4 {
                assert!(report.events.is_empty());
            }
            stamps.extend(report.events.iter().map(|e| e.timestamp));
        }
        assert_eq!(stamps.len(), 2);
        assert_eq!(stamps[0], start + FRAME_INTERVAL * 4);
        assert!(stamps[1].duration_since(stamps[0]) >= GUN_COOLDOWN);
        assert_eq!(detector.gun_count(), 2);
        assert_eq!(detector.last_gesture(), Some(GestureKind::Gun));
    }

    #[test]
    fn gun_needs_eighty_percent_of_hold_window() {
        let start = Instant::now();
        let run = |pattern: &[bool]| {
            let mut detector = GestureDetector::default();
            for (i, &pose) in pattern.iter().enumerate() {
                let hands = if pose {
                    vec![HandObservation::from_points(0, &gun_hand())]
                } else {
                    Vec::new()
                };
                detector.process(&frame(start + FRAME_INTERVAL * i as u32, hands));
            }
            detector.gun_count()
        };
        assert_eq!(run(&[true, true, false, true, true]), 1);
        assert_eq!(run(&[true, false, true, false, true]), 0);
    }

    #[test]
    fn active_flags_expire() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        let mut last = start;
        for (i, x) in wave_xs(8).enumerate() {
            last = start + FRAME_INTERVAL * i as u32;
            detector.process(&frame(last, vec![hand_at(x, 50.0)]));
        }
        assert!(detector.is_wave_active(last));
        assert_eq!(detector.snapshot(last).status(), "WAVING!");
        assert_eq!(
            detector.cooldown_state(GestureKind::Wave, last),
            CooldownState::Cooldown
        );
        let later = last + WAVE_COOLDOWN;
        assert!(!detector.is_wave_active(later));
        assert_eq!(detector.cooldown_state(GestureKind::Wave, later), CooldownState::Idle);
        assert_eq!(detector.snapshot(later).status(), "Monitoring...");
    }

    #[test]
    fn malformed_hand_is_ignored() {
        let mut detector = GestureDetector::default();
        let broken = HandObservation::from_points(0, &[(0.5, 0.5); 4]);
        let report = detector.process(&frame(Instant::now(), vec![broken]));
        assert_eq!(report.hand_count, 1);
        assert_eq!(report.centers, vec![None]);
        assert_eq!(report.wave_analyses, vec![None]);
        assert_eq!(report.gun_confidences, vec![0.0]);
        assert!(report.events.is_empty());
    }

    #[test]
    fn sensitivity_controls_clamp() {
        let mut detector = GestureDetector::default();
        for _ in 0..30 {
            detector.increase_wave_sensitivity();
        }
        assert_eq!(detector.config().wave_threshold, 10.0);
        for _ in 0..30 {
            detector.decrease_wave_sensitivity();
        }
        assert_eq!(detector.config().wave_threshold, 100.0);
        assert_eq!(detector.toggle_gun_sensitivity(), GUN_THRESHOLD_STRICT);
        assert_eq!(detector.toggle_gun_sensitivity(), GUN_THRESHOLD_LENIENT);
        assert_eq!(detector.toggle_gun_sensitivity(), GUN_THRESHOLD_STRICT);
    }

    #[test]
    fn reset_zeroes_counters() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        for (i, x) in wave_xs(8).enumerate() {
            detector.process(&frame(start + FRAME_INTERVAL * i as u32, vec![hand_at(x, 50.0)]));
        }
        assert_eq!(detector.wave_count(), 1);
        detector.reset_counters();
        assert_eq!(detector.wave_count(), 0);
        assert_eq!(detector.gun_count(), 0);
    }

    #[test]
    fn second_hand_can_wave() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        for (i, x) in wave_xs(8).enumerate() {
            let still = hand_at(20.0, 20.0);
            let waving = HandObservation::new(1, hand_at(x, 50.0).landmarks().to_vec());
            detector.process(&frame(start + FRAME_INTERVAL * i as u32, vec![still, waving]));
        }
        assert_eq!(detector.wave_count(), 1);
    }

    #[test]
    fn malformed_hand_keeps_other_hand_index() {
        let mut detector = GestureDetector::default();
        let recorder = Recorder::default();
        detector.add_listener(Box::new(recorder.clone()));
        let start = Instant::now();
        for (i, x) in wave_xs(8).enumerate() {
            let broken = HandObservation::from_points(0, &[(0.5, 0.5); 4]);
            let waving = HandObservation::new(1, hand_at(x, 50.0).landmarks().to_vec());
            let report =
                detector.process(&frame(start + FRAME_INTERVAL * i as u32, vec![broken, waving]));
            assert_eq!(report.hand_count, 2);
            assert_eq!(report.centers.len(), 2);
            assert_eq!(report.wave_analyses.len(), 2);
            assert!(report.centers[0].is_none());
        }
        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].hand_index, Some(1));
    }

    #[test]
    fn malformed_only_frame_keeps_wave_window() {
        let mut detector = GestureDetector::default();
        let start = Instant::now();
        for (i, x) in wave_xs(9).enumerate() {
            let at = start + FRAME_INTERVAL * i as u32;
            if i == 5 {
                let broken = HandObservation::from_points(0, &[(0.5, 0.5); 4]);
                detector.process(&frame(at, vec![broken]));
            } else {
                detector.process(&frame(at, vec![hand_at(x, 50.0)]));
            }
        }
        assert_eq!(detector.wave_count(), 1);
    }
}
