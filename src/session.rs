/*
 * @file session.rs
 * @brief Implementation of the companion session runtime
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

//! Companion session: runs gesture detection and drives the face rig.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::Sender as ControlSender;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::detector::{GestureDetector, GestureEvent, GestureKind, GestureListener};
use crate::face::{Emotion, FaceLink, NullFace, SerialFace};
use crate::pipeline::{run_pipeline, Control, SessionStats, StopSignal};
use crate::reactions::{
    describe_reactions, emotion_for_gesture, emotion_for_response, load_reactions, ReactionsConfig,
};
use crate::replay::{RecordedLandmarks, ReplaySource};

/// Gesture events buffered between the detector and the face reactor.
const EVENT_QUEUE_DEPTH: usize = 16;

/// Pause between expressions when cycling through every emotion.
pub const EMOTION_TEST_PAUSE: Duration = Duration::from_secs(3);

/// Running gesture totals visible to every task in the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GestureTally {
    pub last: Option<GestureKind>,
    pub waves: u64,
    pub guns: u64,
}

/// Thread-safe view of the latest gesture, for tasks that poll rather
/// than subscribe.
#[derive(Clone, Debug, Default)]
pub struct SharedGestureState {
    inner: Arc<RwLock<GestureTally>>,
}

impl SharedGestureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a confirmed gesture.
    pub fn record(&self, event: &GestureEvent) {
        let mut tally = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tally.last = Some(event.kind);
        match event.kind {
            GestureKind::Wave => tally.waves = event.count,
            GestureKind::Gun => tally.guns = event.count,
        }
    }

    pub fn tally(&self) -> GestureTally {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Latest gesture as `"wave"`, `"gun"` or `"none"`.
    pub fn last_gesture(&self) -> &'static str {
        self.tally().last.map_or("none", GestureKind::as_str)
    }
}

/// Listener that publishes events to the shared state and an async channel.
pub struct ChannelListener {
    events: mpsc::Sender<GestureEvent>,
    state: SharedGestureState,
}

impl ChannelListener {
    pub fn new(events: mpsc::Sender<GestureEvent>, state: SharedGestureState) -> Self {
        Self { events, state }
    }

    /// Records `event` and queues it for the reactor.
    ///
    /// # Details
    /// Never blocks the detector thread: when the queue is full the reaction
    /// is dropped with a warning; the shared tally is still updated.
    ///
    /// # Arguments
    /// * `event` - The confirmed gesture.
    fn publish(&mut self, event: &GestureEvent) {
        self.state.record(event);
        match self.events.try_send(event.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(kind = %event.kind, "event queue full, reaction dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(kind = %event.kind, "event queue closed");
            }
        }
    }
}

impl GestureListener for ChannelListener {
    fn on_wave(&mut self, event: &GestureEvent) {
        self.publish(event);
    }

    fn on_gun(&mut self, event: &GestureEvent) {
        self.publish(event);
    }
}

/// Opens the face controller, or a [`NullFace`] when disabled or unreachable.
pub fn connect_face(config: &AppConfig, enabled: bool) -> Box<dyn FaceLink> {
    if !enabled {
        info!("face controller disabled");
        return Box::new(NullFace);
    }
    match SerialFace::open(&config.serial_port, config.serial_baud) {
        Ok(face) => Box::new(face),
        Err(err) => {
            warn!(port = %config.serial_port, error = %format!("{:#}", anyhow::Error::new(err)), "face controller unavailable");
            Box::new(NullFace)
        }
    }
}

/// Shows `emotion`, logging rather than failing on serial errors.
///
/// # Arguments
/// * `face` - Face controller link.
/// * `emotion` - Expression to show.
fn show(face: &mut dyn FaceLink, emotion: Emotion) {
    if let Err(err) = face.send_emotion(emotion) {
        warn!(%emotion, %err, "face command failed");
    }
}

/// Forwards confirmed gestures to the face until the event channel closes.
///
/// Serial writes block, so each one runs on the blocking pool.
///
/// # Returns
/// The face link, handed back once the detector side has shut down.
pub async fn react_to_gestures(
    mut events: mpsc::Receiver<GestureEvent>,
    mut face: Box<dyn FaceLink>,
    reactions: ReactionsConfig,
) -> Result<Box<dyn FaceLink>> {
    while let Some(event) = events.recv().await {
        let emotion = emotion_for_gesture(&reactions, event.kind);
        info!(kind = %event.kind, count = event.count, %emotion, "reacting to gesture");
        face = tokio::task::spawn_blocking(move || {
            show(face.as_mut(), emotion);
            face
        })
        .await
        .context("face reaction task failed")?;
    }
    Ok(face)
}

/// Reads keyboard controls from stdin on a dedicated thread.
///
/// The thread is detached: a blocking stdin read must not hold up shutdown.
fn spawn_control_reader(controls: ControlSender<Control>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match Control::parse(&line) {
                Some(control) => {
                    if controls.send(control).is_err() || control == Control::Quit {
                        break;
                    }
                }
                None if !line.trim().is_empty() => {
                    info!(input = %line.trim(), "unknown control (q, r, +, -, g)");
                }
                None => {}
            }
        }
    });
}

/// Options for one gesture-watching session.
#[derive(Clone, Debug)]
pub struct WatchOptions {
    /// Landmark recording to replay.
    pub frames: PathBuf,
    /// Release frames at their recorded pace.
    pub realtime: bool,
    /// Accept keyboard controls on stdin.
    pub keyboard: bool,
}

/// Runs gesture detection over a landmark recording and drives the face.
///
/// # Details
/// The detector runs on the blocking pool; confirmed gestures travel over a
/// channel to an async reactor that sends emotions to the face controller.
/// Ctrl-C raises the stop signal and the session winds down cleanly.
///
/// # Returns
/// Session statistics once the recording ends or the user quits.
///
/// # Errors
/// Fails when the recording cannot be opened or a session task panics.
pub async fn watch_gestures(
    config: &AppConfig,
    face: Box<dyn FaceLink>,
    options: WatchOptions,
) -> Result<(SessionStats, SharedGestureState)> {
    let reactions = load_reactions(&config.reactions_path);
    debug!("{}", describe_reactions(&reactions));

    let source = ReplaySource::open_path(&options.frames, options.realtime)
        .with_context(|| format!("Failed to open {}", options.frames.display()))?;

    let state = SharedGestureState::new();
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (control_tx, control_rx) = crossbeam_channel::unbounded();
    if options.keyboard {
        info!("controls: q quit, r reset, +/- wave sensitivity, g gun sensitivity");
        spawn_control_reader(control_tx);
    } else {
        drop(control_tx);
    }

    let mut detector = GestureDetector::new(config.detector_config());
    detector.add_listener(Box::new(ChannelListener::new(event_tx, state.clone())));

    let stop = StopSignal::new();
    let pipeline_stop = stop.clone();
    let mut pipeline = tokio::task::spawn_blocking(move || {
        run_pipeline(source, RecordedLandmarks, &mut detector, &control_rx, &pipeline_stop)
    });
    let reactor = tokio::spawn(react_to_gestures(event_rx, face, reactions));

    let outcome = tokio::select! {
        outcome = &mut pipeline => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("stopped by user (Ctrl-C)");
            stop.stop();
            pipeline.await
        }
    };
    let stats = outcome
        .context("gesture pipeline task failed")?
        .context("gesture pipeline failed")?;

    reactor.await.context("face reactor task failed")??;
    info!(last_gesture = state.last_gesture(), "session finished");
    Ok((stats, state))
}

/// Shows the emotion matching a spoken reply.
pub fn react_to_reply(face: &mut dyn FaceLink, reactions: &ReactionsConfig, reply: &str) -> Emotion {
    let emotion = emotion_for_response(reactions, reply);
    show(face, emotion);
    emotion
}

/// Cycles the face through every emotion, pausing between each.
pub fn cycle_emotions(face: &mut dyn FaceLink, pause: Duration) {
    for emotion in Emotion::ALL {
        info!(%emotion, "testing emotion");
        show(face, emotion);
        thread::sleep(pause);
    }
}
