/*
 * @file lib.rs
 * @brief Gesture companion library root
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

//! Gesture companion: watches hands and reacts with a face.
//!
//! This library turns per-frame hand landmarks into debounced gestures and
//! drives an Arduino face rig over serial:
//! - [`classifier`] scores gun poses and tests hand motion for waves
//! - [`detector`] debounces those verdicts into discrete events
//! - [`pipeline`] runs capture and detection on separate threads
//! - [`session`] maps events to emotions on the face controller
//!
//! # Example
//! ```no_run
//! use anyhow::Result;
//! use gesture_companion::{config, session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = config::load_app_config(std::path::Path::new(config::CONFIG_PATH));
//!     let face = session::connect_face(&config, true);
//!     let options = session::WatchOptions {
//!         frames: "hands.jsonl".into(),
//!         realtime: true,
//!         keyboard: true,
//!     };
//!     session::watch_gestures(&config, face, options).await?;
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod face;
pub mod history;
pub mod landmarks;
pub mod pipeline;
pub mod reactions;
pub mod replay;
pub mod session;

pub use detector::{DetectorConfig, GestureDetector, GestureEvent, GestureKind, GestureListener};
pub use error::{EstimatorError, FaceError, LandmarkError, SourceError};
pub use face::{Emotion, FaceLink};
pub use landmarks::{FrameSample, HandObservation, Landmark};
pub use pipeline::{run_pipeline, HandPoseEstimator, SessionStats, VideoSource};
