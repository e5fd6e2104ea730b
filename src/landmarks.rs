/*
 * @file landmarks.rs
 * @brief Hand landmark and frame types
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

//! Hand landmark data model.
//!
//! Landmarks arrive from an external hand-pose estimator in MediaPipe order:
//! 21 keypoints per hand, normalized to the `[0, 1]` image plane.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::LandmarkError;

/// Number of keypoints the estimator reports for every hand.
pub const LANDMARK_COUNT: usize = 21;

/// The 21 anatomical hand keypoints, in estimator order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl HandLandmark {
    /// Position of this keypoint in an estimator landmark list.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A single keypoint in normalized image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance in the normalized image plane (depth ignored).
    pub fn distance(&self, other: &Landmark) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A point in pixel space, used for hand centers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Landmarks of one detected hand in one frame.
///
/// `index` is the estimator's detection order for this frame. It is not a
/// stable identity: two hands may swap slots between frames.
#[derive(Clone, Debug, PartialEq)]
pub struct HandObservation {
    index: usize,
    landmarks: Vec<Landmark>,
}

impl HandObservation {
    /// Wraps raw estimator output. The landmark list is not validated here;
    /// lookups report incomplete or corrupt data instead.
    pub fn new(index: usize, landmarks: Vec<Landmark>) -> Self {
        Self { index, landmarks }
    }

    /// Builds an observation from `(x, y)` pairs.
    pub fn from_points(index: usize, points: &[(f32, f32)]) -> Self {
        Self::new(
            index,
            points.iter().map(|&(x, y)| Landmark::new(x, y)).collect(),
        )
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Looks up one keypoint.
    ///
    /// # Errors
    /// Returns [`LandmarkError::Incomplete`] when the estimator delivered fewer
    /// than [`LANDMARK_COUNT`] points and [`LandmarkError::NonFinite`] for NaN
    /// or infinite coordinates.
    pub fn get(&self, landmark: HandLandmark) -> Result<Landmark, LandmarkError> {
        if self.landmarks.len() < LANDMARK_COUNT {
            return Err(LandmarkError::Incomplete {
                found: self.landmarks.len(),
                expected: LANDMARK_COUNT,
            });
        }
        let point = self.landmarks[landmark.index()];
        if !point.is_finite() {
            return Err(LandmarkError::NonFinite(landmark));
        }
        Ok(point)
    }
}

/// Everything the detector sees for one processed video frame.
#[derive(Clone, Debug)]
pub struct FrameSample {
    pub timestamp: Instant,
    pub width: u32,
    pub height: u32,
    pub hands: Vec<HandObservation>,
}

impl FrameSample {
    pub fn new(timestamp: Instant, width: u32, height: u32, hands: Vec<HandObservation>) -> Self {
        Self {
            timestamp,
            width,
            height,
            hands,
        }
    }

    /// Frame dimensions after the display resize: frames wider than
    /// `target_width` shrink to that width with the aspect ratio kept.
    /// A `target_width` of zero disables resizing.
    pub fn scaled_dimensions(&self, target_width: u32) -> (u32, u32) {
        if target_width == 0 || self.width <= target_width {
            return (self.width, self.height);
        }
        let ratio = target_width as f64 / self.width as f64;
        let height = (self.height as f64 * ratio) as u32;
        (target_width, height)
    }
}
