/*
 * @file classifier.rs
 * @brief Gun pose and wave motion classifiers
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

//! Per-frame gesture heuristics: the gun pose score and the wave motion test.
//!
//! Both classifiers are pure functions of their input. Debouncing across
//! frames lives in [`crate::detector`].

use tracing::warn;

use crate::error::LandmarkError;
use crate::landmarks::{HandLandmark, HandObservation, PixelPoint};

/// Number of geometric checks behind the gun pose score.
pub const GUN_PREDICATE_COUNT: usize = 5;

/// Minimum direction reversals for a wave.
pub const MIN_WAVE_REVERSALS: usize = 3;

/// Horizontal range must exceed this share of the vertical range.
pub const HORIZONTAL_DOMINANCE: f32 = 0.7;

/// Outcome of each gun pose check for one hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GunPredicates {
    pub index_extended: bool,
    pub middle_folded: bool,
    pub ring_folded: bool,
    pub pinky_folded: bool,
    pub thumb_extended: bool,
}

impl GunPredicates {
    /// Number of satisfied checks.
    pub fn satisfied(&self) -> usize {
        [
            self.index_extended,
            self.middle_folded,
            self.ring_folded,
            self.pinky_folded,
            self.thumb_extended,
        ]
        .into_iter()
        .filter(|&hit| hit)
        .count()
    }

    /// Share of satisfied checks, in `[0, 1]`.
    pub fn confidence(&self) -> f32 {
        self.satisfied() as f32 / GUN_PREDICATE_COUNT as f32
    }
}

/// Evaluates the five gun pose checks against one hand.
///
/// # Details
/// A finger is extended when its tip is farther from the wrist than the
/// reference joint, folded when it is closer. Distances are measured in
/// normalized landmark space.
///
/// # Errors
/// Propagates [`LandmarkError`] for incomplete or corrupt landmark lists.
pub fn gun_predicates(hand: &HandObservation) -> Result<GunPredicates, LandmarkError> {
    use HandLandmark::*;

    let wrist = hand.get(Wrist)?;
    let reach = |landmark: HandLandmark| -> Result<f32, LandmarkError> {
        Ok(hand.get(landmark)?.distance(&wrist))
    };

    Ok(GunPredicates {
        index_extended: reach(IndexTip)? > reach(IndexMcp)?,
        middle_folded: reach(MiddleTip)? < reach(MiddlePip)?,
        ring_folded: reach(RingTip)? < reach(RingPip)?,
        pinky_folded: reach(PinkyTip)? < reach(PinkyPip)?,
        thumb_extended: reach(ThumbTip)? > reach(ThumbIp)?,
    })
}

/// Gun pose confidence for one hand.
///
/// Malformed landmark data scores zero instead of failing the frame.
pub fn gun_confidence(hand: &HandObservation) -> f32 {
    match gun_predicates(hand) {
        Ok(predicates) => predicates.confidence(),
        Err(err) => {
            warn!(hand = hand.index(), %err, "gun pose check skipped");
            0.0
        }
    }
}

/// Palm position proxy: midpoint of wrist and index fingertip, in pixels.
pub fn hand_center(
    hand: &HandObservation,
    width: u32,
    height: u32,
) -> Result<PixelPoint, LandmarkError> {
    let wrist = hand.get(HandLandmark::Wrist)?;
    let tip = hand.get(HandLandmark::IndexTip)?;
    let (w, h) = (width as f32, height as f32);
    Ok(PixelPoint::new(
        (wrist.x * w + tip.x * w) / 2.0,
        (wrist.y * h + tip.y * h) / 2.0,
    ))
}

/// Measurements behind one wave verdict, kept for overlays and logging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveAnalysis {
    pub x_range: f32,
    pub y_range: f32,
    pub reversals: usize,
    pub is_wave: bool,
}

/// Counts sign changes between consecutive deltas of `xs`.
///
/// A zero delta counts as "not moving right", matching the strict `> 0` test.
pub fn count_reversals(xs: &[f32]) -> usize {
    let deltas: Vec<f32> = xs.windows(2).map(|pair| pair[1] - pair[0]).collect();
    deltas
        .windows(2)
        .filter(|pair| (pair[1] > 0.0) != (pair[0] > 0.0))
        .count()
}

/// Classifies a window of hand centers as waving or not.
///
/// # Details
/// A wave needs a horizontal range above `threshold` pixels, at least
/// [`MIN_WAVE_REVERSALS`] direction reversals, and mostly horizontal motion.
/// An empty window is never a wave.
pub fn analyze_wave(centers: &[PixelPoint], threshold: f32) -> WaveAnalysis {
    let xs: Vec<f32> = centers.iter().map(|p| p.x).collect();
    let ys: Vec<f32> = centers.iter().map(|p| p.y).collect();
    let x_range = span(&xs);
    let y_range = span(&ys);
    let reversals = count_reversals(&xs);
    let is_wave = !centers.is_empty()
        && x_range > threshold
        && reversals >= MIN_WAVE_REVERSALS
        && x_range > y_range * HORIZONTAL_DOMINANCE;
    WaveAnalysis {
        x_range,
        y_range,
        reversals,
        is_wave,
    }
}

fn span(values: &[f32]) -> f32 {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if values.is_empty() {
        0.0
    } else {
        max - min
    }
}
