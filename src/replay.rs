//! Replays recorded hand landmarks as a video source.
//!
//! Each line of a recording is one JSON object:
//!
//! ```json
//! {"t": 0.033, "width": 640, "height": 480, "hands": [[[0.51, 0.92], [0.47, 0.88], ...]]}
//! ```
//!
//! `t` is seconds since the start of the recording and every hand is a list
//! of 21 `[x, y]` points in normalized coordinates. Since the landmarks are
//! already extracted, [`RecordedLandmarks`] serves as the matching estimator.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::{EstimatorError, SourceError};
use crate::landmarks::{HandObservation, Landmark};
use crate::pipeline::{CapturedFrame, HandPoseEstimator, VideoSource};

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    t: f64,
    width: u32,
    height: u32,
    #[serde(default)]
    hands: Vec<Vec<[f32; 2]>>,
}

/// JSON-lines landmark recording exposed as a [`VideoSource`].
pub struct ReplaySource<R> {
    name: String,
    lines: Lines<R>,
    line_number: usize,
    origin: Instant,
    realtime: bool,
}

impl ReplaySource<BufReader<File>> {
    /// Opens a recording on disk.
    ///
    /// # Errors
    /// Returns [`SourceError::Unavailable`] if the file cannot be opened.
    pub fn open_path(path: &Path, realtime: bool) -> Result<Self, SourceError> {
        let file = File::open(path)
            .map_err(|err| SourceError::Unavailable(format!("{}: {}", path.display(), err)))?;
        Ok(Self::from_reader(
            path.display().to_string(),
            BufReader::new(file),
            realtime,
        ))
    }
}

impl<R: BufRead> ReplaySource<R> {
    /// Wraps any line reader. With `realtime` set, frames are released at the
    /// pace they were recorded; otherwise as fast as they are read.
    pub fn from_reader(name: impl Into<String>, reader: R, realtime: bool) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            line_number: 0,
            origin: Instant::now(),
            realtime,
        }
    }

    /// Parses one recording line into a frame.
    ///
    /// # Details
    /// Hands keep their position in the line as their estimator index. The
    /// frame timestamp is the recording origin plus `t` seconds.
    ///
    /// # Arguments
    /// * `line` - One non-empty JSON line.
    ///
    /// # Returns
    /// * `CapturedFrame<Vec<HandObservation>>` - The decoded frame.
    ///
    /// # Errors
    /// Returns [`SourceError::Read`] for invalid JSON and for a timestamp that
    /// is negative, not finite, or too large to represent.
    fn decode(&self, line: &str) -> Result<CapturedFrame<Vec<HandObservation>>, SourceError> {
        let record: RecordedFrame = serde_json::from_str(line)
            .map_err(|err| SourceError::Read(format!("line {}: {}", self.line_number, err)))?;
        let timestamp = Duration::try_from_secs_f64(record.t)
            .ok()
            .and_then(|offset| self.origin.checked_add(offset))
            .ok_or_else(|| {
                SourceError::Read(format!(
                    "line {}: invalid timestamp {}",
                    self.line_number, record.t
                ))
            })?;
        let hands = record
            .hands
            .iter()
            .enumerate()
            .map(|(index, points)| {
                HandObservation::new(
                    index,
                    points.iter().map(|&[x, y]| Landmark::new(x, y)).collect(),
                )
            })
            .collect();
        Ok(CapturedFrame {
            image: hands,
            timestamp,
            width: record.width,
            height: record.height,
        })
    }
}

impl<R: BufRead + Send> VideoSource for ReplaySource<R> {
    type Image = Vec<HandObservation>;

    fn describe(&self) -> String {
        format!("replay {}", self.name)
    }

    fn read_frame(&mut self) -> Result<Option<CapturedFrame<Self::Image>>, SourceError> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let line = line.map_err(|err| SourceError::Unavailable(err.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = self.decode(&line)?;
            if self.realtime {
                let wait = frame.timestamp.saturating_duration_since(Instant::now());
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }
            return Ok(Some(frame));
        }
    }
}

/// Estimator for sources whose frames already carry landmarks.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordedLandmarks;

impl HandPoseEstimator<Vec<HandObservation>> for RecordedLandmarks {
    fn estimate(&mut self, image: &Vec<HandObservation>) -> Result<Vec<HandObservation>, EstimatorError> {
        Ok(image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn source(text: &str) -> ReplaySource<Cursor<Vec<u8>>> {
        ReplaySource::from_reader("test", Cursor::new(text.as_bytes().to_vec()), false)
    }

    #[test]
    fn reads_frames_in_order() {
        let mut replay = source(concat!(
            r#"{"t":0.0,"width":640,"height":480,"hands":[[[0.5,0.5],[0.4,0.4]]]}"#,
            "\n\n",
            r#"{"t":0.5,"width":640,"height":480}"#,
            "\n"
        ));
        let first = replay.read_frame().unwrap().unwrap();
        assert_eq!(first.image.len(), 1);
        assert_eq!(first.image[0].landmarks()[1], Landmark::new(0.4, 0.4));
        let second = replay.read_frame().unwrap().unwrap();
        assert!(second.image.is_empty());
        assert_eq!(
            second.timestamp.duration_since(first.timestamp),
            Duration::from_millis(500)
        );
        assert!(replay.read_frame().unwrap().is_none());
    }

    #[test]
    fn malformed_line_is_a_read_error() {
        let mut replay = source("not json\n{\"t\":0.1,\"width\":1,\"height\":1}\n");
        assert!(matches!(replay.read_frame(), Err(SourceError::Read(_))));
        assert!(replay.read_frame().unwrap().is_some());
    }

    #[test]
    fn negative_timestamp_is_rejected() {
        let mut replay = source("{\"t\":-1.0,\"width\":1,\"height\":1}\n");
        assert!(matches!(replay.read_frame(), Err(SourceError::Read(_))));
    }

    #[test]
    fn out_of_range_timestamp_is_a_read_error() {
        let mut replay = source(concat!(
            "{\"t\":1e20,\"width\":1,\"height\":1}\n",
            "{\"t\":1e19,\"width\":1,\"height\":1}\n",
            "{\"t\":0.2,\"width\":1,\"height\":1}\n"
        ));
        assert!(matches!(replay.read_frame(), Err(SourceError::Read(_))));
        assert!(matches!(replay.read_frame(), Err(SourceError::Read(_))));
        assert!(replay.read_frame().unwrap().is_some());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let result = ReplaySource::open_path(Path::new("/nonexistent/recording.jsonl"), false);
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn opens_recording_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"t":0.0,"width":320,"height":240,"hands":[]}}"#).unwrap();
        let mut replay = ReplaySource::open_path(file.path(), false).unwrap();
        let frame = replay.read_frame().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (320, 240));
    }

    #[test]
    fn recorded_landmarks_pass_through() {
        let hands = vec![HandObservation::from_points(0, &[(0.1, 0.2)])];
        assert_eq!(RecordedLandmarks.estimate(&hands).unwrap(), hands);
    }
}
