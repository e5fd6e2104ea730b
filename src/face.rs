/*
 * @file face.rs
 * @brief Serial face controller and emotion codes
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

//! Face/LED rig control over the Arduino serial link.

use std::fmt;
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::error::FaceError;

/// Serial write timeout so a stalled board cannot block the session.
const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Time the Arduino needs to reboot after the port opens (DTR toggle).
const SERIAL_BOOT_DELAY: Duration = Duration::from_secs(2);

/// Time given to the board to answer a command before the reply is read.
const SERIAL_REPLY_DELAY: Duration = Duration::from_millis(100);

/// Expressions the face firmware can show.
///
/// # Details
/// Each emotion travels over the wire as its numeric code followed by a
/// newline, e.g. `"2\n"` for [`Emotion::Happy`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Blink,
    Happy,
    Suspect,
    Angry,
    Dizzy,
}

impl Emotion {
    /// Every emotion in code order.
    pub const ALL: [Emotion; 5] = [
        Emotion::Blink,
        Emotion::Happy,
        Emotion::Suspect,
        Emotion::Angry,
        Emotion::Dizzy,
    ];

    /// Numeric code understood by the firmware.
    pub fn code(self) -> u8 {
        match self {
            Self::Blink => 1,
            Self::Happy => 2,
            Self::Suspect => 3,
            Self::Angry => 4,
            Self::Dizzy => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|emotion| emotion.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Blink => "blink",
            Self::Happy => "happy",
            Self::Suspect => "suspect",
            Self::Angry => "angry",
            Self::Dizzy => "dizzy",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Writes one emotion command in wire format.
pub fn write_emotion<W: Write>(writer: &mut W, emotion: Emotion) -> std::io::Result<()> {
    writeln!(writer, "{}", emotion.code())?;
    writer.flush()
}

/// Anything that can show an emotion on the companion's face.
pub trait FaceLink: Send {
    fn send_emotion(&mut self, emotion: Emotion) -> Result<(), FaceError>;
}

/// Face controller reached through a serial port.
pub struct SerialFace {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialFace {
    /// Opens the face controller and shows the boot expression.
    ///
    /// # Details
    /// Tries `path` first and, for macOS `tty.*` devices, the matching `cu.*`
    /// callout device. Asserts DTR/RTS, waits for the board to reboot, then
    /// sends [`Emotion::Suspect`].
    ///
    /// # Arguments
    /// * `path` - Serial device path, e.g. `/dev/ttyACM1`.
    /// * `baud` - Baud rate the firmware listens at.
    ///
    /// # Errors
    /// Returns [`FaceError::Open`] if no candidate port opens, or
    /// [`FaceError::Write`] if the boot expression cannot be sent.
    pub fn open(path: &str, baud: u32) -> Result<Self, FaceError> {
        let (port, path) = open_with_fallback(path, baud)?;
        let mut face = Self { port, path };
        face.configure_signals();
        info!(port = %face.path, baud, "connected to face controller");
        face.send_emotion(Emotion::Suspect)?;
        Ok(face)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Asserts DTR/RTS and waits for the board to come out of reset.
    ///
    /// # Details
    /// Opening the port reboots most Arduino boards, so commands sent before
    /// [`SERIAL_BOOT_DELAY`] would be lost. Boards that ignore the control
    /// lines are tolerated.
    fn configure_signals(&mut self) {
        let _ = self.port.write_data_terminal_ready(true);
        let _ = self.port.write_request_to_send(true);
        thread::sleep(SERIAL_BOOT_DELAY);
    }

    /// Logs whatever the board printed in reply, if anything.
    ///
    /// # Details
    /// Waits [`SERIAL_REPLY_DELAY`], then reads the bytes already buffered.
    /// Read failures are logged at debug level and otherwise ignored.
    fn drain_reply(&mut self) {
        thread::sleep(SERIAL_REPLY_DELAY);
        let pending = match self.port.bytes_to_read() {
            Ok(0) | Err(_) => return,
            Ok(count) => count as usize,
        };
        let mut reply = vec![0u8; pending];
        match self.port.read(&mut reply) {
            Ok(read) => {
                let text = String::from_utf8_lossy(&reply[..read]);
                debug!(reply = %text.trim(), "face controller replied");
            }
            Err(err) => debug!(%err, "could not read face controller reply"),
        }
    }
}

impl FaceLink for SerialFace {
    fn send_emotion(&mut self, emotion: Emotion) -> Result<(), FaceError> {
        write_emotion(&mut self.port, emotion)?;
        info!(%emotion, "sent emotion to face controller");
        self.drain_reply();
        Ok(())
    }
}

/// Stand-in used when no face controller is connected.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullFace;

impl FaceLink for NullFace {
    fn send_emotion(&mut self, emotion: Emotion) -> Result<(), FaceError> {
        info!(%emotion, "face controller not connected, skipping emotion");
        Ok(())
    }
}

/// Opens `path`, falling back to its macOS callout device.
///
/// # Details
/// Tries the configured device first. When that fails and the path is a
/// `/dev/tty.*` device, tries the matching `/dev/cu.*` device before giving
/// up.
///
/// # Arguments
/// * `path` - Configured serial device path.
/// * `baud` - Baud rate the firmware listens at.
///
/// # Returns
/// * `(Box<dyn SerialPort>, String)` - The open port and the path that worked.
///
/// # Errors
/// Returns the [`FaceError::Open`] of the configured path when no candidate opens.
fn open_with_fallback(path: &str, baud: u32) -> Result<(Box<dyn SerialPort>, String), FaceError> {
    let primary_err = match open_serial_port(path, baud) {
        Ok(port) => return Ok((port, path.to_string())),
        Err(err) => err,
    };
    let Some(callout) = callout_variant(path) else {
        return Err(primary_err);
    };
    match open_serial_port(&callout, baud) {
        Ok(port) => {
            warn!(primary = path, fallback = %callout, "primary port unavailable, using callout device");
            Ok((port, callout))
        }
        Err(_) => Err(primary_err),
    }
}

/// Opens one serial device with the face controller's timeout.
///
/// # Arguments
/// * `path` - Serial device path.
/// * `baud` - Baud rate.
///
/// # Returns
/// * `Box<dyn SerialPort>` - The open port.
///
/// # Errors
/// Returns [`FaceError::Open`] carrying the path and the serialport error.
fn open_serial_port(path: &str, baud: u32) -> Result<Box<dyn SerialPort>, FaceError> {
    serialport::new(path, baud)
        .timeout(SERIAL_TIMEOUT)
        .open()
        .map_err(|source| FaceError::Open {
            path: path.to_string(),
            source,
        })
}

/// Converts a macOS `/dev/tty.*` path to its `/dev/cu.*` callout variant.
///
/// # Arguments
/// * `path` - Serial device path.
///
/// # Returns
/// * `Some(String)` - The callout path.
/// * `None` - `path` is not a macOS dial-in device.
fn callout_variant(path: &str) -> Option<String> {
    let suffix = path.strip_prefix("/dev/tty.")?;
    Some(format!("/dev/cu.{}", suffix))
}
