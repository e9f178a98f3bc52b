//! Commands and types used throughout qkdisplays.
//!
//! This module defines the vocabulary that all components share:
//! [`DaemonCommand`] is every request a running `show` daemon understands,
//! and [`Direction`] / [`OutputInfo`] / [`Position`] provide the supporting
//! data types.
//!
//! The daemon protocol is deliberately tiny: a request is one bare ASCII
//! token, a response is either [`SUCCESS`] or an error message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Response body the daemon sends when a command was handled.
pub const SUCCESS: &str = "success";

/// Upper bound on the size of a single request.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Horizontal direction for moving the focused output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// A request sent to the `show` daemon over its Unix socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonCommand {
    /// Outputs may have moved: recompute the arrangement and redraw the
    /// indicators.
    Notify,
    /// Close the indicators and stop the daemon.
    Close,
}

impl DaemonCommand {
    /// The wire token for this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonCommand::Notify => "notify",
            DaemonCommand::Close => "close",
        }
    }
}

impl fmt::Display for DaemonCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DaemonCommand {
    type Err = ProtocolError;

    /// Parse a wire token.  Tokens are matched exactly; surrounding
    /// whitespace is not accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notify" => Ok(DaemonCommand::Notify),
            "close" => Ok(DaemonCommand::Close),
            other => Err(ProtocolError(format!("bad socket message: {:?}", other))),
        }
    }
}

/// An unrecognised daemon request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProtocolError(String);

/// Geometry and focus state of one active output, as reported by the
/// compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    /// Unique, stable output name (e.g. `"DP-1"`).
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Whether the compositor currently has this output focused.
    pub focused: bool,
}

impl OutputInfo {
    /// X coordinate of the output's right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Top-left corner of the output.
    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }
}

/// Top-left corner of an output in compositor layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = String;

    /// Parse `"x,y"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected \"x,y\", got {:?}", s))?;
        let x = x
            .trim()
            .parse()
            .map_err(|_| format!("invalid x coordinate in {:?}", s))?;
        let y = y
            .trim()
            .parse()
            .map_err(|_| format!("invalid y coordinate in {:?}", s))?;
        Ok(Position { x, y })
    }
}

//  Tests
