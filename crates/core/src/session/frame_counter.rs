use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame names printed on film edges that don't map to their index.
const SPECIAL_FRAMES: [(&str, i32); 1] = [("00", -1)];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFrameError {
    #[error("Frame name is empty")]
    Empty,

    #[error("Invalid frame name: {0}")]
    Invalid(String),
}

/// Frame number as printed on the film edge.
///
/// Index -1 is the `"00"` frame some cameras expose before frame 0.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FrameCounter(i32);

impl FrameCounter {
    pub fn new(index: i32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> i32 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Parses a frame name; an empty name means no frame was given.
    pub fn parse(name: &str) -> Result<Option<Self>, ParseFrameError> {
        match name.parse() {
            Ok(frame) => Ok(Some(frame)),
            Err(ParseFrameError::Empty) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Frame names found on a typical 36-exposure roll, "00" through "36".
    pub fn typical_frames() -> Vec<String> {
        (-1..37).map(|i| FrameCounter(i).to_string()).collect()
    }
}

impl fmt::Display for FrameCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match SPECIAL_FRAMES.iter().find(|(_, index)| *index == self.0) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for FrameCounter {
    type Err = ParseFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseFrameError::Empty);
        }
        if let Some((_, index)) = SPECIAL_FRAMES.iter().find(|(name, _)| *name == s) {
            return Ok(FrameCounter(*index));
        }
        s.parse::<i32>()
            .map(FrameCounter)
            .map_err(|_| ParseFrameError::Invalid(s.to_string()))
    }
}
