// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Travel direction, shared by the motor, the schedulers and the wire.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Direction of travel or of a hall call.
///
/// Encoded as an integer everywhere it leaves the process (packets and
/// state snapshots): Up = 1, Stop = 0, Down = -1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    #[default]
    Stop,
    Down,
}

impl Direction {
    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Up => 1,
            Direction::Stop => 0,
            Direction::Down => -1,
        }
    }

    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            1 => Some(Direction::Up),
            0 => Some(Direction::Stop),
            -1 => Some(Direction::Down),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Stop => "stop",
            Direction::Down => "down",
        };
        write!(f, "{name}")
    }
}

impl Serialize for Direction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i8::deserialize(deserializer)?;
        Direction::from_i8(value)
            .ok_or_else(|| D::Error::custom(format!("invalid direction code: {value}")))
    }
}

#[cfg(test)]
#[path = "direction_tests.rs"]
mod tests;
