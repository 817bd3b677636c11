//! Signal vocabulary shared by every layer: lamp colours, approaches,
//! operating modes and the operator's manual command.
//!
//! Wire spellings follow the transport convention (upper-case colour and
//! mode names).  `YELLOW` is accepted on input as a synonym for `AMBER`
//! because older dashboard builds still write it.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// Colour shown by one signal head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Amber,
    Green,
}

impl Color {
    /// Upper-case transport spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Amber => "AMBER",
            Self::Green => "GREEN",
        }
    }

    /// `true` for any colour that grants (or is about to end) right-of-way.
    pub const fn is_proceed(self) -> bool {
        !matches!(self, Self::Red)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised colour or mode spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSignalError;

impl fmt::Display for ParseSignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unrecognised signal value")
    }
}

impl FromStr for Color {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(Self::Red),
            "AMBER" | "YELLOW" => Ok(Self::Amber),
            "GREEN" => Ok(Self::Green),
            _ => Err(ParseSignalError),
        }
    }
}

// ---------------------------------------------------------------------------
// Approach
// ---------------------------------------------------------------------------

/// One of the two intersecting roads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Approach {
    One,
    Two,
}

// ---------------------------------------------------------------------------
// Operating mode
// ---------------------------------------------------------------------------

/// Who decides the lamp colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperatingMode {
    /// The phase state machine runs the cycle.
    #[default]
    Auto,
    /// An operator sets both heads directly; the cycle is frozen.
    Manual,
}

impl OperatingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "MANUAL" => Ok(Self::Manual),
            _ => Err(ParseSignalError),
        }
    }
}

// ---------------------------------------------------------------------------
// Manual command
// ---------------------------------------------------------------------------

/// Colours requested by the operator while in [`OperatingMode::Manual`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCommand {
    pub light1: Color,
    pub light2: Color,
}

impl ManualCommand {
    pub const ALL_RED: Self = Self {
        light1: Color::Red,
        light2: Color::Red,
    };

    pub const fn new(light1: Color, light2: Color) -> Self {
        Self { light1, light2 }
    }

    /// Both heads showing a proceed colour at once.
    pub const fn is_conflicting(&self) -> bool {
        self.light1.is_proceed() && self.light2.is_proceed()
    }

    /// Copy of `self` with one approach's colour replaced.
    pub const fn with(self, approach: Approach, color: Color) -> Self {
        match approach {
            Approach::One => Self {
                light1: color,
                light2: self.light2,
            },
            Approach::Two => Self {
                light1: self.light1,
                light2: color,
            },
        }
    }
}
