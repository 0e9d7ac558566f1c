//! Dimension identifiers.
//!
//! Gameplay rules and persistence/network protocols are dimension-scoped.
//! Even though a build may only host a single dimension today, threading a
//! dimension identifier through the core types prevents later large-scale
//! rewrites.

use serde::{Deserialize, Serialize};

/// Stable identifier for a world dimension.
///
/// This is intentionally small (u8) for efficient persistence/network encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum DimensionId {
    /// The surface dimension.
    Overworld = 0,
    /// The underground works dimension.
    Depths = 1,
}

impl DimensionId {
    /// Default (Overworld) dimension.
    pub const DEFAULT: Self = Self::Overworld;

    /// Convert to a stable numeric representation.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert from the stable numeric representation.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Overworld),
            1 => Some(Self::Depths),
            _ => None,
        }
    }

    /// Canonical string key used in configs/logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overworld => "overworld",
            Self::Depths => "depths",
        }
    }
}

impl Default for DimensionId {
    fn default() -> Self {
        Self::DEFAULT
    }
}
