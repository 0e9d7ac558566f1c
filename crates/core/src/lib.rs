#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod direction;
pub mod filter;
pub mod golem;
pub mod item;
pub mod machine;
pub mod registry;
pub mod transfer;

mod dimension;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use dimension::DimensionId;
pub use direction::Direction;
pub use filter::StackFilter;
pub use golem::{Golem, GolemSnapshot, Job, JobKind, ManageMachineJob};
pub use item::{GolemBinding, ItemKind, ItemStack, StackData};
pub use machine::{find_recipe, Machine, MachinePos, MachineReference, ProcessRecipe};
pub use registry::{MachineCatalog, MachineSpec, RegistryKey, RegistryKeyError};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Stable identifier for a golem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GolemId(pub u64);

/// Stable identifier for a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);
