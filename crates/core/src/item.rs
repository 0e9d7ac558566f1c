//! Item system - stacks, kinds, and bound-item payloads.

use crate::golem::GolemSnapshot;
use crate::GolemId;
use serde::{Deserialize, Serialize};

/// Item kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Plain stone, not processable.
    Stone,
    /// Raw crystal ore, crushed into shards.
    CrystalOre,
    /// Crushed crystal shard.
    CrystalShard,
    /// Raw iron ore, smelted into ingots.
    IronOre,
    /// Smelted iron ingot.
    IronIngot,
    /// The control sigil that binds a golem to its holder.
    ControlSigil,
}

impl ItemKind {
    /// Canonical string key used in configs/logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stone => "stone",
            Self::CrystalOre => "crystal_ore",
            Self::CrystalShard => "crystal_shard",
            Self::IronOre => "iron_ore",
            Self::IronIngot => "iron_ingot",
            Self::ControlSigil => "control_sigil",
        }
    }
}

/// Link from a control sigil to its golem.
///
/// The `snapshot` is the holder-visible copy of the golem's state. It is
/// overwritten wholesale whenever the authority resynchronizes the item and
/// is the only path by which a client copy learns authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GolemBinding {
    /// The bound golem.
    pub golem: GolemId,
    /// Full-state view of the golem at the last resynchronization.
    pub snapshot: GolemSnapshot,
}

/// Optional per-stack payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StackData {
    /// A control sigil's golem binding.
    GolemBinding(GolemBinding),
}

/// An item stack in an inventory slot or carry buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Kind of item.
    pub kind: ItemKind,
    /// Quantity in stack. A count of zero means the stack is empty.
    pub count: u32,
    /// Extra payload carried by the stack (bindings etc.).
    pub data: Option<StackData>,
}

impl ItemStack {
    /// Create a new item stack with no payload.
    pub fn new(kind: ItemKind, count: u32) -> Self {
        Self {
            kind,
            count,
            data: None,
        }
    }

    /// Create a control sigil bound to a golem.
    pub fn control_sigil(binding: GolemBinding) -> Self {
        Self {
            kind: ItemKind::ControlSigil,
            count: 1,
            data: Some(StackData::GolemBinding(binding)),
        }
    }

    /// Whether the stack holds nothing.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum stack size for this item kind.
    pub fn max_stack_size(&self) -> u32 {
        match self.kind {
            ItemKind::ControlSigil => 1,
            _ => 64,
        }
    }

    /// Check if this stack can accept more items.
    pub fn can_add(&self, count: u32) -> bool {
        self.count + count <= self.max_stack_size()
    }

    /// The golem binding carried by this stack, if any.
    pub fn golem_binding(&self) -> Option<&GolemBinding> {
        match &self.data {
            Some(StackData::GolemBinding(binding)) => Some(binding),
            None => None,
        }
    }

    /// Mutable access to the golem binding carried by this stack, if any.
    pub fn golem_binding_mut(&mut self) -> Option<&mut GolemBinding> {
        match &mut self.data {
            Some(StackData::GolemBinding(binding)) => Some(binding),
            None => None,
        }
    }
}
