//! Machines, processing recipes, and the machine link record.

use crate::direction::Direction;
use crate::item::{ItemKind, ItemStack};
use crate::registry::{MachineSpec, RegistryKey};
use crate::transfer::insert_one_into_slots;
use crate::DimensionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// World position of a machine: owning dimension plus block coordinate.
///
/// This is the opaque target identifier carried by [`MachineReference`]; it
/// is set only by authoritative linking and never trusted from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MachinePos {
    /// Dimension the machine lives in.
    pub dimension: DimensionId,
    /// Block X coordinate.
    pub x: i32,
    /// Block Y coordinate.
    pub y: i32,
    /// Block Z coordinate.
    pub z: i32,
}

impl MachinePos {
    /// Create a position in the given dimension.
    pub fn new(dimension: DimensionId, x: i32, y: i32, z: i32) -> Self {
        Self { dimension, x, y, z }
    }
}

impl fmt::Display for MachinePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@({},{},{})",
            self.dimension.as_str(),
            self.x,
            self.y,
            self.z
        )
    }
}

/// The link record between a golem's job and a target machine.
///
/// `pos` and `kind` are authoritative: established only by server-side
/// linking and immutable except by re-linking. `custom_name`,
/// `extract_facing`, and `insert_facing` are display/orientation fields the
/// holder may edit remotely; [`MachineReference::apply_patch`] is the only
/// write path for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineReference {
    /// World position of the linked machine.
    pub pos: MachinePos,
    /// Registered kind of the linked machine.
    pub kind: RegistryKey,
    /// Optional display label chosen by the holder.
    pub custom_name: Option<String>,
    /// Face the golem extracts finished items from.
    pub extract_facing: Direction,
    /// Face the golem inserts raw items into.
    pub insert_facing: Direction,
}

impl MachineReference {
    /// Create a fresh link with default facings and no custom name.
    pub fn linked(pos: MachinePos, kind: RegistryKey) -> Self {
        Self {
            pos,
            kind,
            custom_name: None,
            extract_facing: Direction::Down,
            insert_facing: Direction::Up,
        }
    }

    /// Overwrite exactly the holder-editable fields from `patch`.
    ///
    /// `pos` and `kind` are left untouched regardless of what the patch
    /// carries.
    pub fn apply_patch(&mut self, patch: &MachineReference) {
        self.custom_name = patch.custom_name.clone();
        self.extract_facing = patch.extract_facing;
        self.insert_facing = patch.insert_facing;
    }

    /// Display label: the custom name if set, otherwise the kind path.
    pub fn display_name(&self) -> &str {
        match &self.custom_name {
            Some(name) => name,
            None => self.kind.path(),
        }
    }
}

/// A processing recipe: one input item becomes one output item after
/// `work_ticks` ticks of progress.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRecipe {
    /// Consumed item kind.
    pub input: ItemKind,
    /// Produced item kind.
    pub output: ItemKind,
    /// Ticks of work per item.
    pub work_ticks: u32,
}

/// All available processing recipes.
pub const PROCESS_RECIPES: &[ProcessRecipe] = &[
    ProcessRecipe {
        input: ItemKind::IronOre,
        output: ItemKind::IronIngot,
        work_ticks: 200,
    },
    ProcessRecipe {
        input: ItemKind::CrystalOre,
        output: ItemKind::CrystalShard,
        work_ticks: 100,
    },
];

/// Look up the recipe consuming `input`, if any.
pub fn find_recipe(input: ItemKind) -> Option<&'static ProcessRecipe> {
    PROCESS_RECIPES.iter().find(|r| r.input == input)
}

/// State of a machine placed in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Kind of this machine.
    pub spec: RegistryKey,
    /// Input slot bank.
    pub input: Vec<Option<ItemStack>>,
    /// Output slot bank.
    pub output: Vec<Option<ItemStack>>,
    /// Ticks of progress on the current work cycle.
    pub work_progress: u32,
}

impl Machine {
    /// Create an empty machine of the given kind.
    pub fn new(spec: &MachineSpec) -> Self {
        Self {
            spec: spec.key.clone(),
            input: vec![None; spec.input_slots],
            output: vec![None; spec.output_slots],
            work_progress: 0,
        }
    }

    /// Advance the machine by one tick.
    ///
    /// Returns `true` if a work cycle completed this tick.
    pub fn update(&mut self) -> bool {
        let Some((slot, recipe)) = self.current_work() else {
            self.work_progress = 0;
            return false;
        };

        self.work_progress += 1;
        if self.work_progress < recipe.work_ticks {
            return false;
        }

        self.work_progress = 0;
        self.complete_cycle(slot, recipe);
        true
    }

    /// The input slot and recipe the machine is currently working on.
    ///
    /// The first input slot with a processable item wins; the cycle stalls
    /// if the output bank has no room for the product.
    fn current_work(&self) -> Option<(usize, &'static ProcessRecipe)> {
        for (idx, slot) in self.input.iter().enumerate() {
            let Some(stack) = slot else {
                continue;
            };
            let Some(recipe) = find_recipe(stack.kind) else {
                continue;
            };
            if self.has_room_for(recipe.output) {
                return Some((idx, recipe));
            }
        }
        None
    }

    fn has_room_for(&self, kind: ItemKind) -> bool {
        self.output.iter().any(|slot| match slot {
            None => true,
            Some(stack) => stack.kind == kind && stack.data.is_none() && stack.can_add(1),
        })
    }

    fn complete_cycle(&mut self, slot: usize, recipe: &ProcessRecipe) {
        let consumed = {
            let Some(stack) = self.input[slot].as_mut() else {
                return;
            };
            stack.count = stack.count.saturating_sub(1);
            stack.count == 0
        };
        if consumed {
            self.input[slot] = None;
        }

        // Room in the output bank was verified before the cycle started.
        let _ = insert_one_into_slots(&mut self.output, ItemStack::new(recipe.output, 1));
    }
}
