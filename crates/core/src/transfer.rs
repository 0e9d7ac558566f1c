//! Single-item slot transfer helpers.
//!
//! All movement between slot banks happens one item at a time so a failed
//! insert can always be restored to its source slot.

use crate::item::ItemStack;

/// Whether two stacks can merge into the same slot.
pub fn stacks_match_for_merge(a: &ItemStack, b: &ItemStack) -> bool {
    a.kind == b.kind && a.data == b.data
}

/// Whether one item of `stack` could be inserted into `slots`.
pub fn can_insert_one_into_slots(slots: &[Option<ItemStack>], stack: &ItemStack) -> bool {
    debug_assert_eq!(stack.count, 1);

    for existing in slots.iter().flatten() {
        if stacks_match_for_merge(existing, stack) && existing.count < existing.max_stack_size() {
            return true;
        }
    }

    slots.iter().any(|slot| slot.is_none())
}

/// Insert one item into `slots`, merging into a matching stack first.
///
/// Returns `false` if every slot is occupied by a non-matching full stack.
pub fn insert_one_into_slots(slots: &mut [Option<ItemStack>], stack: ItemStack) -> bool {
    debug_assert_eq!(stack.count, 1);

    for existing in slots.iter_mut().flatten() {
        if stacks_match_for_merge(existing, &stack) && existing.count < existing.max_stack_size() {
            existing.count = existing.count.saturating_add(1);
            return true;
        }
    }

    for slot in slots.iter_mut() {
        if slot.is_none() {
            *slot = Some(stack);
            return true;
        }
    }

    false
}

/// Take one item from the first non-empty slot accepted by `predicate`.
///
/// Returns the source slot index alongside the taken single-item stack so a
/// failed downstream insert can restore it.
pub fn take_one_from_slots_if<P>(
    slots: &mut [Option<ItemStack>],
    predicate: P,
) -> Option<(usize, ItemStack)>
where
    P: Fn(&ItemStack) -> bool,
{
    for (idx, slot) in slots.iter_mut().enumerate() {
        let Some(existing) = slot.as_mut() else {
            continue;
        };
        if existing.is_empty() || !predicate(existing) {
            continue;
        }

        let mut taken = existing.clone();
        taken.count = 1;

        existing.count = existing.count.saturating_sub(1);
        if existing.count == 0 {
            *slot = None;
        }

        return Some((idx, taken));
    }

    None
}

fn restore_one_into_slot(slots: &mut [Option<ItemStack>], idx: usize, stack: ItemStack) {
    debug_assert_eq!(stack.count, 1);

    if idx >= slots.len() {
        return;
    }

    match slots[idx].as_mut() {
        Some(existing) if stacks_match_for_merge(existing, &stack) => {
            existing.count = existing.count.saturating_add(1);
        }
        None => {
            slots[idx] = Some(stack);
        }
        Some(_) => {
            // Fallback: try to insert anywhere (should be extremely rare for
            // deterministic transfers).
            let _ = insert_one_into_slots(slots, stack);
        }
    }
}

/// Move one `predicate`-matching item from `source` to `dest`.
///
/// Returns `true` if an item moved; on a failed insert the item is restored
/// to its source slot and `false` is returned.
pub fn try_transfer_one_between_slots<P>(
    source: &mut [Option<ItemStack>],
    dest: &mut [Option<ItemStack>],
    predicate: P,
) -> bool
where
    P: Fn(&ItemStack) -> bool,
{
    let Some((source_idx, one)) = take_one_from_slots_if(source, predicate) else {
        return false;
    };

    if insert_one_into_slots(dest, one.clone()) {
        true
    } else {
        restore_one_into_slot(source, source_idx, one);
        false
    }
}
