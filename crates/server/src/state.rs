//! Authoritative world state and the machine-patch application path.
//!
//! All mutation happens on the server's sequential tick-processing stream;
//! there is exactly one writer per tick, so no locking is needed. Clients
//! hold read-only display copies that are overwritten wholesale by
//! [`ServerMessage::HeldItemSync`], never merged.

use golemworks_core::{
    transfer::try_transfer_one_between_slots, Golem, GolemId, ItemKind, ItemStack, Machine,
    MachineCatalog, MachinePos, MachineReference, PlayerId, RegistryKey, SimTick,
};
use golemworks_net::{ClientMessage, ServerMessage};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::{debug, warn};

/// Number of hotbar slots tracked per player.
pub const HOTBAR_SLOTS: usize = golemworks_net::MAX_HOTBAR_SLOTS as usize;

/// Error returned by authoritative link management.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The golem does not exist.
    #[error("no golem with id {0}")]
    UnknownGolem(u64),
    /// No machine is placed at the target position.
    #[error("no machine at {0}")]
    UnknownMachine(MachinePos),
    /// The machine's kind is missing from the catalog.
    #[error("machine kind {0} is not registered")]
    UnregisteredKind(RegistryKey),
    /// The golem's current job cannot hold a machine link.
    #[error("golem has no manage-machine job")]
    WrongJobKind,
}

/// An open interaction surface for a player's bound sigil.
#[derive(Debug, Clone, Default)]
pub struct MenuSession {
    revision: u64,
}

impl MenuSession {
    /// Open a fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record that the displayed state changed; returns the new revision.
    pub fn broadcast_changes(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Server-side view of a connected player.
#[derive(Debug, Clone)]
pub struct PlayerState {
    hotbar: Vec<Option<ItemStack>>,
    selected_slot: usize,
    open_menu: Option<MenuSession>,
}

impl PlayerState {
    /// Create a player with an empty hotbar and no open menu.
    pub fn new() -> Self {
        Self {
            hotbar: vec![None; HOTBAR_SLOTS],
            selected_slot: 0,
            open_menu: None,
        }
    }

    /// The stack in the player's main hand, if any.
    pub fn main_hand(&self) -> Option<&ItemStack> {
        self.hotbar[self.selected_slot].as_ref()
    }

    /// Mutable access to the main-hand stack, if any.
    pub fn main_hand_mut(&mut self) -> Option<&mut ItemStack> {
        self.hotbar[self.selected_slot].as_mut()
    }

    /// Replace the main-hand stack.
    pub fn set_main_hand(&mut self, stack: Option<ItemStack>) {
        self.hotbar[self.selected_slot] = stack;
    }

    /// Switch the selected hotbar slot. Out-of-range indexes are ignored.
    pub fn select_slot(&mut self, slot: usize) {
        if slot < self.hotbar.len() {
            self.selected_slot = slot;
        }
    }

    /// Index of the selected hotbar slot.
    pub fn selected_slot(&self) -> usize {
        self.selected_slot
    }

    /// The open interaction surface, if any.
    pub fn open_menu(&self) -> Option<&MenuSession> {
        self.open_menu.as_ref()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

/// The canonical, trusted copy of world and agent state.
pub struct AuthorityState {
    catalog: MachineCatalog,
    machines: BTreeMap<MachinePos, Machine>,
    golems: BTreeMap<GolemId, Golem>,
    players: BTreeMap<PlayerId, PlayerState>,
    outbound: VecDeque<(PlayerId, ServerMessage)>,
}

impl AuthorityState {
    /// Create an empty state over the given machine catalog.
    pub fn new(catalog: MachineCatalog) -> Self {
        Self {
            catalog,
            machines: BTreeMap::new(),
            golems: BTreeMap::new(),
            players: BTreeMap::new(),
            outbound: VecDeque::new(),
        }
    }

    /// The machine catalog in use.
    pub fn catalog(&self) -> &MachineCatalog {
        &self.catalog
    }

    /// Register a connected player.
    pub fn add_player(&mut self, id: PlayerId) -> &mut PlayerState {
        self.players.entry(id).or_default()
    }

    /// Remove a player, dropping any open menu session.
    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.remove(&id);
    }

    /// Spawn a golem into the world.
    pub fn add_golem(&mut self, golem: Golem) {
        self.golems.insert(golem.id, golem);
    }

    /// Place a machine of a registered kind at `pos`.
    pub fn place_machine(&mut self, pos: MachinePos, kind: &RegistryKey) -> Result<(), LinkError> {
        let Some(spec) = self.catalog.get(kind) else {
            return Err(LinkError::UnregisteredKind(kind.clone()));
        };
        self.machines.insert(pos, Machine::new(spec));
        Ok(())
    }

    /// Read access to a placed machine.
    pub fn machine(&self, pos: &MachinePos) -> Option<&Machine> {
        self.machines.get(pos)
    }

    /// Mutable access to a placed machine.
    pub fn machine_mut(&mut self, pos: &MachinePos) -> Option<&mut Machine> {
        self.machines.get_mut(pos)
    }

    /// Read access to a golem.
    pub fn golem(&self, id: GolemId) -> Option<&Golem> {
        self.golems.get(&id)
    }

    /// Mutable access to a golem.
    pub fn golem_mut(&mut self, id: GolemId) -> Option<&mut Golem> {
        self.golems.get_mut(&id)
    }

    /// Read access to a player.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    /// Mutable access to a player.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(&id)
    }

    /// Take every queued outbound message, in queue order.
    pub fn take_outbound(&mut self) -> Vec<(PlayerId, ServerMessage)> {
        self.outbound.drain(..).collect()
    }

    /// Authoritatively link a golem's manage-machine job to the machine at
    /// `pos`.
    ///
    /// This is the only path that creates a [`MachineReference`]; the patch
    /// channel can edit an existing link but never create one.
    pub fn link_machine(&mut self, golem_id: GolemId, pos: MachinePos) -> Result<(), LinkError> {
        let Some(machine) = self.machines.get(&pos) else {
            return Err(LinkError::UnknownMachine(pos));
        };
        let kind = machine.spec.clone();
        if !self.catalog.contains(&kind) {
            return Err(LinkError::UnregisteredKind(kind));
        }

        let Some(golem) = self.golems.get_mut(&golem_id) else {
            return Err(LinkError::UnknownGolem(golem_id.0));
        };
        let Some(job) = golem.manage_machine_job_mut() else {
            return Err(LinkError::WrongJobKind);
        };

        job.machine = Some(MachineReference::linked(pos, kind));
        Ok(())
    }

    /// Destroy a golem's machine link, if it has one.
    pub fn clear_link(&mut self, golem_id: GolemId) -> Result<(), LinkError> {
        let Some(golem) = self.golems.get_mut(&golem_id) else {
            return Err(LinkError::UnknownGolem(golem_id.0));
        };
        let Some(job) = golem.manage_machine_job_mut() else {
            return Err(LinkError::WrongJobKind);
        };
        job.machine = None;
        Ok(())
    }

    /// Apply a holder-submitted machine patch.
    ///
    /// The submitting player must be holding a control sigil whose binding
    /// resolves to a golem whose current job is the manage-machine kind and
    /// already holds a link. Only the display/orientation fields of the
    /// patch are honored; its identifier fields are ignored.
    ///
    /// A failed precondition drops the patch silently: a stale or
    /// speculative submission is a benign no-op, not a fault. Failure can
    /// only happen before any field is written, so the three fields change
    /// together or not at all. On success the held sigil is resynchronized
    /// after the mutation, and the open menu (if any) is notified last.
    pub fn set_managed_machine(&mut self, player_id: PlayerId, patch: MachineReference) {
        let Some(player) = self.players.get(&player_id) else {
            debug!(player = player_id.0, "dropping machine patch: unknown player");
            return;
        };
        let Some(stack) = player.main_hand() else {
            debug!(player = player_id.0, "dropping machine patch: empty hand");
            return;
        };
        if stack.kind != ItemKind::ControlSigil {
            debug!(player = player_id.0, "dropping machine patch: not holding a sigil");
            return;
        }
        let Some(binding) = stack.golem_binding() else {
            debug!(player = player_id.0, "dropping machine patch: unbound sigil");
            return;
        };
        let golem_id = binding.golem;

        let Some(golem) = self.golems.get_mut(&golem_id) else {
            debug!(golem = golem_id.0, "dropping machine patch: golem is gone");
            return;
        };
        let Some(job) = golem.manage_machine_job_mut() else {
            debug!(golem = golem_id.0, "dropping machine patch: wrong job kind");
            return;
        };
        let Some(reference) = job.machine.as_mut() else {
            debug!(golem = golem_id.0, "dropping machine patch: no linked machine");
            return;
        };

        // Only the holder-trusted fields are written; linking a machine
        // requires the authoritative path above.
        reference.apply_patch(&patch);

        self.sync_bound_item(player_id);
        self.notify_open_menu(player_id);
    }

    /// Rebuild the held sigil's persisted snapshot from the bound golem's
    /// current state and queue a full-overwrite sync to the holder.
    pub fn sync_bound_item(&mut self, player_id: PlayerId) {
        let (slot, golem_id) = {
            let Some(player) = self.players.get(&player_id) else {
                return;
            };
            let Some(stack) = player.main_hand() else {
                return;
            };
            let Some(binding) = stack.golem_binding() else {
                return;
            };
            (player.selected_slot, binding.golem)
        };

        let Some(snapshot) = self.golems.get(&golem_id).map(Golem::snapshot) else {
            return;
        };

        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        if let Some(binding) = player.main_hand_mut().and_then(ItemStack::golem_binding_mut) {
            binding.snapshot = snapshot;
        }

        let stack = player.main_hand().cloned();
        self.outbound.push_back((
            player_id,
            ServerMessage::HeldItemSync {
                slot: slot as u8,
                stack,
            },
        ));
    }

    /// Open the player's sigil interaction surface.
    pub fn open_menu(&mut self, player_id: PlayerId) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.open_menu = Some(MenuSession::new());
        }
    }

    /// Close the player's sigil interaction surface.
    pub fn close_menu(&mut self, player_id: PlayerId) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.open_menu = None;
        }
    }

    fn notify_open_menu(&mut self, player_id: PlayerId) {
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        let Some(menu) = player.open_menu.as_mut() else {
            return;
        };
        let revision = menu.broadcast_changes();
        self.outbound
            .push_back((player_id, ServerMessage::MenuChanged { revision }));
    }

    /// Dispatch a verified client message to the matching state operation.
    pub fn handle_message(&mut self, player_id: PlayerId, msg: ClientMessage) {
        match msg {
            ClientMessage::SetManagedMachine(patch) => {
                self.set_managed_machine(player_id, patch);
            }
            ClientMessage::OpenMenu => self.open_menu(player_id),
            ClientMessage::CloseMenu => self.close_menu(player_id),
            ClientMessage::Disconnect { reason } => {
                debug!(player = player_id.0, reason = %reason, "player disconnected");
                self.remove_player(player_id);
            }
            ClientMessage::Handshake { .. } => {
                warn!(
                    player = player_id.0,
                    "handshake received after connection setup"
                );
            }
        }
    }

    /// Run one simulation step: machines first, then golem work.
    pub fn tick(&mut self, _tick: SimTick) {
        for machine in self.machines.values_mut() {
            machine.update();
        }
        self.tick_golems();
    }

    /// Golem work: one transfer attempt per elapsed work interval.
    ///
    /// Feeding the machine takes priority over clearing its output bank.
    /// Iteration is in golem id order for determinism.
    fn tick_golems(&mut self) {
        let ids: Vec<GolemId> = self.golems.keys().copied().collect();
        for id in ids {
            let Some(golem) = self.golems.get_mut(&id) else {
                continue;
            };

            let (pos, filter, interval) = {
                let Some(job) = golem.manage_machine_job_mut() else {
                    continue;
                };
                let Some(reference) = job.machine.as_ref() else {
                    continue;
                };
                if job.cooldown > 0 {
                    job.cooldown -= 1;
                    continue;
                }
                (reference.pos, job.filter.clone(), job.work_interval)
            };

            let Some(machine) = self.machines.get_mut(&pos) else {
                // Linked machine was removed from the world; the link stays
                // until cleared authoritatively, the golem just idles.
                continue;
            };

            let mut moved = try_transfer_one_between_slots(
                &mut golem.carrying,
                &mut machine.input,
                |stack| filter.as_ref().map_or(true, |f| f.matches(stack)),
            );
            if !moved {
                moved =
                    try_transfer_one_between_slots(&mut machine.output, &mut golem.carrying, |_| {
                        true
                    });
            }

            if moved {
                if let Some(job) = golem.manage_machine_job_mut() {
                    job.cooldown = interval;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golemworks_core::{
        DimensionId, GolemBinding, Job, JobKind, ManageMachineJob, StackFilter,
    };

    fn catalog_key(path: &str) -> RegistryKey {
        RegistryKey::parse(path).unwrap()
    }

    fn state_with_machine(pos: MachinePos) -> AuthorityState {
        let mut state = AuthorityState::new(MachineCatalog::with_defaults());
        state.place_machine(pos, &catalog_key("gw:smelter")).unwrap();
        state
    }

    fn managed_golem(id: GolemId) -> Golem {
        let mut golem = Golem::new(id, "Clay");
        golem.job = Some(Job::ManageMachine(ManageMachineJob::new()));
        golem
    }

    #[test]
    fn link_requires_existing_machine() {
        let pos = MachinePos::new(DimensionId::Overworld, 1, 2, 3);
        let mut state = state_with_machine(pos);
        state.add_golem(managed_golem(GolemId(1)));

        let missing = MachinePos::new(DimensionId::Overworld, 9, 9, 9);
        assert_eq!(
            state.link_machine(GolemId(1), missing),
            Err(LinkError::UnknownMachine(missing))
        );

        assert_eq!(state.link_machine(GolemId(1), pos), Ok(()));
        let link = state
            .golem(GolemId(1))
            .unwrap()
            .manage_machine_job()
            .unwrap()
            .machine
            .clone()
            .unwrap();
        assert_eq!(link.pos, pos);
        assert_eq!(link.kind, catalog_key("gw:smelter"));
    }

    #[test]
    fn link_requires_manage_machine_job() {
        let pos = MachinePos::new(DimensionId::Overworld, 0, 0, 0);
        let mut state = state_with_machine(pos);
        state.add_golem(Golem::new(GolemId(2), "Idle"));

        assert_eq!(
            state.link_machine(GolemId(2), pos),
            Err(LinkError::WrongJobKind)
        );
    }

    #[test]
    fn clear_link_destroys_reference() {
        let pos = MachinePos::new(DimensionId::Overworld, 0, 0, 0);
        let mut state = state_with_machine(pos);
        state.add_golem(managed_golem(GolemId(3)));
        state.link_machine(GolemId(3), pos).unwrap();

        state.clear_link(GolemId(3)).unwrap();
        assert!(state
            .golem(GolemId(3))
            .unwrap()
            .manage_machine_job()
            .unwrap()
            .machine
            .is_none());
    }

    #[test]
    fn golem_feeds_and_clears_machine() {
        let pos = MachinePos::new(DimensionId::Overworld, 4, 60, 4);
        let mut state = state_with_machine(pos);
        let mut golem = managed_golem(GolemId(1));
        golem.carrying[0] = Some(ItemStack::new(ItemKind::IronOre, 1));
        state.add_golem(golem);
        state.link_machine(GolemId(1), pos).unwrap();

        // First work attempt feeds the input bank.
        state.tick(SimTick::ZERO);
        assert!(state.golem(GolemId(1)).unwrap().carrying[0].is_none());
        let input = state.machine(&pos).unwrap().input[0].clone().unwrap();
        assert_eq!(input.kind, ItemKind::IronOre);

        // Run until the ore is processed and the golem collects the ingot.
        for tick in 1..400 {
            state.tick(SimTick(tick));
        }
        let carried = state.golem(GolemId(1)).unwrap().carrying[0]
            .clone()
            .unwrap();
        assert_eq!(carried.kind, ItemKind::IronIngot);
        assert!(state.machine(&pos).unwrap().output[0].is_none());
    }

    #[test]
    fn golem_respects_filter() {
        let pos = MachinePos::new(DimensionId::Overworld, 4, 60, 4);
        let mut state = state_with_machine(pos);
        let mut golem = managed_golem(GolemId(1));
        golem.carrying[0] = Some(ItemStack::new(ItemKind::Stone, 8));
        if let Some(job) = golem.manage_machine_job_mut() {
            job.filter = Some(StackFilter::new(ItemStack::new(ItemKind::IronOre, 1)));
        }
        state.add_golem(golem);
        state.link_machine(GolemId(1), pos).unwrap();

        for tick in 0..40 {
            state.tick(SimTick(tick));
        }
        // Stone fails the filter and stays in the carry buffer.
        assert_eq!(
            state.golem(GolemId(1)).unwrap().carrying[0]
                .as_ref()
                .unwrap()
                .count,
            8
        );
        assert!(state.machine(&pos).unwrap().input[0].is_none());
    }

    #[test]
    fn menu_session_revision_increases() {
        let mut state = AuthorityState::new(MachineCatalog::with_defaults());
        state.add_player(PlayerId(1));
        state.open_menu(PlayerId(1));
        assert_eq!(state.player(PlayerId(1)).unwrap().open_menu().unwrap().revision(), 0);

        state.sync_bound_item(PlayerId(1)); // no sigil, queues nothing
        assert!(state.take_outbound().is_empty());

        state.notify_open_menu(PlayerId(1));
        let outbound = state.take_outbound();
        assert_eq!(outbound.len(), 1);
        assert!(matches!(
            outbound[0].1,
            ServerMessage::MenuChanged { revision: 1 }
        ));
    }

    #[test]
    fn snapshot_binding_helpers() {
        let mut state = AuthorityState::new(MachineCatalog::with_defaults());
        let golem = managed_golem(GolemId(5));
        let binding = GolemBinding {
            golem: golem.id,
            snapshot: golem.snapshot(),
        };
        state.add_golem(golem);
        state
            .add_player(PlayerId(1))
            .set_main_hand(Some(ItemStack::control_sigil(binding)));

        state.sync_bound_item(PlayerId(1));
        let outbound = state.take_outbound();
        assert_eq!(outbound.len(), 1);
        match &outbound[0].1 {
            ServerMessage::HeldItemSync { slot, stack } => {
                assert_eq!(*slot, 0);
                let binding = stack.as_ref().unwrap().golem_binding().unwrap();
                assert_eq!(binding.snapshot.job_kind, Some(JobKind::ManageMachine));
            }
            other => panic!("expected held item sync, got {other:?}"),
        }
    }
}
