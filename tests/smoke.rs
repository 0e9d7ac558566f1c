//! Workspace smoke test: a full patch cycle through the server harness.

use golemworks_core::{
    DimensionId, Direction, GolemId, MachineCatalog, MachinePos, MachineReference, PlayerId,
    RegistryKey,
};
use golemworks_server::Server;
use golemworks_testkit::{bound_sigil, managed_golem};

#[test]
fn patch_cycle_through_server_harness() {
    let catalog = MachineCatalog::with_defaults();
    let kind = RegistryKey::parse("gw:smelter").unwrap();
    let pos = MachinePos::new(DimensionId::Overworld, 8, 64, 8);

    let mut server = Server::new(catalog);
    server.state_mut().place_machine(pos, &kind).unwrap();

    let golem = managed_golem(GolemId(1), "Clay", pos, kind.clone());
    let sigil = bound_sigil(&golem);
    server.state_mut().add_golem(golem);
    server
        .state_mut()
        .add_player(PlayerId(1))
        .set_main_hand(Some(sigil));

    // A few idle ticks before the patch arrives.
    for _ in 0..3 {
        server.tick().unwrap();
    }

    let mut patch = MachineReference::linked(pos, kind.clone());
    patch.custom_name = Some("Smeltery".to_string());
    patch.extract_facing = Direction::East;
    server.state_mut().set_managed_machine(PlayerId(1), patch);

    let link = server
        .state()
        .golem(GolemId(1))
        .unwrap()
        .manage_machine_job()
        .unwrap()
        .machine
        .clone()
        .unwrap();
    assert_eq!(link.pos, pos);
    assert_eq!(link.kind, kind);
    assert_eq!(link.custom_name.as_deref(), Some("Smeltery"));
    assert_eq!(link.extract_facing, Direction::East);

    // The holder's copy was overwritten from authoritative state.
    let outbound = server.state_mut().take_outbound();
    assert_eq!(outbound.len(), 1);

    server.tick().unwrap();
}
