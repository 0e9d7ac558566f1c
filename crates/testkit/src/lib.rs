#![warn(missing_docs)]
//! Deterministic testing surfaces: scenario fixtures and an event sink.

use anyhow::Result;
use golemworks_core::{
    Golem, GolemBinding, GolemId, ItemStack, Job, MachinePos, MachineReference, ManageMachineJob,
    RegistryKey, SimTick,
};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Primary event record captured by headless tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Free-form payload for smoke tests.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// A golem holding a manage-machine job linked to the machine at `pos`.
pub fn managed_golem(id: GolemId, name: &str, pos: MachinePos, kind: RegistryKey) -> Golem {
    let mut golem = Golem::new(id, name);
    let mut job = ManageMachineJob::new();
    job.machine = Some(MachineReference::linked(pos, kind));
    golem.job = Some(Job::ManageMachine(job));
    golem
}

/// A golem holding an unlinked manage-machine job.
pub fn unlinked_golem(id: GolemId, name: &str) -> Golem {
    let mut golem = Golem::new(id, name);
    golem.job = Some(Job::ManageMachine(ManageMachineJob::new()));
    golem
}

/// A control sigil bound to `golem`, carrying its current snapshot.
pub fn bound_sigil(golem: &Golem) -> ItemStack {
    ItemStack::control_sigil(GolemBinding {
        golem: golem.id,
        snapshot: golem.snapshot(),
    })
}
