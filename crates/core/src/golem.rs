//! Golems and the jobs they hold.
//!
//! A golem owns at most one job; a manage-machine job exclusively owns its
//! [`MachineReference`]. Replacing the job drops the old job's reference
//! with it.

use crate::filter::StackFilter;
use crate::item::ItemStack;
use crate::machine::MachineReference;
use crate::GolemId;
use serde::{Deserialize, Serialize};

/// Default number of carry slots on a golem.
pub const DEFAULT_CARRY_SLOTS: usize = 4;

/// Default ticks between work attempts for a manage-machine job.
pub const DEFAULT_WORK_INTERVAL: u32 = 8;

/// Discriminator for job kinds, used in snapshots and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Tending a linked machine.
    ManageMachine,
}

impl JobKind {
    /// Canonical string key used in configs/logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageMachine => "manage_machine",
        }
    }
}

/// A behavior assignment held by a golem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Job {
    /// Tend a linked machine: feed its input bank, clear its output bank.
    ManageMachine(ManageMachineJob),
}

impl Job {
    /// The kind discriminator for this job.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::ManageMachine(_) => JobKind::ManageMachine,
        }
    }

    /// Downcast to a manage-machine job.
    pub fn as_manage_machine(&self) -> Option<&ManageMachineJob> {
        match self {
            Self::ManageMachine(job) => Some(job),
        }
    }

    /// Mutable downcast to a manage-machine job.
    pub fn as_manage_machine_mut(&mut self) -> Option<&mut ManageMachineJob> {
        match self {
            Self::ManageMachine(job) => Some(job),
        }
    }
}

/// Job state for tending a linked machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManageMachineJob {
    /// Link to the tended machine. Created only by authoritative linking.
    pub machine: Option<MachineReference>,
    /// Restricts which carried items are fed into the machine.
    pub filter: Option<StackFilter>,
    /// Ticks between work attempts.
    pub work_interval: u32,
    /// Ticks until the next work attempt.
    pub cooldown: u32,
}

impl ManageMachineJob {
    /// Create an unlinked job with the default work interval.
    pub fn new() -> Self {
        Self {
            machine: None,
            filter: None,
            work_interval: DEFAULT_WORK_INTERVAL,
            cooldown: 0,
        }
    }
}

impl Default for ManageMachineJob {
    fn default() -> Self {
        Self::new()
    }
}

/// Full-state view of a golem, embedded in a bound control sigil.
///
/// Rebuilt wholesale from [`Golem::snapshot`] on every resynchronization;
/// never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GolemSnapshot {
    /// The golem's display name.
    pub name: String,
    /// Kind of the golem's current job, if any.
    pub job_kind: Option<JobKind>,
    /// The managed machine link, if the current job holds one.
    pub managed_machine: Option<MachineReference>,
}

/// A mobile agent capable of holding a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Golem {
    /// Stable identifier.
    pub id: GolemId,
    /// Display name.
    pub name: String,
    /// The golem's current job, if any.
    pub job: Option<Job>,
    /// Small item buffer used while tending machines.
    pub carrying: Vec<Option<ItemStack>>,
}

impl Golem {
    /// Create an idle golem with the default carry buffer.
    pub fn new(id: GolemId, name: impl Into<String>) -> Self {
        Self::with_carry_slots(id, name, DEFAULT_CARRY_SLOTS)
    }

    /// Create an idle golem with an explicit carry buffer size.
    pub fn with_carry_slots(id: GolemId, name: impl Into<String>, slots: usize) -> Self {
        Self {
            id,
            name: name.into(),
            job: None,
            carrying: vec![None; slots],
        }
    }

    /// The manage-machine job, if that is the golem's current job.
    pub fn manage_machine_job(&self) -> Option<&ManageMachineJob> {
        self.job.as_ref().and_then(Job::as_manage_machine)
    }

    /// Mutable access to the manage-machine job, if current.
    pub fn manage_machine_job_mut(&mut self) -> Option<&mut ManageMachineJob> {
        self.job.as_mut().and_then(Job::as_manage_machine_mut)
    }

    /// Build the full-state view embedded in a bound control sigil.
    pub fn snapshot(&self) -> GolemSnapshot {
        GolemSnapshot {
            name: self.name.clone(),
            job_kind: self.job.as_ref().map(Job::kind),
            managed_machine: self
                .manage_machine_job()
                .and_then(|job| job.machine.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachinePos;
    use crate::registry::RegistryKey;
    use crate::DimensionId;

    #[test]
    fn snapshot_of_idle_golem() {
        let golem = Golem::new(GolemId(1), "Clay");
        let snapshot = golem.snapshot();
        assert_eq!(snapshot.name, "Clay");
        assert!(snapshot.job_kind.is_none());
        assert!(snapshot.managed_machine.is_none());
    }

    #[test]
    fn snapshot_carries_machine_link() {
        let mut golem = Golem::new(GolemId(2), "Flint");
        let mut job = ManageMachineJob::new();
        job.machine = Some(MachineReference::linked(
            MachinePos::new(DimensionId::Overworld, 1, 2, 3),
            RegistryKey::parse("gw:smelter").unwrap(),
        ));
        golem.job = Some(Job::ManageMachine(job));

        let snapshot = golem.snapshot();
        assert_eq!(snapshot.job_kind, Some(JobKind::ManageMachine));
        let machine = snapshot.managed_machine.unwrap();
        assert_eq!(machine.pos, MachinePos::new(DimensionId::Overworld, 1, 2, 3));
    }

    #[test]
    fn replacing_job_drops_old_reference() {
        let mut golem = Golem::new(GolemId(3), "Basalt");
        let mut job = ManageMachineJob::new();
        job.machine = Some(MachineReference::linked(
            MachinePos::new(DimensionId::Overworld, 0, 0, 0),
            RegistryKey::parse("gw:crusher").unwrap(),
        ));
        golem.job = Some(Job::ManageMachine(job));
        assert!(golem.snapshot().managed_machine.is_some());

        golem.job = Some(Job::ManageMachine(ManageMachineJob::new()));
        assert!(golem.snapshot().managed_machine.is_none());
    }
}
