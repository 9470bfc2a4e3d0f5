use lp_types::CoreMask;
use lp_types::CoreTopology;
use lp_types::Phase;
use tracing::debug;
use tracing::info;

use crate::errors::AffinityError;
use crate::errors::Result;
use crate::errors::SetAffinityError;
use crate::platform::AffinityBackend;
use crate::policy::AffinityPolicy;
use crate::process::ProcessLocator;

/// Result of a successful [`AffinityController::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The mask was written to the process
    Applied(CoreMask),
    /// The process already had this mask from a previous call, nothing was written
    Unchanged(CoreMask),
}

impl ApplyOutcome {
    pub fn mask(&self) -> &CoreMask {
        match self {
            ApplyOutcome::Applied(mask) | ApplyOutcome::Unchanged(mask) => mask,
        }
    }
}

/// Applies phase masks to the game process
///
/// The process is looked up again on every call, so a restarted game is picked
/// up by the next event. Failures are reported to the caller and never retried
/// here.
pub struct AffinityController<L, B> {
    locator: L,
    backend: B,
    policy: AffinityPolicy,
    topology: CoreTopology,
    process_names: Vec<String>,
    /// Last mask written and the pid it was written to
    applied: Option<(u32, CoreMask)>,
}

impl<L: ProcessLocator, B: AffinityBackend> AffinityController<L, B> {
    pub fn new(locator: L, backend: B, policy: AffinityPolicy, topology: CoreTopology, process_names: Vec<String>) -> Self {
        Self { locator, backend, policy, topology, process_names, applied: None }
    }

    pub fn mask_for(&self, phase: Phase) -> CoreMask {
        self.policy.mask(phase, &self.topology)
    }

    /// Restrict the game process to the mask for `phase`
    pub fn apply(&mut self, phase: Phase) -> Result<ApplyOutcome> {
        let mask = self.mask_for(phase);

        let Some(process) = self.locator.locate(&self.process_names) else {
            self.applied = None;
            return Err(AffinityError::ProcessNotFound { names: self.process_names.clone() });
        };

        if let Some((pid, applied)) = &self.applied
            && *pid == process.pid
            && *applied == mask
        {
            debug!("{process} already restricted to {mask}, skipping {phase} apply");
            return Ok(ApplyOutcome::Unchanged(mask));
        }

        match self.backend.set_process(process.pid, &mask) {
            Ok(()) => {
                info!("Applied {phase} affinity {mask} to {process}");
                self.applied = Some((process.pid, mask.clone()));
                Ok(ApplyOutcome::Applied(mask))
            }
            Err(SetAffinityError::NoSuchProcess) => {
                self.applied = None;
                Err(AffinityError::ProcessNotFound { names: self.process_names.clone() })
            }
            Err(SetAffinityError::Rejected(source)) => {
                self.applied = None;
                Err(AffinityError::AffinityRejected { pid: process.pid, mask, source })
            }
        }
    }
}
