use lp_types::CoreMask;
use lp_types::CoreTopology;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::errors::TopologyError;
use crate::platform::AffinityBackend;

/// Establish how many logical cores exist and how many can actually be assigned
///
/// The OS-reported count is probed by applying `{0..n}` to the current process,
/// shrinking `n` until a mask is accepted. Restricted environments (containers,
/// cgroup limits) may accept fewer cores than they report.
pub fn detect<B: AffinityBackend>(backend: &B) -> Result<CoreTopology, TopologyError> {
    detect_with_total(num_cpus::get(), backend)
}

/// [`detect`] with an explicit OS-reported core count
pub fn detect_with_total<B: AffinityBackend>(total: usize, backend: &B) -> Result<CoreTopology, TopologyError> {
    if total == 0 {
        error!("Cannot detect CPU cores");
        return Err(TopologyError::NoCores);
    }

    for count in (1..=total).rev() {
        match backend.set_current(&CoreMask::contiguous(0, count)) {
            Ok(()) => {
                let topology = CoreTopology::new(total, count).ok_or(TopologyError::NoCores)?;
                if count < total {
                    warn!("Only {count} of {total} reported processors accept an affinity mask");
                }
                info!("Detected {count} processors");
                return Ok(topology);
            }
            Err(err) => debug!("Affinity probe with {count} cores failed: {err}"),
        }
    }

    error!("Cannot finalize CPU core detection");
    Err(TopologyError::NoAssignableCores { total })
}
