//! # lp_types
//!
//! Shared types for the loadpark affinity watcher

use std::fmt;

/// Lifecycle phase of the watched game, owned by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Normal gameplay, resting allotment applies
    #[default]
    Resting,
    /// Asset loading in progress, loading allotment applies
    Loading,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Resting => write!(f, "resting"),
            Phase::Loading => write!(f, "loading"),
        }
    }
}

/// Classification result for a single log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    GameStart,
    LoadStart,
    LoadEnd,
    None,
}

impl LifecycleEvent {
    /// Phase this event moves the coordinator into, if any
    #[inline]
    pub fn target_phase(self) -> Option<Phase> {
        match self {
            LifecycleEvent::GameStart | LifecycleEvent::LoadStart => Some(Phase::Loading),
            LifecycleEvent::LoadEnd => Some(Phase::Resting),
            LifecycleEvent::None => None,
        }
    }
}

/// Logical core counts established once at startup
///
/// `usable_cores` is the largest count that could actually be applied as an
/// affinity mask, which may be lower than what the OS reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreTopology {
    total_cores: usize,
    usable_cores: usize,
}

impl CoreTopology {
    /// Returns `None` unless `1 <= usable_cores <= total_cores`
    pub fn new(total_cores: usize, usable_cores: usize) -> Option<Self> {
        if usable_cores == 0 || usable_cores > total_cores {
            return None;
        }
        Some(Self { total_cores, usable_cores })
    }

    #[inline(always)]
    pub fn total_cores(&self) -> usize {
        self.total_cores
    }

    #[inline(always)]
    pub fn usable_cores(&self) -> usize {
        self.usable_cores
    }
}

/// Sorted, de-duplicated set of logical core indices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CoreMask {
    cores: Vec<usize>,
}

impl CoreMask {
    pub fn new(cores: impl IntoIterator<Item = usize>) -> Self {
        let mut cores: Vec<usize> = cores.into_iter().collect();
        cores.sort_unstable();
        cores.dedup();
        Self { cores }
    }

    /// Mask covering the contiguous range `first..first + count`
    pub fn contiguous(first: usize, count: usize) -> Self {
        Self { cores: (first..first + count).collect() }
    }

    #[inline]
    pub fn cores(&self) -> &[usize] {
        &self.cores
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Legacy single-group bitmask, `None` if any core index does not fit in a `u64`
    pub fn to_bitmask(&self) -> Option<u64> {
        self.cores.iter().try_fold(0u64, |mask, &core| if core < 64 { Some(mask | (1u64 << core)) } else { None })
    }
}

impl fmt::Display for CoreMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.cores)
    }
}

/// Non-owning reference to a running process
///
/// The OS owns the process; a `ProcessRef` may go stale at any moment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessRef {
    pub pid: u32,
    pub name: String,
}

impl fmt::Display for ProcessRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (pid {})", self.name, self.pid)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_default_phase_is_resting() {
        assert_eq!(Phase::default(), Phase::Resting);
    }

    #[test]
    fn test_event_target_phase() {
        assert_eq!(LifecycleEvent::GameStart.target_phase(), Some(Phase::Loading));
        assert_eq!(LifecycleEvent::LoadStart.target_phase(), Some(Phase::Loading));
        assert_eq!(LifecycleEvent::LoadEnd.target_phase(), Some(Phase::Resting));
        assert_eq!(LifecycleEvent::None.target_phase(), None);
    }

    #[test]
    fn test_topology_invariant() {
        assert!(CoreTopology::new(8, 0).is_none());
        assert!(CoreTopology::new(8, 9).is_none());
        assert!(CoreTopology::new(0, 0).is_none());

        let topology = CoreTopology::new(16, 12).unwrap();
        assert_eq!(topology.total_cores(), 16);
        assert_eq!(topology.usable_cores(), 12);
    }

    #[test]
    fn test_mask_sorted_and_deduped() {
        let mask = CoreMask::new([3, 1, 3, 0]);
        assert_eq!(mask.cores(), &[0, 1, 3]);
        assert_eq!(mask.to_string(), "[0, 1, 3]");
    }

    #[test]
    fn test_bitmask() {
        assert_eq!(CoreMask::contiguous(0, 4).to_bitmask(), Some(0b1111));
        assert_eq!(CoreMask::contiguous(4, 2).to_bitmask(), Some(0b11_0000));
        assert_eq!(CoreMask::contiguous(63, 1).to_bitmask(), Some(1u64 << 63));
        assert_eq!(CoreMask::contiguous(60, 8).to_bitmask(), None);
    }

    proptest! {
        #[test]
        fn prop_contiguous_bitmask_popcount(first in 0usize..32, count in 1usize..32) {
            let mask = CoreMask::contiguous(first, count);
            let bits = mask.to_bitmask().unwrap();
            prop_assert_eq!(bits.count_ones() as usize, count);
            prop_assert_eq!(bits.trailing_zeros() as usize, first);
        }
    }
}
