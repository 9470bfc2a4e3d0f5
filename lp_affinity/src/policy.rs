use lp_types::CoreMask;
use lp_types::CoreTopology;
use lp_types::Phase;
use serde::Deserialize;
use serde::Serialize;

/// How many of the usable cores a phase gets
///
/// Every variant resolves to a count in `[1, usable_cores]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum CoreAllotment {
    /// Every usable core
    All,
    /// Percentage of usable cores, rounded down
    Percent(u8),
    /// Fixed number of cores
    Count(usize),
    /// Usable cores minus this many parked cores
    Reserve(usize),
}

impl CoreAllotment {
    pub fn core_count(self, usable_cores: usize) -> usize {
        let usable = usable_cores.max(1);
        let count = match self {
            CoreAllotment::All => usable,
            CoreAllotment::Percent(percent) => usable * usize::from(percent.min(100)) / 100,
            CoreAllotment::Count(count) => count,
            CoreAllotment::Reserve(parked) => usable.saturating_sub(parked),
        };
        count.clamp(1, usable)
    }
}

/// Which end of the core range gets parked when a phase uses fewer cores
///
/// CPUs with asymmetric caches benefit from keeping specific physical cores,
/// so this is a deployment choice rather than a fixed rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkSide {
    /// Keep cores from 0 upward, park the highest-numbered ones
    #[default]
    Trailing,
    /// Keep the highest-numbered cores, park from core 0 upward
    Leading,
}

/// Pure mapping from [`Phase`] to the mask applied to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinityPolicy {
    pub resting: CoreAllotment,
    pub loading: CoreAllotment,
    pub park_side: ParkSide,
}

impl Default for AffinityPolicy {
    fn default() -> Self {
        Self {
            resting: CoreAllotment::Percent(DEFAULT_RESTING_PERCENT),
            loading: CoreAllotment::All,
            park_side: ParkSide::Trailing,
        }
    }
}

/// Resting share of usable cores when nothing else is configured
pub const DEFAULT_RESTING_PERCENT: u8 = 80;

impl AffinityPolicy {
    #[inline]
    pub fn allotment(&self, phase: Phase) -> CoreAllotment {
        match phase {
            Phase::Resting => self.resting,
            Phase::Loading => self.loading,
        }
    }

    #[inline]
    pub fn core_count(&self, phase: Phase, usable_cores: usize) -> usize {
        self.allotment(phase).core_count(usable_cores)
    }

    pub fn mask(&self, phase: Phase, topology: &CoreTopology) -> CoreMask {
        let usable = topology.usable_cores();
        let count = self.core_count(phase, usable);

        match self.park_side {
            ParkSide::Trailing => CoreMask::contiguous(0, count),
            ParkSide::Leading => CoreMask::contiguous(usable - count, count),
        }
    }

    pub fn with_resting(mut self, resting: CoreAllotment) -> Self {
        self.resting = resting;
        self
    }
}
