use lp_types::CoreMask;
use thiserror::Error;

/// Fatal startup failures of the core count probe
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Cannot detect CPU cores: the operating system reported none")]
    NoCores,

    #[error("Cannot finalize CPU core detection: no affinity mask of 1..={total} cores could be applied")]
    NoAssignableCores { total: usize },
}

/// Failure of a single affinity application, never fatal
#[derive(Error, Debug)]
pub enum AffinityError {
    #[error("No running process matches {names:?}")]
    ProcessNotFound { names: Vec<String> },

    #[error("Affinity {mask} rejected for pid {pid}: {source}")]
    AffinityRejected { pid: u32, mask: CoreMask, source: std::io::Error },
}

/// Error reported by an [`crate::AffinityBackend`]
#[derive(Error, Debug)]
pub enum SetAffinityError {
    #[error("Process no longer exists")]
    NoSuchProcess,

    #[error("Operating system rejected the affinity mask: {0}")]
    Rejected(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AffinityError>;
