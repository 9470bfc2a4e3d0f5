//! # lp_affinity
//!
//! Core topology probing, phase affinity policy and the controller that
//! applies it to the game process

pub mod controller;
pub mod errors;
pub mod platform;
pub mod policy;
pub mod process;
pub mod topology;

pub use controller::AffinityController;
pub use controller::ApplyOutcome;
pub use errors::AffinityError;
pub use errors::SetAffinityError;
pub use errors::TopologyError;
pub use platform::AffinityBackend;
pub use platform::OsAffinity;
pub use policy::AffinityPolicy;
pub use policy::CoreAllotment;
pub use policy::DEFAULT_RESTING_PERCENT;
pub use policy::ParkSide;
pub use process::ProcessLocator;
pub use process::SysinfoLocator;
