//! # lp_app
//!
//! Wiring for the loadpark watcher: configuration, startup discovery and the
//! lifecycle coordinator that drives affinity changes from the client log

pub mod cli;
pub mod config_loader;
pub mod coordinator;
pub mod shutdown_handler;
pub mod startup;
pub mod tracing_setup;

pub use coordinator::LifecycleCoordinator;
pub use coordinator::PhaseApplier;
pub use coordinator::spawn_monitor;
