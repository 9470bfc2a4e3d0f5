//! # lp_log
//!
//! Client log tailing and lifecycle marker classification

pub mod classifier;
pub mod errors;
pub mod tailer;

pub use classifier::classify;
pub use errors::Result;
pub use errors::TailError;
pub use tailer::DEFAULT_POLL_INTERVAL;
pub use tailer::LogTailer;
pub use tailer::TailLines;
