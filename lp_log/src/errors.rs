use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TailError {
    #[error("Failed to open log file {path}: {source}")]
    Open { path: PathBuf, source: std::io::Error },

    #[error("Log file {path} was removed")]
    FileRemoved { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, TailError>;
