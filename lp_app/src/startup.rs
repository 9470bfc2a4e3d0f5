use std::path::Path;
use std::path::PathBuf;

use lp_affinity::ProcessLocator;
use lp_types::ProcessRef;
use thiserror::Error;
use tracing::error;
use tracing::info;

use crate::config_loader::LoadparkConfig;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("No running process matches {names:?}. Is the game running?")]
    GameNotRunning { names: Vec<String> },

    #[error("Failed to detect game directory of {process}")]
    NoGameDirectory { process: ProcessRef },

    #[error("Log file not found: {}", path.display())]
    LogFileMissing { path: PathBuf },
}

/// `<game dir>/logs/client.txt`
pub fn client_log_path(game_dir: &Path) -> PathBuf {
    game_dir.join("logs").join("client.txt")
}

/// Find the client log to follow
///
/// Uses `log_file` from the config when set, otherwise derives the path from
/// the running game's working directory. The file must already exist.
pub fn resolve_log_file<L: ProcessLocator>(locator: &mut L, config: &LoadparkConfig) -> Result<PathBuf, StartupError> {
    let path = match &config.log_file {
        Some(path) => path.clone(),
        None => {
            let process = locator
                .locate(&config.process_names)
                .ok_or_else(|| StartupError::GameNotRunning { names: config.process_names.clone() })?;
            info!("Found game process {process}");

            let game_dir = locator.working_directory(&process).ok_or(StartupError::NoGameDirectory { process })?;
            client_log_path(&game_dir)
        }
    };

    if !path.is_file() {
        error!("Log file not found in detected game directory: {}", path.display());
        return Err(StartupError::LogFileMissing { path });
    }

    Ok(path)
}
