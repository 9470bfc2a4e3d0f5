use std::path::Path;
use std::path::PathBuf;

use lp_types::ProcessRef;
use sysinfo::Pid;
use sysinfo::ProcessRefreshKind;
use sysinfo::ProcessesToUpdate;
use sysinfo::System;
use sysinfo::UpdateKind;

/// Finds the target process by executable name
///
/// Every call queries the OS afresh; results are never assumed to stay valid.
pub trait ProcessLocator {
    /// First running process whose executable name matches any of `names`, case-insensitively
    fn locate(&mut self, names: &[String]) -> Option<ProcessRef>;

    /// Current working directory of `process`, if it is still running and readable
    fn working_directory(&mut self, process: &ProcessRef) -> Option<PathBuf>;
}

/// [`ProcessLocator`] backed by the `sysinfo` process table
pub struct SysinfoLocator {
    system: System,
}

impl Default for SysinfoLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoLocator {
    pub fn new() -> Self {
        Self { system: System::new() }
    }
}

impl ProcessLocator for SysinfoLocator {
    fn locate(&mut self, names: &[String]) -> Option<ProcessRef> {
        self.system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());

        // Lowest pid wins so repeated lookups are stable while several matches exist
        self.system
            .processes()
            .values()
            .filter(|process| process.thread_kind().is_none())
            .filter_map(|process| {
                let name = process.name().to_string_lossy();
                names
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(&name))
                    .then(|| ProcessRef { pid: process.pid().as_u32(), name: name.into_owned() })
            })
            .min_by_key(|process| process.pid)
    }

    fn working_directory(&mut self, process: &ProcessRef) -> Option<PathBuf> {
        let pid = Pid::from_u32(process.pid);
        self.system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, ProcessRefreshKind::nothing().with_cwd(UpdateKind::Always));

        self.system.process(pid).and_then(|process| process.cwd()).map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn own_name() -> String {
        let mut locator = SysinfoLocator::new();
        locator.system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());
        let pid = Pid::from_u32(std::process::id());
        locator.system.process(pid).unwrap().name().to_string_lossy().into_owned()
    }

    #[test]
    fn test_locates_own_process_case_insensitively() {
        let name = own_name();
        let mut locator = SysinfoLocator::new();

        let found = locator.locate(&[name.to_uppercase()]).unwrap();
        assert!(found.name.eq_ignore_ascii_case(&name));
    }

    #[test]
    fn test_unknown_name() {
        let mut locator = SysinfoLocator::new();
        assert!(locator.locate(&["definitely-not-running-loadpark.exe".to_string()]).is_none());
    }

    #[test]
    fn test_working_directory_of_own_process() {
        let mut locator = SysinfoLocator::new();
        let me = ProcessRef { pid: std::process::id(), name: own_name() };

        let cwd = locator.working_directory(&me).unwrap();
        assert_eq!(cwd.canonicalize().unwrap(), std::env::current_dir().unwrap().canonicalize().unwrap());
    }
}
