use lp_types::CoreMask;

use crate::errors::SetAffinityError;

/// OS seam for changing processor affinity
///
/// The real implementation is [`OsAffinity`]; tests substitute recording fakes.
pub trait AffinityBackend {
    /// Restrict the calling process (thread, where the OS only offers that) to `mask`
    fn set_current(&self, mask: &CoreMask) -> Result<(), SetAffinityError>;

    /// Restrict the process `pid` to `mask`
    fn set_process(&self, pid: u32, mask: &CoreMask) -> Result<(), SetAffinityError>;
}

/// Affinity backend for the build target's operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct OsAffinity;

#[cfg(target_os = "linux")]
mod imp {
    use std::io;
    use std::mem;

    use libc::cpu_set_t;
    use lp_types::CoreMask;
    use tracing::debug;

    use crate::errors::SetAffinityError;

    fn cpu_set(mask: &CoreMask) -> Result<cpu_set_t, SetAffinityError> {
        // SAFETY: All zeroes is a valid cpu_set_t.
        let mut cpu_set: cpu_set_t = unsafe { mem::zeroed() };
        let capacity = 8 * size_of::<cpu_set_t>();

        for &core in mask.cores() {
            if core >= capacity {
                return Err(SetAffinityError::Rejected(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("core {core} does not fit in a {capacity}-core cpu_set_t"),
                )));
            }
            // SAFETY: Index is bounds-checked above.
            unsafe { libc::CPU_SET(core, &mut cpu_set) };
        }

        Ok(cpu_set)
    }

    fn sched_setaffinity(tid: libc::pid_t, cpu_set: &cpu_set_t) -> io::Result<()> {
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::sched_setaffinity(tid, size_of::<cpu_set_t>(), cpu_set) };

        if result == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }

    fn is_gone(err: &io::Error) -> bool {
        err.raw_os_error() == Some(libc::ESRCH)
    }

    pub(super) fn set_current(mask: &CoreMask) -> Result<(), SetAffinityError> {
        let cpu_set = cpu_set(mask)?;
        // 0 means the calling thread.
        sched_setaffinity(0, &cpu_set).map_err(SetAffinityError::Rejected)
    }

    /// Linux affinity is per thread, so every task of the process is updated
    pub(super) fn set_process(pid: u32, mask: &CoreMask) -> Result<(), SetAffinityError> {
        let cpu_set = cpu_set(mask)?;
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| SetAffinityError::Rejected(io::Error::new(io::ErrorKind::InvalidInput, format!("pid {pid} out of range"))))?;

        let tasks = match std::fs::read_dir(format!("/proc/{pid}/task")) {
            Ok(tasks) => tasks,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(SetAffinityError::NoSuchProcess),
            Err(err) => {
                debug!("Cannot list threads of pid {pid} ({err}), updating the main thread only");
                return sched_setaffinity(pid, &cpu_set).map_err(|err| if is_gone(&err) { SetAffinityError::NoSuchProcess } else { err.into() });
            }
        };

        let mut updated = 0usize;
        for entry in tasks.flatten() {
            let Some(tid) = entry.file_name().to_str().and_then(|name| name.parse::<libc::pid_t>().ok()) else {
                continue;
            };
            match sched_setaffinity(tid, &cpu_set) {
                Ok(()) => updated += 1,
                // Thread exited while we were iterating
                Err(err) if is_gone(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        if updated == 0 { Err(SetAffinityError::NoSuchProcess) } else { Ok(()) }
    }
}

#[cfg(windows)]
mod imp {
    use std::io;

    use lp_types::CoreMask;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::Foundation::ERROR_INVALID_PARAMETER;
    use windows::Win32::System::Threading::GetCurrentProcess;
    use windows::Win32::System::Threading::OpenProcess;
    use windows::Win32::System::Threading::PROCESS_QUERY_LIMITED_INFORMATION;
    use windows::Win32::System::Threading::PROCESS_SET_INFORMATION;
    use windows::Win32::System::Threading::SetProcessAffinityMask;

    use crate::errors::SetAffinityError;

    /// Legacy affinity masks cover a single processor group of up to 64 cores
    fn legacy_mask(mask: &CoreMask) -> Result<usize, SetAffinityError> {
        mask.to_bitmask().and_then(|bits| usize::try_from(bits).ok()).ok_or_else(|| {
            SetAffinityError::Rejected(io::Error::new(io::ErrorKind::InvalidInput, format!("mask {mask} exceeds the legacy affinity mask width")))
        })
    }

    pub(super) fn set_current(mask: &CoreMask) -> Result<(), SetAffinityError> {
        let bits = legacy_mask(mask)?;

        // SAFETY: No safety requirements. Does not need to be closed.
        let current_process = unsafe { GetCurrentProcess() };

        // SAFETY: No safety requirements beyond passing valid inputs.
        unsafe { SetProcessAffinityMask(current_process, bits) }.map_err(|err| SetAffinityError::Rejected(err.into()))
    }

    pub(super) fn set_process(pid: u32, mask: &CoreMask) -> Result<(), SetAffinityError> {
        let bits = legacy_mask(mask)?;

        // SAFETY: No safety requirements beyond passing valid inputs.
        let process = unsafe { OpenProcess(PROCESS_SET_INFORMATION | PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.map_err(|err| {
            if err.code() == ERROR_INVALID_PARAMETER.to_hresult() { SetAffinityError::NoSuchProcess } else { SetAffinityError::Rejected(err.into()) }
        })?;

        // SAFETY: Handle was opened above with PROCESS_SET_INFORMATION.
        let result = unsafe { SetProcessAffinityMask(process, bits) }.map_err(|err| SetAffinityError::Rejected(err.into()));

        // SAFETY: Handle is owned by us and closed exactly once.
        if let Err(err) = unsafe { CloseHandle(process) } {
            tracing::debug!("Failed to close handle for pid {pid}: {err}");
        }

        result
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
mod imp {
    use std::io;

    use lp_types::CoreMask;

    use crate::errors::SetAffinityError;

    fn unsupported() -> SetAffinityError {
        SetAffinityError::Rejected(io::Error::new(io::ErrorKind::Unsupported, "process affinity is not supported on this platform"))
    }

    pub(super) fn set_current(_mask: &CoreMask) -> Result<(), SetAffinityError> {
        Err(unsupported())
    }

    pub(super) fn set_process(_pid: u32, _mask: &CoreMask) -> Result<(), SetAffinityError> {
        Err(unsupported())
    }
}

impl AffinityBackend for OsAffinity {
    fn set_current(&self, mask: &CoreMask) -> Result<(), SetAffinityError> {
        imp::set_current(mask)
    }

    fn set_process(&self, pid: u32, mask: &CoreMask) -> Result<(), SetAffinityError> {
        imp::set_process(pid, mask)
    }
}
