//! Process-group plumbing for the shell and one-shot children.
//!
//! Every child starts in a fresh session (and therefore its own process
//! group) so that a restart can signal the shell together with anything it
//! spawned. On Linux the child additionally receives `SIGTERM` if the tool
//! process dies first. Non-Unix targets get no-op fallbacks.

use std::io;

/// Grace period between `SIGTERM` and `SIGKILL` when stopping a shell.
pub const DEFAULT_GRACEFUL_TIMEOUT_MS: u64 = 500;

/// Signal used when tearing down a process group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KillSignal {
    /// Lets the shell exit on its own terms.
    Term,
    /// Immediate, non-graceful termination.
    #[default]
    Kill,
}

#[cfg(unix)]
impl KillSignal {
    fn as_libc_signal(self) -> libc::c_int {
        match self {
            KillSignal::Term => libc::SIGTERM,
            KillSignal::Kill => libc::SIGKILL,
        }
    }
}

/// Arrange for the child to receive `SIGTERM` when `parent_pid` goes away.
///
/// Runs inside `pre_exec`; the parent PID is captured before the fork and
/// re-checked here in case the parent exited in between.
#[cfg(target_os = "linux")]
pub fn set_parent_death_signal(parent_pid: libc::pid_t) -> io::Result<()> {
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) } == -1 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { libc::getppid() } != parent_pid {
        unsafe {
            libc::raise(libc::SIGTERM);
        }
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_parent_death_signal(_parent_pid: i32) -> io::Result<()> {
    Ok(())
}

/// Start a new session so the child leads its own process group and has no
/// controlling terminal.
#[cfg(unix)]
pub fn detach_from_tty() -> io::Result<()> {
    if unsafe { libc::setsid() } == -1 {
        let err = io::Error::last_os_error();
        // EPERM: already a session leader
        if err.raw_os_error() == Some(libc::EPERM) {
            return set_process_group();
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn detach_from_tty() -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
pub fn set_process_group() -> io::Result<()> {
    if unsafe { libc::setpgid(0, 0) } == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
pub fn set_process_group() -> io::Result<()> {
    Ok(())
}

/// Signal the process group led by `pid`. A group that no longer exists is
/// not an error.
#[cfg(unix)]
pub fn signal_process_group(pid: u32, signal: KillSignal) -> io::Result<()> {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("pid {pid} out of range"),
        ));
    };

    if unsafe { libc::killpg(pgid, signal.as_libc_signal()) } == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn signal_process_group(_pid: u32, _signal: KillSignal) -> io::Result<()> {
    Ok(())
}

/// Install the pre-exec hooks shared by every child the runner spawns.
pub fn isolate(command: &mut tokio::process::Command) {
    #[cfg(target_os = "linux")]
    let parent_pid = unsafe { libc::getpid() };

    #[cfg(unix)]
    unsafe {
        command.pre_exec(move || {
            detach_from_tty()?;
            #[cfg(target_os = "linux")]
            set_parent_death_signal(parent_pid)?;
            Ok(())
        });
    }

    #[cfg(not(unix))]
    let _ = command;
}
