//! Launching a command onto a freshly allocated pty.

use crate::pty::PtySession;
use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Environment variable carrying the slave path into the launched command.
pub const PTY_ENV_VAR: &str = "PTYSHIFT_PTY";

/// How a command supplied in pty-creation mode is launched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpawnMode {
    /// Nothing is launched.
    #[default]
    None,
    /// Launch with the slave path in the environment; stdio is inherited.
    DetachedWithEnv,
    /// Additionally start a new session and reopen the slave as stdin,
    /// stdout and stderr, making it the controlling terminal.
    DetachedWithRedirectedStdio,
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("pty path {0} contains a NUL byte")]
    NulInPath(PathBuf),
    #[error("unable to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Launch `command` against `session` without waiting for it.
///
/// Returns the child pid, or `None` when there is nothing to launch.
pub fn spawn_detached(
    session: &PtySession,
    mode: SpawnMode,
    command: &[String],
) -> Result<Option<u32>, SpawnError> {
    let Some((program, args)) = command.split_first() else {
        return Ok(None);
    };
    if mode == SpawnMode::None {
        return Ok(None);
    }

    let mut cmd = Command::new(program);
    cmd.args(args).env(PTY_ENV_VAR, session.slave_path());

    if mode == SpawnMode::DetachedWithRedirectedStdio {
        let slave = CString::new(session.slave_path().as_os_str().as_bytes())
            .map_err(|_| SpawnError::NulInPath(session.slave_path().to_path_buf()))?;
        // SAFETY: the hook only calls async-signal-safe functions.
        unsafe {
            cmd.pre_exec(move || redirect_to_slave(&slave));
        }
    }

    let child = cmd.spawn().map_err(|source| SpawnError::Launch {
        program: program.clone(),
        source,
    })?;
    debug!("launched {program} as pid {} on {}", child.id(), session.slave_path().display());

    Ok(Some(child.id()))
}

/// Runs in the forked child, between fork and exec.
fn redirect_to_slave(slave: &CStr) -> io::Result<()> {
    // Without a controlling terminal, the first tty opened becomes it.
    nix::unistd::setsid()?;

    let input = open_raw(slave, libc::O_RDONLY)?;
    dup_onto(input, libc::STDIN_FILENO)?;
    close_raw(input);

    let output = open_raw(slave, libc::O_WRONLY)?;
    dup_onto(output, libc::STDOUT_FILENO)?;
    dup_onto(output, libc::STDERR_FILENO)?;
    close_raw(output);

    Ok(())
}

fn open_raw(path: &CStr, flags: libc::c_int) -> io::Result<libc::c_int> {
    match unsafe { libc::open(path.as_ptr(), flags) } {
        -1 => Err(io::Error::last_os_error()),
        fd => Ok(fd),
    }
}

fn dup_onto(fd: libc::c_int, target: libc::c_int) -> io::Result<()> {
    if fd == target {
        return Ok(());
    }
    match unsafe { libc::dup2(fd, target) } {
        -1 => Err(io::Error::last_os_error()),
        _ => Ok(()),
    }
}

fn close_raw(fd: libc::c_int) {
    if fd > libc::STDERR_FILENO {
        unsafe { libc::close(fd) };
    }
}
