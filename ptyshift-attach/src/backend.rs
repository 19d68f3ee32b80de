//! The mechanisms that move a target's terminal I/O.
//!
//! Redirecting another process's descriptors, or taking over its whole
//! terminal session, is done by an external mechanism. The orchestrator only
//! talks to it through [`AttachBackend`].

use crate::pid::TargetPid;
use crate::policy::PolicyProbe;
use nix::errno::Errno;
use nix::sys::signal::kill;
use std::io::Write;
use std::os::fd::OwnedFd;
use std::path::Path;
use tracing::debug;

pub trait AttachBackend {
    /// Point the target's terminal descriptors at `slave`.
    ///
    /// With `force_stdio`, descriptors 0-2 are redirected even if the target
    /// has no controlling terminal. [`Errno::EPERM`] signals that the attach
    /// policy refused access.
    fn attach(&self, pid: TargetPid, slave: &Path, force_stdio: bool) -> Result<(), Errno>;

    /// Take over the target's terminal session, returning a usable pty master.
    fn steal(&self, pid: TargetPid) -> Result<OwnedFd, Errno>;

    /// Explain an attach-policy restriction on stderr. Best effort.
    fn report_attach_policy_restriction(&self);
}

/// Backend used by the `ptyshift` binary.
///
/// It checks that the target exists and may be signalled by us, reporting
/// `ESRCH` and `EPERM` the way a real attach would. Descriptor redirection
/// itself is not linked into this build, so a reachable target yields
/// `ENOSYS`.
#[derive(Debug, Clone, Default)]
pub struct PlatformBackend {
    policy: PolicyProbe,
}

impl PlatformBackend {
    pub fn new(policy: PolicyProbe) -> Self {
        Self { policy }
    }

    fn probe(&self, pid: TargetPid) -> Result<(), Errno> {
        kill(pid.pid(), None)?;
        debug!("pid {pid} is reachable");
        Ok(())
    }
}

impl AttachBackend for PlatformBackend {
    fn attach(&self, pid: TargetPid, slave: &Path, force_stdio: bool) -> Result<(), Errno> {
        self.probe(pid)?;
        debug!(
            "attach pid {pid} to {} (force stdio: {force_stdio}) is not supported",
            slave.display()
        );
        Err(Errno::ENOSYS)
    }

    fn steal(&self, pid: TargetPid) -> Result<OwnedFd, Errno> {
        self.probe(pid)?;
        debug!("steal of pid {pid} is not supported");
        Err(Errno::ENOSYS)
    }

    fn report_attach_policy_restriction(&self) {
        if let Some(message) = self.policy.restriction_message() {
            let _ = writeln!(std::io::stderr(), "{message}");
        }
    }
}
