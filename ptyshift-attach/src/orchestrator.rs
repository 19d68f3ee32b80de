//! Turning a target pid into a pty master we can relay.

use crate::backend::AttachBackend;
use crate::pid::TargetPid;
use nix::errno::Errno;
use ptyshift_pty::{PtyError, PtySession};
use thiserror::Error;
use tracing::{debug, info};

/// How the target's terminal is taken over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttachmentMode {
    /// Allocate a fresh pty and redirect the target onto its slave.
    #[default]
    Normal,
    /// Take over the target's existing terminal session.
    Steal,
}

#[derive(Debug, Error)]
pub enum AttachError {
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error("Unable to attach to pid {pid}: {}", errno.desc())]
    Collaborator { pid: TargetPid, errno: Errno },
}

impl AttachError {
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Collaborator { errno, .. } => Some(*errno),
            Self::Pty(_) => None,
        }
    }
}

/// Produce a pty master whose slave is now the target's terminal.
///
/// A single attempt is made. When the backend reports `EPERM` it is asked to
/// explain any attach-policy restriction before the error is returned.
pub fn attach_or_steal<B: AttachBackend + ?Sized>(
    backend: &B,
    pid: TargetPid,
    mode: AttachmentMode,
    force_stdio: bool,
) -> Result<PtySession, AttachError> {
    let outcome = match mode {
        AttachmentMode::Normal => {
            let session = PtySession::allocate()?;
            debug!("attaching pid {pid} to {}", session.slave_path().display());
            backend
                .attach(pid, session.slave_path(), force_stdio)
                .map(|()| session)
        }
        AttachmentMode::Steal => {
            debug!("stealing the terminal of pid {pid}");
            match backend.steal(pid) {
                Ok(master) => Ok(PtySession::from_master(master)?),
                Err(errno) => Err(errno),
            }
        }
    };

    match outcome {
        Ok(session) => {
            info!("attached to pid {pid} via {}", session.slave_path().display());
            Ok(session)
        }
        Err(errno) => {
            if errno == Errno::EPERM {
                backend.report_attach_policy_restriction();
            }
            Err(AttachError::Collaborator { pid, errno })
        }
    }
}
