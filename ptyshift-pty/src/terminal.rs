//! Terminal utilities.
//!
//! Captures the invoking terminal's attributes, switches it into raw mode and
//! puts it back exactly as it was found.

use nix::errno::Errno;
use nix::sys::termios::{self, SetArg, Termios};
use std::os::fd::BorrowedFd;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("unable to read terminal attributes: {0}")]
    Capture(#[source] Errno),
    #[error("unable to set terminal attributes: {0}")]
    EnterRaw(#[source] Errno),
    #[error("unable to restore terminal attributes: {0}")]
    Restore(#[source] Errno),
}

/// Check if `fd` refers to a terminal.
pub fn is_tty(fd: BorrowedFd<'_>) -> bool {
    nix::unistd::isatty(fd).unwrap_or(false)
}

/// Attributes of the invoking terminal, captured before any mode change.
#[derive(Clone)]
pub struct TerminalSnapshot {
    saved: Termios,
}

impl TerminalSnapshot {
    pub fn capture(fd: BorrowedFd<'_>) -> Result<Self, TerminalError> {
        let saved = termios::tcgetattr(fd).map_err(TerminalError::Capture)?;
        Ok(Self { saved })
    }

    /// The captured attributes.
    pub fn termios(&self) -> &Termios {
        &self.saved
    }

    /// Put the terminal into raw mode.
    ///
    /// Canonical processing, echo and keystroke-generated signals are all
    /// disabled and the line is made 8-bit clean. The returned guard owns the
    /// snapshot and is the only way back to the captured attributes.
    pub fn enter_raw<'fd>(
        self,
        fd: BorrowedFd<'fd>,
    ) -> Result<RawModeGuard<'fd>, TerminalError> {
        let mut raw = self.saved.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(fd, SetArg::TCSANOW, &raw).map_err(TerminalError::EnterRaw)?;

        Ok(RawModeGuard {
            fd,
            saved: Some(self.saved),
        })
    }
}

/// Raw terminal mode guard.
///
/// [`RawModeGuard::restore`] consumes the guard, so restoration can only be
/// requested once. If the guard is dropped without it (a panic unwinding
/// through the driver) the attributes are restored on a best-effort basis.
pub struct RawModeGuard<'fd> {
    fd: BorrowedFd<'fd>,
    saved: Option<Termios>,
}

impl RawModeGuard<'_> {
    /// Re-apply the captured attributes.
    ///
    /// Interrupted applies are retried; any other failure is returned.
    pub fn restore(mut self) -> Result<(), TerminalError> {
        match self.saved.take() {
            Some(saved) => apply_retrying(self.fd, &saved).map_err(TerminalError::Restore),
            None => Ok(()),
        }
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            let _ = apply_retrying(self.fd, &saved);
        }
    }
}

fn apply_retrying(fd: BorrowedFd<'_>, attrs: &Termios) -> Result<(), Errno> {
    loop {
        match termios::tcsetattr(fd, SetArg::TCSANOW, attrs) {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::PtySession;
    use nix::sys::termios::LocalFlags;
    use std::os::fd::AsFd;

    #[test]
    fn test_capture_fails_on_pipe() {
        let (read_end, _write_end) = nix::unistd::pipe().unwrap();
        let result = TerminalSnapshot::capture(read_end.as_fd());
        assert!(matches!(result, Err(TerminalError::Capture(Errno::ENOTTY))));
        assert!(!is_tty(read_end.as_fd()));
    }

    #[test]
    fn test_raw_then_restore_round_trips() {
        let session = PtySession::allocate().unwrap();
        let slave = session.open_slave().unwrap();
        assert!(is_tty(slave.as_fd()));

        let snapshot = TerminalSnapshot::capture(slave.as_fd()).unwrap();
        let before = snapshot.termios().clone();

        let guard = snapshot.enter_raw(slave.as_fd()).unwrap();
        let raw = termios::tcgetattr(slave.as_fd()).unwrap();
        assert!(!raw.local_flags.contains(LocalFlags::ICANON));
        assert!(!raw.local_flags.contains(LocalFlags::ECHO));
        assert!(!raw.local_flags.contains(LocalFlags::ISIG));

        guard.restore().unwrap();
        let after = termios::tcgetattr(slave.as_fd()).unwrap();
        assert_eq!(after.local_flags, before.local_flags);
        assert_eq!(after.input_flags, before.input_flags);
        assert_eq!(after.output_flags, before.output_flags);
        assert_eq!(after.control_flags, before.control_flags);
        assert_eq!(after.control_chars, before.control_chars);
    }

    #[test]
    fn test_drop_restores_when_not_finished() {
        let session = PtySession::allocate().unwrap();
        let slave = session.open_slave().unwrap();
        let snapshot = TerminalSnapshot::capture(slave.as_fd()).unwrap();
        let before = snapshot.termios().clone();

        drop(snapshot.enter_raw(slave.as_fd()).unwrap());

        let after = termios::tcgetattr(slave.as_fd()).unwrap();
        assert_eq!(after.local_flags, before.local_flags);
    }
}
