//! PTY (pseudo-terminal) management.
//!
//! Allocates the master side of a pseudo-terminal pair, resolves the slave
//! device path and keeps the slave's window size in step with the invoking
//! terminal.

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl};
use nix::pty::{Winsize, grantpt, posix_openpt, unlockpt};
use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Geometry applied when the invoking terminal cannot report its own size.
pub const FALLBACK_WINSIZE: Winsize = Winsize {
    ws_row: 30,
    ws_col: 80,
    ws_xpixel: 640,
    ws_ypixel: 480,
};

nix::ioctl_read_bad!(tiocgwinsz, libc::TIOCGWINSZ, libc::winsize);
nix::ioctl_write_ptr_bad!(tiocswinsz, libc::TIOCSWINSZ, libc::winsize);

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("unable to allocate a new pseudo-terminal: {0}")]
    Open(#[source] Errno),
    #[error("unable to grantpt: {0}")]
    Grant(#[source] Errno),
    #[error("unable to unlockpt: {0}")]
    Unlock(#[source] Errno),
    #[error("unable to set close-on-exec on the pty master: {0}")]
    CloseOnExec(#[source] Errno),
    #[error("unable to resolve the pty slave path: {0}")]
    SlavePath(#[source] Errno),
    #[error("unable to open pty slave {path}: {source}")]
    OpenSlave { path: PathBuf, source: io::Error },
    #[error("unable to query terminal size: {0}")]
    QuerySize(#[source] Errno),
    #[error("cannot set terminal size: {0}")]
    Resize(#[source] Errno),
}

/// The master descriptor of a pseudo-terminal pair and the path of its slave.
#[derive(Debug)]
pub struct PtySession {
    master: OwnedFd,
    slave_path: PathBuf,
}

impl PtySession {
    /// Open a new pseudo-terminal master, then grant and unlock its slave.
    pub fn allocate() -> Result<Self, PtyError> {
        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(PtyError::Open)?;
        grantpt(&master).map_err(PtyError::Grant)?;
        unlockpt(&master).map_err(PtyError::Unlock)?;

        // SAFETY: `into_raw_fd` hands over sole ownership of a valid descriptor.
        let master = unsafe { OwnedFd::from_raw_fd(master.into_raw_fd()) };
        Self::from_master(master)
    }

    /// Wrap a master descriptor that was allocated elsewhere.
    pub fn from_master(master: OwnedFd) -> Result<Self, PtyError> {
        fcntl(master.as_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
            .map_err(PtyError::CloseOnExec)?;
        let slave_path = resolve_slave_path(master.as_fd())?;
        tracing::debug!("pty master {} -> {}", master.as_raw_fd(), slave_path.display());
        Ok(Self { master, slave_path })
    }

    pub fn slave_path(&self) -> &Path {
        &self.slave_path
    }

    pub fn master(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }

    pub fn into_master(self) -> OwnedFd {
        self.master
    }

    /// Open the slave device without making it our controlling terminal.
    pub fn open_slave(&self) -> Result<File, PtyError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&self.slave_path)
            .map_err(|source| PtyError::OpenSlave {
                path: self.slave_path.clone(),
                source,
            })
    }
}

impl AsFd for PtySession {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }
}

/// Resolve the slave device path that belongs to a master descriptor.
pub fn resolve_slave_path(master: BorrowedFd<'_>) -> Result<PathBuf, PtyError> {
    #[cfg(target_os = "linux")]
    {
        let mut buf = [0 as libc::c_char; 128];
        let rc = unsafe { libc::ptsname_r(master.as_raw_fd(), buf.as_mut_ptr(), buf.len()) };
        if rc != 0 {
            return Err(PtyError::SlavePath(Errno::from_raw(rc)));
        }
        let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
        Ok(PathBuf::from(std::ffi::OsStr::from_bytes(name.to_bytes())))
    }

    #[cfg(not(target_os = "linux"))]
    {
        // ptsname is not reentrant; the session runs on a single thread.
        let ptr = unsafe { libc::ptsname(master.as_raw_fd()) };
        if ptr.is_null() {
            return Err(PtyError::SlavePath(Errno::last()));
        }
        let name = unsafe { CStr::from_ptr(ptr) };
        Ok(PathBuf::from(std::ffi::OsStr::from_bytes(name.to_bytes())))
    }
}

/// Query the window size of the terminal behind `fd`.
pub fn window_size(fd: BorrowedFd<'_>) -> Result<Winsize, PtyError> {
    let mut size = Winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    unsafe { tiocgwinsz(fd.as_raw_fd(), &mut size) }.map_err(PtyError::QuerySize)?;
    Ok(size)
}

/// Apply a window size to the terminal behind `fd`.
pub fn set_window_size(fd: BorrowedFd<'_>, size: &Winsize) -> Result<(), PtyError> {
    unsafe { tiocswinsz(fd.as_raw_fd(), size) }.map_err(PtyError::Resize)?;
    Ok(())
}

/// Copy the geometry of `source` onto `target`.
///
/// When `source` is not a terminal (or the query fails for any other reason)
/// [`FALLBACK_WINSIZE`] is applied, so programs on the slave still see a sane
/// size. Returns the geometry that was applied.
pub fn propagate_size(source: BorrowedFd<'_>, target: BorrowedFd<'_>) -> Result<Winsize, PtyError> {
    let size = match window_size(source) {
        Ok(size) => size,
        Err(err) => {
            tracing::debug!("{err}, using {}x{}", FALLBACK_WINSIZE.ws_row, FALLBACK_WINSIZE.ws_col);
            FALLBACK_WINSIZE
        }
    };
    set_window_size(target, &size)?;
    Ok(size)
}
