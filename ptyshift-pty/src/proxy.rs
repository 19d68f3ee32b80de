//! Full-duplex relay between the invoking terminal and a pty master.
//!
//! The relay runs on the calling thread. SIGWINCH is blocked everywhere except
//! inside `pselect`, which swaps the signal mask atomically for the duration of
//! the wait. A resize that arrives while the loop is busy stays pending until
//! the next wait and interrupts it immediately, so it can never be slept
//! through.

use crate::pty::propagate_size;
use nix::errno::Errno;
use nix::sys::select::{FdSet, pselect};
use nix::sys::signal::{SigSet, SigmaskHow, Signal, pthread_sigmask};
use nix::unistd::{read, write};
use signal_hook::SigId;
use std::fmt;
use std::io;
use std::os::fd::BorrowedFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on the bytes moved per read.
pub const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("sigprocmask: {0}")]
    BlockSignal(#[source] Errno),
    #[error("unable to install SIGWINCH handler: {0}")]
    Handler(#[source] io::Error),
}

/// Why the relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyEnd {
    /// Reading the invoking terminal failed.
    InputError(Errno),
    /// The pty master reported end of file.
    PeerClosed,
    /// Reading the pty master failed.
    PeerError(Errno),
    /// The readiness wait failed for a reason other than a signal.
    WaitError(Errno),
}

impl fmt::Display for ProxyEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyEnd::InputError(err) => write!(f, "terminal read failed: {err}"),
            ProxyEnd::PeerClosed => write!(f, "pty closed"),
            ProxyEnd::PeerError(err) => write!(f, "pty read failed: {err}"),
            ProxyEnd::WaitError(err) => write!(f, "select: {err}"),
        }
    }
}

/// Pending-resize flag.
///
/// Set only by the SIGWINCH handler registered in [`Proxy::run`], read and
/// cleared only by the loop. Any number of notifications between two checks
/// collapse into one resize.
#[derive(Debug, Default)]
struct ResizeSignal(Arc<AtomicBool>);

impl ResizeSignal {
    /// Clear the flag, returning whether a resize was pending.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    fn register(&self) -> io::Result<HandlerRegistration> {
        let id = signal_hook::flag::register(signal_hook::consts::SIGWINCH, Arc::clone(&self.0))?;
        Ok(HandlerRegistration(id))
    }
}

struct HandlerRegistration(SigId);

impl Drop for HandlerRegistration {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.0);
    }
}

/// Keeps SIGWINCH blocked on this thread and restores the previous mask on drop.
struct SigwinchBlocked {
    previous: SigSet,
}

impl SigwinchBlocked {
    fn new() -> Result<Self, Errno> {
        let mut block = SigSet::empty();
        block.add(Signal::SIGWINCH);
        let mut previous = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut previous))?;
        Ok(Self { previous })
    }

    /// The mask to install while waiting: whatever was in force before, with
    /// SIGWINCH deliverable.
    fn wait_mask(&self) -> SigSet {
        let mut mask = self.previous;
        mask.remove(Signal::SIGWINCH);
        mask
    }
}

impl Drop for SigwinchBlocked {
    fn drop(&mut self) {
        if let Err(err) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
            debug!("unable to restore the signal mask: {err}");
        }
    }
}

/// Relay between a terminal (`input`/`output`) and a pty `master`.
pub struct Proxy<'fd> {
    input: BorrowedFd<'fd>,
    output: BorrowedFd<'fd>,
    master: BorrowedFd<'fd>,
    resize: ResizeSignal,
}

impl<'fd> Proxy<'fd> {
    pub fn new(input: BorrowedFd<'fd>, output: BorrowedFd<'fd>, master: BorrowedFd<'fd>) -> Self {
        Self {
            input,
            output,
            master,
            resize: ResizeSignal::default(),
        }
    }

    /// Relay until the session ends.
    ///
    /// Returns an error only if the signal plumbing cannot be set up, in which
    /// case no bytes have been relayed.
    pub fn run(self) -> Result<ProxyEnd, ProxyError> {
        let blocked = SigwinchBlocked::new().map_err(ProxyError::BlockSignal)?;
        let _handler = self.resize.register().map_err(ProxyError::Handler)?;
        let wait_mask = blocked.wait_mask();

        self.resize_peer();

        let mut buf = [0u8; CHUNK_SIZE];
        let mut input_open = true;
        let end = loop {
            if self.resize.take() {
                self.resize_peer();
            }

            let mut readable = FdSet::new();
            if input_open {
                readable.insert(self.input);
            }
            readable.insert(self.master);

            match pselect(None, &mut readable, None, None, None, &wait_mask) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(err) => break ProxyEnd::WaitError(err),
            }

            if input_open && readable.contains(self.input) {
                match read(self.input, &mut buf) {
                    Ok(0) => {
                        debug!("terminal input reached end of file");
                        input_open = false;
                    }
                    Ok(n) => forward(self.master, &buf[..n]),
                    Err(err) => break ProxyEnd::InputError(err),
                }
            }

            if readable.contains(self.master) {
                match read(self.master, &mut buf) {
                    Ok(0) => break ProxyEnd::PeerClosed,
                    Ok(n) => forward(self.output, &buf[..n]),
                    Err(err) => break ProxyEnd::PeerError(err),
                }
            }
        };

        debug!("proxy finished: {end}");
        Ok(end)
    }

    fn resize_peer(&self) {
        match propagate_size(self.input, self.master) {
            Ok(size) => debug!("pty resized to {}x{}", size.ws_row, size.ws_col),
            Err(err) => warn!("{err}"),
        }
    }
}

fn forward(fd: BorrowedFd<'_>, data: &[u8]) {
    if let Err(err) = write_all(fd, data) {
        debug!("dropped {} bytes: write failed: {err}", data.len());
    }
}

/// Write all of `data`, retrying partial and interrupted writes.
pub fn write_all(fd: BorrowedFd<'_>, mut data: &[u8]) -> Result<(), Errno> {
    while !data.is_empty() {
        match write(fd, data) {
            Ok(0) => return Err(Errno::EIO),
            Ok(n) => data = &data[n..],
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
