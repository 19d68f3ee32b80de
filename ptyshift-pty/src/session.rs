//! Terminal session handoff.
//!
//! Puts the invoking terminal into raw mode, relays until the peer goes away
//! and hands the terminal back in the state it was found.

use crate::proxy::{Proxy, ProxyEnd, ProxyError};
use crate::terminal::{TerminalError, TerminalSnapshot};
use std::os::fd::BorrowedFd;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Terminal(#[from] TerminalError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

/// The terminal this process was started from.
#[derive(Clone, Copy)]
pub struct InvokingTerminal<'fd> {
    pub input: BorrowedFd<'fd>,
    pub output: BorrowedFd<'fd>,
}

impl InvokingTerminal<'static> {
    /// Standard input and output of this process.
    pub fn stdio() -> Self {
        // SAFETY: fds 0 and 1 stay open for the lifetime of the process.
        unsafe {
            Self {
                input: BorrowedFd::borrow_raw(libc::STDIN_FILENO),
                output: BorrowedFd::borrow_raw(libc::STDOUT_FILENO),
            }
        }
    }
}

/// Relay between `terminal` and `master` with the terminal in raw mode.
///
/// If the terminal attributes cannot be read the relay still runs, just
/// without raw mode. Once raw mode has been entered the attributes are
/// restored exactly once, whichever way the relay ends.
pub fn relay(
    terminal: InvokingTerminal<'_>,
    master: BorrowedFd<'_>,
) -> Result<ProxyEnd, SessionError> {
    let snapshot = match TerminalSnapshot::capture(terminal.input) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            warn!("{err}");
            None
        }
    };

    let guard = snapshot
        .map(|snapshot| snapshot.enter_raw(terminal.input))
        .transpose()?;
    debug!("raw mode active: {}", guard.is_some());

    let outcome = Proxy::new(terminal.input, terminal.output, master).run();

    if let Some(guard) = guard {
        guard.restore()?;
        debug!("terminal attributes restored");
    }

    Ok(outcome?)
}
