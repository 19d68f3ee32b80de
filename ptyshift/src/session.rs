//! Runs one configured session from start to finish.

use crate::config::{Invocation, SessionConfig};
use miette::{IntoDiagnostic, Result};
use ptyshift_attach::{AttachBackend, attach_or_steal};
use ptyshift_pty::{InvokingTerminal, PtySession, SpawnMode, relay, spawn_detached};
use std::io::Write;
use tracing::{debug, warn};

/// Obtain the pty this session relays, attaching to or creating it.
///
/// In creation mode the slave path is printed on `out` before any command is
/// launched, so a reader of `out` learns the path first.
pub fn open_session<B, W>(invocation: &Invocation, backend: &B, out: &mut W) -> Result<PtySession>
where
    B: AttachBackend + ?Sized,
    W: Write,
{
    match invocation {
        Invocation::Attach {
            pid,
            mode,
            force_stdio,
        } => attach_or_steal(backend, *pid, *mode, *force_stdio).into_diagnostic(),
        Invocation::Create { spawn, command } => {
            let session = PtySession::allocate().into_diagnostic()?;
            writeln!(out, "Opened a new pty: {}", session.slave_path().display()).into_diagnostic()?;
            out.flush().into_diagnostic()?;

            if *spawn != SpawnMode::None {
                match spawn_detached(&session, *spawn, command) {
                    Ok(Some(child)) => debug!("spawned pid {child}"),
                    Ok(None) => {}
                    Err(err) => warn!("{err}"),
                }
            }
            Ok(session)
        }
    }
}

/// Attach or create as configured, then relay the invoking terminal until
/// the other side goes away.
///
/// Verbosity is not consulted here; it already shaped the global tracing
/// filter before this runs.
pub fn run<B: AttachBackend + ?Sized>(config: &SessionConfig, backend: &B) -> Result<()> {
    let session = open_session(&config.invocation, backend, &mut std::io::stdout())?;

    let end = relay(InvokingTerminal::stdio(), session.master()).into_diagnostic()?;
    debug!("relay finished: {end}");
    Ok(())
}
