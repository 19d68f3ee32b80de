//! Pseudo-terminal plumbing for ptyshift.
//!
//! This crate owns everything between the invoking terminal and a pty
//! master: raw mode handling, pty allocation and sizing, the signal-safe
//! relay loop and launching a command onto a new pty.

mod proxy;
mod pty;
mod session;
mod spawn;
mod terminal;

// PTY management
pub use pty::{
    FALLBACK_WINSIZE, PtyError, PtySession, propagate_size, resolve_slave_path, set_window_size,
    window_size,
};

// Terminal utilities
pub use terminal::{RawModeGuard, TerminalError, TerminalSnapshot, is_tty};

// Relay
pub use proxy::{CHUNK_SIZE, Proxy, ProxyEnd, ProxyError, write_all};
pub use session::{InvokingTerminal, SessionError, relay};

// Command launch
pub use spawn::{PTY_ENV_VAR, SpawnError, SpawnMode, spawn_detached};

// Re-export for convenience
pub use nix::pty::Winsize;
