//! Locating a target process and taking over its terminal.
//!
//! The actual descriptor surgery is done by an [`AttachBackend`]. This crate
//! validates the target, prepares the pty the target will be moved onto and
//! explains permission failures.

mod backend;
mod orchestrator;
mod pid;
mod policy;

pub use backend::{AttachBackend, PlatformBackend};
pub use orchestrator::{AttachError, AttachmentMode, attach_or_steal};
pub use pid::{PidError, TargetPid};
pub use policy::{PolicyProbe, YAMA_PTRACE_SCOPE};
