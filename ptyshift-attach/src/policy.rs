//! Diagnostics for kernels that restrict which processes may be traced.

use std::fs;
use std::path::{Path, PathBuf};

/// Yama LSM sysctl controlling ptrace attach permissions.
pub const YAMA_PTRACE_SCOPE: &str = "/proc/sys/kernel/yama/ptrace_scope";

/// Reads the attach policy in force on this machine.
#[derive(Debug, Clone)]
pub struct PolicyProbe {
    path: PathBuf,
}

impl Default for PolicyProbe {
    fn default() -> Self {
        Self::new(YAMA_PTRACE_SCOPE)
    }
}

impl PolicyProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current ptrace scope, or `None` if Yama is absent or unreadable.
    pub fn ptrace_scope(&self) -> Option<u8> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    /// Explanation to show after an attach was denied, if the policy is the
    /// likely cause.
    pub fn restriction_message(&self) -> Option<String> {
        let path = self.path.display();
        let remedy = match self.ptrace_scope()? {
            0 => return None,
            1 => format!(
                "Only ancestors of a process may attach to it. To allow attaching to any \
                 process running as your user, run:\n\
                 \n    echo 0 | sudo tee {path}\n\n\
                 or set kernel.yama.ptrace_scope = 0 in /etc/sysctl.d/10-ptrace.conf."
            ),
            2 => "Only processes with CAP_SYS_PTRACE may attach. Run as root or lower \
                  kernel.yama.ptrace_scope."
                .to_string(),
            scope => format!(
                "Attaching is disabled (scope {scope}); the setting cannot be lowered \
                 until the next reboot."
            ),
        };
        Some(format!(
            "The kernel denied permission while attaching. {path} restricts ptrace.\n{remedy}"
        ))
    }
}
