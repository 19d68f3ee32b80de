use nix::unistd::Pid;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PidError {
    #[error("Invalid pid: must be an integer")]
    NotInteger,
    #[error("Invalid pid: {0} is not a positive process id")]
    NonPositive(String),
    #[error("Invalid pid: {0} is out of range")]
    OutOfRange(String),
}

/// A process id that parsed as a positive integer within `pid_t` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetPid(Pid);

impl TargetPid {
    pub fn pid(self) -> Pid {
        self.0
    }

    pub fn as_raw(self) -> libc::pid_t {
        self.0.as_raw()
    }
}

impl FromStr for TargetPid {
    type Err = PidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s.parse().map_err(|err: std::num::ParseIntError| match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                PidError::OutOfRange(s.to_string())
            }
            _ => PidError::NotInteger,
        })?;
        if value < 1 {
            return Err(PidError::NonPositive(s.to_string()));
        }
        let raw = libc::pid_t::try_from(value).map_err(|_| PidError::OutOfRange(s.to_string()))?;
        Ok(Self(Pid::from_raw(raw)))
    }
}

impl fmt::Display for TargetPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
