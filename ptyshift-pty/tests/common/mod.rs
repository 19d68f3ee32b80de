#![allow(dead_code)]

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{self, SetArg};
use std::io::{self, Write};
use std::os::fd::BorrowedFd;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEADLINE: Duration = Duration::from_secs(5);

/// Read from `fd` until `done` accepts what was collected, EOF, or `timeout`.
/// Returns all bytes read so far.
pub fn read_until(
    fd: BorrowedFd<'_>,
    done: impl Fn(&[u8]) -> bool,
    timeout: Duration,
) -> Vec<u8> {
    let start = Instant::now();
    let mut buf = [0u8; 4096];
    let mut collected = Vec::new();
    while start.elapsed() < timeout && !done(&collected) {
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(50u16)) {
            Ok(0) | Err(Errno::EINTR) => continue,
            Ok(_) => {}
            Err(_) => break,
        }
        match nix::unistd::read(fd, &mut buf) {
            Ok(0) => break,
            Ok(n) => collected.extend_from_slice(&buf[..n]),
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
    collected
}

/// Read exactly `len` bytes, or whatever arrived before the deadline.
pub fn read_len(fd: BorrowedFd<'_>, len: usize) -> Vec<u8> {
    read_until(fd, |got| got.len() >= len, DEADLINE)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Put a terminal into raw mode so bytes cross it untouched.
pub fn make_raw(fd: BorrowedFd<'_>) {
    let mut attrs = termios::tcgetattr(fd).unwrap();
    termios::cfmakeraw(&mut attrs);
    termios::tcsetattr(fd, SetArg::TCSANOW, &attrs).unwrap();
}

/// Poll `check` until it holds or the deadline passes.
pub fn eventually(check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}

/// Log sink for a scoped tracing subscriber.
#[derive(Clone, Default)]
pub struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.text().lines().filter(|line| line.contains(needle)).count()
    }
}

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with debug events on this thread written to `log`.
pub fn with_captured_log<T>(log: &CapturedLog, f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(log.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}
