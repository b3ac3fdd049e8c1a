//! Unix pseudo-terminal wrapper
//!
//! This module provides a thin wrapper around `portable-pty` that exposes the
//! PTY master as a non-blocking file descriptor, so a single thread can wait
//! on it with `poll(2)` and then read or write without ever blocking.

use std::io::{self, Read, Write};
use std::os::unix::io::RawFd;
use std::path::PathBuf;
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ui::layout::Size;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to open pseudo terminal: {0}")]
    Open(String),

    #[error("Failed to spawn {command}: {reason}")]
    Spawn { command: String, reason: String },

    #[error("Failed to resize pseudo terminal: {0}")]
    Resize(String),

    #[error("Failed to read from PTY: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write to PTY: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to wait for child: {0}")]
    Wait(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, PtyError>;

/// Program image and arguments for the child
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one
    pub env: Vec<(String, String)>,
}

impl ChildCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn display(&self) -> String {
        self.program.display().to_string()
    }
}

/// Outcome of a non-blocking read
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were placed in the buffer
    Data(usize),
    /// Nothing available right now
    Empty,
    /// The slave side is closed
    Eof,
}

/// Exit status of the child
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildExit {
    pub code: u32,
}

impl ChildExit {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// PTY master plus the child attached to its slave side
pub struct Pty {
    master: Box<dyn MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    fd: RawFd,
}

impl Pty {
    /// Open a PTY of the given size and start `command` on its slave side
    pub fn spawn(command: &ChildCommand, size: Size) -> Result<Self> {
        let pair = native_pty_system()
            .openpty(pty_size(size))
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&command.program);
        for arg in &command.args {
            cmd.arg(arg);
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn {
                command: command.display(),
                reason: e.to_string(),
            })?;
        // Only the child keeps the slave open, so its exit closes the stream
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Open(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Open(e.to_string()))?;
        let fd = pair
            .master
            .as_raw_fd()
            .ok_or_else(|| PtyError::Open("PTY master has no file descriptor".to_string()))?;

        set_nonblocking(fd).map_err(|e| PtyError::Open(e.to_string()))?;

        info!(
            "Spawned {} (pid {:?}) on PTY fd {} at {}x{}",
            command.display(),
            child.process_id(),
            fd,
            size.cols,
            size.rows
        );

        Ok(Self {
            master: pair.master,
            reader,
            writer,
            child,
            fd,
        })
    }

    /// Child process id
    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Issue the window-size change on the master
    pub fn resize(&self, size: Size) -> Result<()> {
        self.master
            .resize(pty_size(size))
            .map_err(|e| PtyError::Resize(e.to_string()))
    }

    /// Wait up to `timeout` for the master to become readable.
    ///
    /// Hang-up and error conditions count as readable so the following read
    /// observes them.
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(PtyError::Read(err));
        }

        Ok(rc > 0 && pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
    }

    /// Read whatever the child has written (non-blocking)
    pub fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        match self.reader.read(buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(ReadOutcome::Empty),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(ReadOutcome::Empty),
            // Linux reports a closed slave as EIO on the master
            Err(e) if e.raw_os_error() == Some(libc::EIO) => Ok(ReadOutcome::Eof),
            Err(e) => Err(PtyError::Read(e)),
        }
    }

    /// Write as much of `data` as the master accepts right now.
    ///
    /// Returns the number of bytes taken; 0 means the write would block.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        loop {
            match self.writer.write(data) {
                Ok(n) => {
                    let _ = self.writer.flush();
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(0),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PtyError::Write(e)),
            }
        }
    }

    /// Non-blocking exit check.
    ///
    /// A child that has already been reaped elsewhere reports `None`.
    pub fn try_wait(&mut self) -> Result<Option<ChildExit>> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(Some(ChildExit {
                code: status.exit_code(),
            })),
            Ok(None) => Ok(None),
            Err(e) if e.raw_os_error() == Some(libc::ECHILD) => {
                debug!("Child already reaped");
                Ok(None)
            }
            Err(e) => Err(PtyError::Wait(e)),
        }
    }
}

fn pty_size(size: Size) -> PtySize {
    PtySize {
        rows: size.rows.max(1),
        cols: size.cols.max(1),
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Put a file descriptor in non-blocking mode
fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Read until `needle` shows up or the deadline passes
    fn read_until(pty: &mut Pty, needle: &str, deadline: Duration) -> String {
        let start = Instant::now();
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        while start.elapsed() < deadline {
            if pty.wait_readable(Duration::from_millis(20)).unwrap() {
                match pty.read(&mut buf).unwrap() {
                    ReadOutcome::Data(n) => out.extend_from_slice(&buf[..n]),
                    ReadOutcome::Empty => {}
                    ReadOutcome::Eof => break,
                }
            }
            if String::from_utf8_lossy(&out).contains(needle) {
                break;
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let command = ChildCommand::new("/nonexistent/definitely-not-a-shell");
        let result = Pty::spawn(&command, Size::new(24, 80));
        assert!(matches!(result, Err(PtyError::Spawn { .. })));
    }

    #[test]
    fn test_read_child_output() {
        let command = ChildCommand::new("/bin/sh").arg("-c").arg("echo pty-hello");
        let mut pty = Pty::spawn(&command, Size::new(24, 80)).unwrap();

        let out = read_until(&mut pty, "pty-hello", Duration::from_secs(5));
        assert!(out.contains("pty-hello"));
    }

    #[test]
    fn test_read_is_nonblocking() {
        let command = ChildCommand::new("/bin/sh").arg("-c").arg("sleep 1");
        let mut pty = Pty::spawn(&command, Size::new(24, 80)).unwrap();

        let mut buf = [0u8; 64];
        let start = Instant::now();
        let outcome = pty.read(&mut buf).unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(outcome, ReadOutcome::Empty);
    }

    #[test]
    fn test_window_size_reaches_child() {
        let command = ChildCommand::new("/bin/sh")
            .arg("-c")
            .arg("sleep 0.2; stty size");
        let mut pty = Pty::spawn(&command, Size::new(24, 80)).unwrap();
        pty.resize(Size::new(17, 53)).unwrap();

        let out = read_until(&mut pty, "17 53", Duration::from_secs(5));
        assert!(out.contains("17 53"), "unexpected output: {:?}", out);
    }

    #[test]
    fn test_exit_status_and_eof() {
        let command = ChildCommand::new("/bin/sh").arg("-c").arg("exit 3");
        let mut pty = Pty::spawn(&command, Size::new(24, 80)).unwrap();

        let start = Instant::now();
        let mut status = None;
        while start.elapsed() < Duration::from_secs(5) {
            if let Some(exit) = pty.try_wait().unwrap() {
                status = Some(exit);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(status, Some(ChildExit { code: 3 }));
        // Repeated polls keep reporting the same status
        assert_eq!(pty.try_wait().unwrap(), Some(ChildExit { code: 3 }));

        let mut buf = [0u8; 64];
        let mut saw_eof = false;
        while start.elapsed() < Duration::from_secs(5) {
            if let ReadOutcome::Eof = pty.read(&mut buf).unwrap() {
                saw_eof = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(saw_eof);
    }

    #[test]
    fn test_child_environment() {
        let command = ChildCommand::new("/bin/sh")
            .arg("-c")
            .arg("echo marker=$SFTERM_TEST_MARKER")
            .env("SFTERM_TEST_MARKER", "42");
        let mut pty = Pty::spawn(&command, Size::new(24, 80)).unwrap();

        let out = read_until(&mut pty, "marker=42", Duration::from_secs(5));
        assert!(out.contains("marker=42"));
    }
}
