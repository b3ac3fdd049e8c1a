//! Session management
//!
//! A session owns the one child process of a run and the PTY master it talks
//! through. Everything here is non-blocking: reads report `Empty` instead of
//! waiting, and writes that would block are kept in a pending buffer that is
//! retried on the next loop iteration.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::pty::{ChildCommand, ChildExit, Pty, PtyError, ReadOutcome, Result};
use super::resize::WinsizeTarget;
use crate::ui::layout::Size;

/// Delay between exit checks while reaping
const REAP_INTERVAL: Duration = Duration::from_millis(5);

/// Lifecycle of the child
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Exited(ChildExit),
}

/// The shell session
pub struct Session {
    pty: Pty,
    pid: Option<u32>,
    /// Last window size sent to the child
    size: Size,
    state: SessionState,
    /// Bytes the master would not take yet
    pending: Vec<u8>,
}

impl Session {
    /// Start `command` on a fresh PTY of the given size
    pub fn spawn(command: &ChildCommand, initial: Size) -> Result<Self> {
        let pty = Pty::spawn(command, initial)?;
        let pid = pty.process_id();

        Ok(Self {
            pty,
            pid,
            size: initial,
            state: SessionState::Running,
            pending: Vec::new(),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Window size last sent to the child
    #[cfg(test)]
    pub fn size(&self) -> Size {
        self.size
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Send a window-size change to the child
    pub fn set_size(&mut self, size: Size) -> Result<()> {
        self.pty.resize(size)?;
        if self.size != size {
            debug!(
                "Session size {}x{} -> {}x{}",
                self.size.cols, self.size.rows, size.cols, size.rows
            );
        }
        self.size = size;
        Ok(())
    }

    /// Wait (bounded) for output from the child
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        self.pty.wait_readable(timeout)
    }

    /// Non-blocking read of child output
    pub fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        self.pty.read(buf)
    }

    /// Queue `data` for the child and push out as much as possible.
    ///
    /// Bytes that hit a would-block condition stay queued in order and are
    /// retried by [`Session::flush_pending`].
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.pending.extend_from_slice(data);
        self.flush_pending()
    }

    /// Retry queued bytes. A hard write error discards the queue.
    pub fn flush_pending(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            let written = match self.pty.write(&self.pending) {
                Ok(n) => n,
                Err(e) => {
                    self.pending.clear();
                    return Err(e);
                }
            };
            if written == 0 {
                debug!("PTY write would block, {} bytes pending", self.pending.len());
                break;
            }
            self.pending.drain(..written);
        }
        Ok(())
    }

    /// Number of bytes still waiting to be written
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Non-blocking exit check.
    ///
    /// Once an exit status has been seen it is remembered, so later calls
    /// keep returning it.
    pub fn poll_exit(&mut self) -> Result<Option<ChildExit>> {
        if let SessionState::Exited(exit) = self.state {
            return Ok(Some(exit));
        }

        let status = self.pty.try_wait()?;
        if let Some(exit) = status {
            if exit.success() {
                info!("Child {:?} exited", self.pid);
            } else {
                info!("Child {:?} exited with status {}", self.pid, exit.code);
            }
            self.state = SessionState::Exited(exit);
            if !self.pending.is_empty() {
                warn!("Dropping {} unwritten bytes", self.pending.len());
                self.pending.clear();
            }
        }
        Ok(status)
    }

    /// Poll for the exit status for at most `grace`
    pub fn reap(&mut self, grace: Duration) -> Result<Option<ChildExit>> {
        let deadline = Instant::now() + grace;
        loop {
            if let Some(exit) = self.poll_exit()? {
                return Ok(Some(exit));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(REAP_INTERVAL);
        }
    }
}

impl WinsizeTarget for Session {
    fn set_size(&mut self, size: Size) -> std::result::Result<(), PtyError> {
        Session::set_size(self, size)
    }
}
