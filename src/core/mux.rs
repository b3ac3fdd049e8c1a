//! I/O multiplexer
//!
//! The single-threaded run loop. Each iteration polls the display size,
//! waits briefly for child output, renders it, forwards one keyboard event
//! and checks whether the child has exited.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::engine::TerminalEngine;
use super::pty::{ChildCommand, ChildExit, PtyError, ReadOutcome};
use super::resize::{ResizeCoordinator, WinsizeTarget};
use super::session::Session;
use crate::ui::chrome::{ChromePainter, Theme};
use crate::ui::keymapper::{KeyEvent, KeyMapper, KeySource, SpecialKey};
use crate::ui::layout::{self, ChromeConfig, ChromeGeometry, Size};
use crate::ui::renderer;
use crate::ui::surface::DisplaySurface;

/// Upper bound of the readiness wait per iteration
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for an exit status after end of stream
pub const EOF_REAP_GRACE: Duration = Duration::from_millis(200);

/// Window size given to the child when the display starts too small
pub const MIN_CHILD_SIZE: Size = Size::new(2, 10);

const READ_CHUNK: usize = 8192;

/// Reads taken after the child exits to pick up its last output
const DRAIN_LIMIT: usize = 64;

/// Why the loop stopped
#[derive(Debug)]
pub enum Termination {
    ChildExited(ChildExit),
    Eof,
    SpawnFailed(PtyError),
}

impl Termination {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Termination::ChildExited(exit) => exit.code as i32,
            Termination::Eof => 0,
            Termination::SpawnFailed(_) => 1,
        }
    }
}

#[derive(Debug)]
pub enum RunState {
    Running,
    Terminated(Termination),
}

/// Tunables for the loop
#[derive(Debug, Clone)]
pub struct MuxOptions {
    pub chrome: ChromeConfig,
    pub theme: Theme,
    pub poll_interval: Duration,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            chrome: ChromeConfig::default(),
            theme: Theme::default(),
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Owns the session, engine, display and keyboard for one run
pub struct Multiplexer<S: DisplaySurface, K: KeySource> {
    surface: S,
    keys: K,
    engine: Box<dyn TerminalEngine>,
    painter: ChromePainter,
    chrome: ChromeConfig,
    coordinator: ResizeCoordinator,
    session: Option<Session>,
    geometry: Option<ChromeGeometry>,
    display: Size,
    state: RunState,
    poll_interval: Duration,
    buf: Vec<u8>,
}

impl<S: DisplaySurface, K: KeySource> Multiplexer<S, K> {
    pub fn new(surface: S, keys: K, engine: Box<dyn TerminalEngine>, options: MuxOptions) -> Self {
        let painter = ChromePainter::new(
            options.theme,
            options.chrome.banner_height,
            options.chrome.frame_height,
        );
        Self {
            surface,
            keys,
            engine,
            painter,
            chrome: options.chrome,
            coordinator: ResizeCoordinator::new(options.chrome, MIN_CHILD_SIZE),
            session: None,
            geometry: None,
            display: Size::default(),
            state: RunState::Running,
            poll_interval: options.poll_interval,
            buf: vec![0u8; READ_CHUNK],
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Spawn the child and paint the first frame.
    ///
    /// A spawn failure is not an error here: it moves the loop to
    /// `Terminated(SpawnFailed)` without touching the display.
    pub fn start(&mut self, command: &ChildCommand) -> Result<()> {
        let display = self.surface.size().context("Failed to query display size")?;
        let geometry = layout::compute(display, &self.chrome);
        let initial = geometry.viewport.size().unwrap_or(MIN_CHILD_SIZE);
        let (cols, rows) = (display.cols, display.rows);
        info!(
            "Display {}x{}, child window {}x{}, engine {}",
            cols,
            rows,
            initial.cols,
            initial.rows,
            self.engine.name()
        );

        let mut session = match Session::spawn(command, initial) {
            Ok(session) => session,
            Err(e) => {
                error!("{}", e);
                self.state = RunState::Terminated(Termination::SpawnFailed(e));
                return Ok(());
            }
        };

        // The child must know its size before the first read
        if let Err(e) = session.set_size(initial) {
            warn!("{}", e);
        }
        self.engine.resize(initial.cols, initial.rows);
        info!("Session started, child pid {:?}", session.pid());

        self.coordinator = ResizeCoordinator::new(self.chrome, initial);
        let painted = self.apply_display_size(display, &mut session);
        self.session = Some(session);
        painted
    }

    /// One loop iteration
    pub fn step(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let result = self.step_session(&mut session);
        self.session = Some(session);
        let termination = result?;

        if let Some(termination) = termination {
            info!("Session ended: {:?} (exit code {})", termination, termination.exit_code());
            self.state = RunState::Terminated(termination);
        }
        Ok(())
    }

    /// Run until the session ends
    pub fn run(&mut self) -> Result<()> {
        while self.is_running() {
            self.step()?;
        }
        Ok(())
    }

    /// Consume the loop, restoring the display, and return why it stopped
    pub fn into_termination(self) -> Option<Termination> {
        match self.state {
            RunState::Terminated(termination) => Some(termination),
            RunState::Running => None,
        }
    }

    fn step_session(&mut self, session: &mut Session) -> Result<Option<Termination>> {
        // 1. Display size
        let display = self.surface.size().context("Failed to query display size")?;
        if display != self.display {
            self.apply_display_size(display, session)?;
        }

        // 2. + 3. Child output
        let output = match session.wait_readable(self.poll_interval) {
            Ok(true) => session.read(&mut self.buf),
            Ok(false) => Ok(ReadOutcome::Empty),
            Err(e) => Err(e),
        };
        match output {
            Ok(ReadOutcome::Data(n)) => {
                self.engine.feed(&self.buf[..n]);
                self.render_content()?;
            }
            Ok(ReadOutcome::Empty) => {}
            Ok(ReadOutcome::Eof) => {
                debug!("End of stream from child");
                return Ok(Some(end_of_stream(session)));
            }
            Err(e) => {
                warn!("{}; treating as end of stream", e);
                return Ok(Some(end_of_stream(session)));
            }
        }

        // 4. Keyboard
        if let Err(e) = session.flush_pending() {
            warn!("{}", e);
        }
        if let Some(event) = self.keys.next_event().context("Failed to read keyboard")? {
            if event != KeyEvent::Special(SpecialKey::Resize) {
                let bytes = KeyMapper::translate(&event);
                if let Err(e) = session.write(&bytes) {
                    warn!("{}", e);
                } else if session.pending_len() > 0 {
                    debug!("{} input bytes waiting for the child", session.pending_len());
                }
            }
        }

        // 5. Child exit
        match session.poll_exit() {
            Ok(Some(exit)) => {
                self.drain(session)?;
                return Ok(Some(Termination::ChildExited(exit)));
            }
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }

        Ok(None)
    }

    /// Recompute the chrome for `display` and pass a new viewport size on
    /// to `target`
    fn apply_display_size<T: WinsizeTarget + ?Sized>(&mut self, display: Size, target: &mut T) -> Result<()> {
        self.display = display;
        let outcome = self
            .coordinator
            .on_display_resize(display, target, self.engine.as_mut());
        self.geometry = Some(outcome.geometry);
        if outcome.repaint {
            self.painter.paint(&outcome.geometry, &mut self.surface)?;
            self.render_content()?;
        }
        Ok(())
    }

    /// Pick up output written just before the child exited
    fn drain(&mut self, session: &mut Session) -> Result<()> {
        let mut fed = false;
        for _ in 0..DRAIN_LIMIT {
            match session.read(&mut self.buf) {
                Ok(ReadOutcome::Data(n)) => {
                    self.engine.feed(&self.buf[..n]);
                    fed = true;
                }
                Ok(ReadOutcome::Empty | ReadOutcome::Eof) => break,
                Err(e) => {
                    debug!("Stopped draining: {}", e);
                    break;
                }
            }
        }
        if fed {
            self.render_content()?;
        }
        Ok(())
    }

    fn render_content(&mut self) -> Result<()> {
        let Some(geometry) = self.geometry else {
            return Ok(());
        };
        if let Some(grid) = self.engine.grid() {
            renderer::render(grid, &geometry.viewport, &mut self.surface)?;
        }
        self.surface.flush()?;
        Ok(())
    }
}

/// Classify the end of the child's output stream
fn end_of_stream(session: &mut Session) -> Termination {
    match session.reap(EOF_REAP_GRACE) {
        Ok(Some(exit)) => Termination::ChildExited(exit),
        Ok(None) => Termination::Eof,
        Err(e) => {
            warn!("{}", e);
            Termination::Eof
        }
    }
}
