//! Resize coordination
//!
//! Turns display-size changes into chrome geometry, and pushes viewport
//! size changes to the child and the engine. Only the viewport *size* is
//! propagated; moving the viewport without resizing it leaves the child
//! alone but still asks for a chrome repaint.

use tracing::{debug, info, warn};

use super::engine::TerminalEngine;
use super::pty::PtyError;
use crate::ui::layout::{self, ChromeConfig, ChromeGeometry, Size};

/// Something that accepts window-size changes
pub trait WinsizeTarget {
    fn set_size(&mut self, size: Size) -> Result<(), PtyError>;
}

/// What a display-size change led to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub geometry: ChromeGeometry,
    /// New viewport size sent to the child, if any
    pub propagated: Option<Size>,
    /// Chrome must be repainted
    pub repaint: bool,
}

/// Tracks the last propagated viewport size
pub struct ResizeCoordinator {
    config: ChromeConfig,
    last_propagated: Size,
    last_geometry: Option<ChromeGeometry>,
}

impl ResizeCoordinator {
    /// `initial` is the size the child was spawned with
    pub fn new(config: ChromeConfig, initial: Size) -> Self {
        Self {
            config,
            last_propagated: initial,
            last_geometry: None,
        }
    }

    /// Viewport size the child currently knows about
    #[cfg(test)]
    pub fn last_propagated(&self) -> Size {
        self.last_propagated
    }

    /// React to a new display size.
    ///
    /// A child that refuses the new size keeps its old one; the failure is
    /// logged and retried on the next size change.
    pub fn on_display_resize<T: WinsizeTarget + ?Sized>(
        &mut self,
        display: Size,
        target: &mut T,
        engine: &mut dyn TerminalEngine,
    ) -> ResizeOutcome {
        let geometry = layout::compute(display, &self.config);
        let repaint = self.last_geometry != Some(geometry);
        self.last_geometry = Some(geometry);

        let (cols, rows) = (display.cols, display.rows);
        let propagated = match geometry.viewport.size() {
            Some(size) if size != self.last_propagated => match target.set_size(size) {
                Ok(()) => {
                    engine.resize(size.cols, size.rows);
                    self.last_propagated = size;
                    info!(
                        "Viewport resized to {}x{} (display {}x{})",
                        size.cols, size.rows, cols, rows
                    );
                    Some(size)
                }
                Err(e) => {
                    warn!("Failed to resize child to {}x{}: {}", size.cols, size.rows, e);
                    None
                }
            },
            Some(_) => None,
            None => {
                debug!("Display {}x{} too small, size not propagated", cols, rows);
                None
            }
        };

        ResizeOutcome {
            geometry,
            propagated,
            repaint,
        }
    }
}
