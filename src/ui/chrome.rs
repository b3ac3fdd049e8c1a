//! Chrome painter
//!
//! Paints everything around the viewport: the banner, the frame band, the
//! background below it, the bordered frame with its drop shadow, and the
//! control bar. The viewport interior is cleared so the renderer starts
//! from blank cells.

use std::io;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use unicode_width::UnicodeWidthChar;

use crate::core::cell::{AttrFlags, Cell, CellColor, CellStyle};
use crate::ui::layout::{ChromeGeometry, Rect, Size, ViewportGeometry};
use crate::ui::surface::DisplaySurface;

const CONTROL_BAR_TOP: &str = " ESC  /  -   CTRL   ALT  PGUP";
const CONTROL_BAR_BOTTOM: &str = " HOME  END    ▲   ◀   ▼   ▶   PGDN";

/// Shown at the top-left while the display cannot hold the frame
pub const TOO_SMALL_ADVISORY: &str = "Too small";

/// Chrome colors as RGB triples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Rows below the frame band
    pub background: [u8; 3],
    pub banner: [u8; 3],
    /// Rows the frame sits in
    pub band: [u8; 3],
    pub border: [u8; 3],
    pub shadow: [u8; 3],
    pub bar_fg: [u8; 3],
    pub bar_bg: [u8; 3],
    /// Text on the banner
    pub title: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: [20, 40, 60],
            banner: [35, 45, 60],
            band: [28, 70, 120],
            border: [255, 105, 180],
            shadow: [60, 60, 90],
            bar_fg: [245, 245, 245],
            bar_bg: [0, 0, 0],
            title: "sfterm".to_string(),
        }
    }
}

fn rgb(c: [u8; 3]) -> CellColor {
    CellColor::Rgb(c[0], c[1], c[2])
}

/// Paints the static chrome
pub struct ChromePainter {
    theme: Theme,
    banner_height: u16,
    frame_height: u16,
    degraded: bool,
}

impl ChromePainter {
    pub fn new(theme: Theme, banner_height: u16, frame_height: u16) -> Self {
        Self {
            theme,
            banner_height,
            frame_height,
            degraded: false,
        }
    }

    /// Whether the last paint found the display too small
    #[cfg(test)]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Repaint the whole chrome for `geometry`
    pub fn paint(&mut self, geometry: &ChromeGeometry, surface: &mut dyn DisplaySurface) -> io::Result<()> {
        let display = geometry.display;
        surface.clear()?;
        if display.rows == 0 || display.cols == 0 {
            return Ok(());
        }

        for row in 0..display.rows {
            let style = CellStyle::new(CellColor::Default, self.row_background(row));
            surface.put_cells(row, 0, &fill(style, display.cols))?;
        }
        self.paint_title(geometry, surface)?;

        if let Some(frame) = geometry.frame {
            self.paint_border(&frame, surface)?;
            if frame.bottom() < display.rows.saturating_sub(2) && frame.right() < display.cols {
                self.paint_shadow(&frame, surface)?;
            }
        }
        if let ViewportGeometry::Viewport { origin, size } = geometry.viewport {
            for row in 0..size.rows {
                surface.put_cells(origin.row + row, origin.col, &fill(CellStyle::default(), size.cols))?;
            }
        }

        self.paint_control_bar(geometry, surface)?;

        let too_small = geometry.viewport.is_too_small();
        if too_small {
            put_clipped(surface, display, 0, 0, TOO_SMALL_ADVISORY, CellStyle::default())?;
            if !self.degraded {
                let (cols, rows) = (display.cols, display.rows);
                warn!("Display {}x{} too small for the frame", cols, rows);
            }
        } else if self.degraded {
            let (cols, rows) = (display.cols, display.rows);
            info!("Display {}x{} large enough again", cols, rows);
        }
        self.degraded = too_small;

        surface.flush()
    }

    /// Background color of a display row
    fn row_background(&self, row: u16) -> CellColor {
        if row < self.banner_height {
            rgb(self.theme.banner)
        } else if row < self.banner_height.saturating_add(self.frame_height) {
            rgb(self.theme.band)
        } else {
            rgb(self.theme.background)
        }
    }

    fn paint_title(&self, geometry: &ChromeGeometry, surface: &mut dyn DisplaySurface) -> io::Result<()> {
        let banner = geometry.banner;
        if banner.is_empty() || self.theme.title.is_empty() {
            return Ok(());
        }
        let row = banner.size.rows / 2;
        let mut style = CellStyle::new(rgb(self.theme.border), rgb(self.theme.banner));
        style.flags = AttrFlags::BOLD;
        put_clipped(surface, geometry.display, row, 2, &self.theme.title, style)
    }

    fn paint_border(&self, frame: &Rect, surface: &mut dyn DisplaySurface) -> io::Result<()> {
        let style = CellStyle::new(rgb(self.theme.border), rgb(self.theme.band));
        let inner = frame.size.cols.saturating_sub(2) as usize;
        let (top, bottom) = (frame.origin.row, frame.bottom() - 1);
        let (left, right) = (frame.origin.col, frame.right() - 1);

        surface.put_str(top, left, &format!("┌{}┐", "─".repeat(inner)), style)?;
        for row in top + 1..bottom {
            surface.put_str(row, left, "│", style)?;
            surface.put_str(row, right, "│", style)?;
        }
        surface.put_str(bottom, left, &format!("└{}┘", "─".repeat(inner)), style)
    }

    fn paint_shadow(&self, frame: &Rect, surface: &mut dyn DisplaySurface) -> io::Result<()> {
        let below = frame.bottom();
        let under = CellStyle::new(rgb(self.theme.shadow), self.row_background(below));
        let width = frame.size.cols.saturating_sub(2) as usize;
        surface.put_str(below, frame.origin.col + 1, &"▀".repeat(width), under)?;

        for row in frame.origin.row + 1..frame.bottom() {
            let side = CellStyle::new(rgb(self.theme.shadow), self.row_background(row));
            surface.put_str(row, frame.right(), "▒", side)?;
        }
        Ok(())
    }

    fn paint_control_bar(&self, geometry: &ChromeGeometry, surface: &mut dyn DisplaySurface) -> io::Result<()> {
        let bar = geometry.control_bar;
        let style = CellStyle::new(rgb(self.theme.bar_fg), rgb(self.theme.bar_bg));
        let lines = [CONTROL_BAR_TOP, CONTROL_BAR_BOTTOM];

        // A one-row bar shows only the bottom line
        let skip = lines.len() - bar.size.rows as usize;
        for (i, line) in lines.iter().skip(skip).enumerate() {
            let row = bar.origin.row + i as u16;
            surface.put_cells(row, 0, &fill(style, bar.size.cols))?;
            put_clipped(surface, geometry.display, row, 0, line, style)?;
        }
        Ok(())
    }
}

fn fill(style: CellStyle, cols: u16) -> Vec<Cell> {
    vec![Cell::new(" ", style); cols as usize]
}

/// Write `text` cut to what fits on the display
fn put_clipped(
    surface: &mut dyn DisplaySurface,
    display: Size,
    row: u16,
    col: u16,
    text: &str,
    style: CellStyle,
) -> io::Result<()> {
    if row >= display.rows || col >= display.cols {
        return Ok(());
    }
    let room = (display.cols - col) as usize;
    let mut used = 0;
    let clipped: String = text
        .chars()
        .take_while(|ch| {
            used += ch.width().unwrap_or(0);
            used <= room
        })
        .collect();
    surface.put_str(row, col, &clipped, style)
}
