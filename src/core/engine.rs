//! Terminal engine capability
//!
//! The byte stream coming out of the child is decoded by a terminal engine
//! into a grid of styled cells. The multiplexer only feeds bytes in, resizes
//! the grid, and reads the grid back out. When no engine is wanted the
//! [`NullEngine`] keeps the session running without content rendering.

use tracing::debug;
use vt100::Parser;

use super::cell::{AttrFlags, Cell, CellColor, CellStyle};
use crate::ui::layout::{Position, Size};

/// Scrollback lines kept by the vt100 parser
const SCROLLBACK_LINES: usize = 1000;

/// Read access to a decoded character grid
pub trait TerminalGrid {
    /// Grid size
    fn size(&self) -> Size;

    /// Cells of one row, `size().cols` long. Rows outside the grid are empty.
    fn row(&self, row: u16) -> Vec<Cell>;

    /// Cursor position within the grid
    fn cursor(&self) -> Position;

    fn cursor_visible(&self) -> bool {
        true
    }
}

/// Decodes the child's byte stream into a grid
pub trait TerminalEngine {
    /// Feed raw bytes read from the PTY master
    fn feed(&mut self, bytes: &[u8]);

    /// Resize the grid
    fn resize(&mut self, cols: u16, rows: u16);

    /// The decoded grid, or None when this engine renders nothing
    fn grid(&self) -> Option<&dyn TerminalGrid>;

    /// Short engine name for logging
    fn name(&self) -> &'static str;
}

/// Which engine to build at startup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Vt100,
    /// Degraded mode: no content rendering
    None,
}

impl EngineKind {
    pub fn build(self, size: Size) -> Box<dyn TerminalEngine> {
        match self {
            EngineKind::Vt100 => Box::new(Vt100Engine::new(size)),
            EngineKind::None => Box::new(NullEngine),
        }
    }
}

/// Engine backed by the `vt100` crate
pub struct Vt100Engine {
    parser: Parser,
}

impl Vt100Engine {
    pub fn new(size: Size) -> Self {
        Self {
            parser: Parser::new(size.rows.max(1), size.cols.max(1), SCROLLBACK_LINES),
        }
    }
}

impl TerminalEngine for Vt100Engine {
    fn feed(&mut self, bytes: &[u8]) {
        self.parser.process(bytes);
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if self.parser.screen().size() == (rows, cols) {
            return;
        }
        debug!("vt100 grid resized to {}x{}", cols, rows);
        self.parser.set_size(rows, cols);
    }

    fn grid(&self) -> Option<&dyn TerminalGrid> {
        Some(self)
    }

    fn name(&self) -> &'static str {
        "vt100"
    }
}

impl TerminalGrid for Vt100Engine {
    fn size(&self) -> Size {
        let (rows, cols) = self.parser.screen().size();
        Size::new(rows, cols)
    }

    fn row(&self, row: u16) -> Vec<Cell> {
        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        if row >= rows {
            return Vec::new();
        }

        (0..cols)
            .map(|col| match screen.cell(row, col) {
                Some(cell) if cell.is_wide_continuation() => Cell::continuation(style_for_cell(cell)),
                Some(cell) => {
                    let text = if cell.has_contents() {
                        cell.contents().to_string()
                    } else {
                        " ".to_string()
                    };
                    Cell::new(text, style_for_cell(cell))
                }
                None => Cell::blank(),
            })
            .collect()
    }

    fn cursor(&self) -> Position {
        let (row, col) = self.parser.screen().cursor_position();
        Position::new(row, col)
    }

    fn cursor_visible(&self) -> bool {
        !self.parser.screen().hide_cursor()
    }
}

/// Convert vt100 cell attributes to a cell style
fn style_for_cell(cell: &vt100::Cell) -> CellStyle {
    let mut flags = AttrFlags::empty();
    if cell.bold() {
        flags |= AttrFlags::BOLD;
    }
    if cell.italic() {
        flags |= AttrFlags::ITALIC;
    }
    if cell.underline() {
        flags |= AttrFlags::UNDERLINE;
    }
    if cell.inverse() {
        flags |= AttrFlags::INVERSE;
    }

    CellStyle {
        fg: map_color(cell.fgcolor()),
        bg: map_color(cell.bgcolor()),
        flags,
    }
}

fn map_color(color: vt100::Color) -> CellColor {
    match color {
        vt100::Color::Default => CellColor::Default,
        vt100::Color::Idx(idx) => CellColor::Indexed(idx),
        vt100::Color::Rgb(r, g, b) => CellColor::Rgb(r, g, b),
    }
}

/// Engine used when content rendering is disabled
pub struct NullEngine;

impl TerminalEngine for NullEngine {
    fn feed(&mut self, _bytes: &[u8]) {}

    fn resize(&mut self, _cols: u16, _rows: u16) {}

    fn grid(&self) -> Option<&dyn TerminalGrid> {
        None
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(grid: &dyn TerminalGrid, row: u16) -> String {
        grid.row(row).iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_vt100_feed_and_read() {
        let mut engine = Vt100Engine::new(Size::new(4, 10));
        engine.feed(b"hi\r\nthere");

        let grid = engine.grid().unwrap();
        assert_eq!(grid.size(), Size::new(4, 10));
        assert_eq!(row_text(grid, 0), "hi        ");
        assert_eq!(row_text(grid, 1), "there     ");
        assert_eq!(grid.cursor(), Position::new(1, 5));
        assert!(grid.row(4).is_empty());
    }

    #[test]
    fn test_vt100_styles() {
        let mut engine = Vt100Engine::new(Size::new(2, 10));
        engine.feed(b"\x1b[1;31mR\x1b[0m");

        let cells = engine.grid().unwrap().row(0);
        assert_eq!(cells[0].text, "R");
        assert_eq!(cells[0].style.fg, CellColor::Indexed(1));
        assert!(cells[0].style.flags.contains(AttrFlags::BOLD));
        assert_eq!(cells[1].style, CellStyle::default());
    }

    #[test]
    fn test_vt100_wide_chars() {
        let mut engine = Vt100Engine::new(Size::new(1, 6));
        engine.feed("日本".as_bytes());

        let cells = engine.grid().unwrap().row(0);
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0].text, "日");
        assert!(cells[1].wide_continuation);
        assert_eq!(cells[2].text, "本");
        assert!(cells[3].wide_continuation);
    }

    #[test]
    fn test_vt100_resize() {
        let mut engine = Vt100Engine::new(Size::new(24, 80));
        engine.resize(40, 10);
        assert_eq!(engine.grid().unwrap().size(), Size::new(10, 40));

        // Zero is clamped rather than rejected
        engine.resize(0, 0);
        assert_eq!(engine.grid().unwrap().size(), Size::new(1, 1));
    }

    #[test]
    fn test_vt100_hidden_cursor() {
        let mut engine = Vt100Engine::new(Size::new(2, 2));
        assert!(engine.grid().unwrap().cursor_visible());
        engine.feed(b"\x1b[?25l");
        assert!(!engine.grid().unwrap().cursor_visible());
    }

    #[test]
    fn test_null_engine_has_no_grid() {
        let mut engine = EngineKind::None.build(Size::new(10, 10));
        engine.feed(b"anything");
        engine.resize(5, 5);
        assert!(engine.grid().is_none());
        assert_eq!(engine.name(), "none");
    }
}
