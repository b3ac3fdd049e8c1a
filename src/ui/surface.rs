//! Display surfaces
//!
//! The multiplexer draws through the [`DisplaySurface`] trait. The real
//! surface is the controlling terminal driven by crossterm; tests use an
//! in-memory grid.

use std::io::{self, BufWriter, Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use unicode_width::UnicodeWidthChar;

use crate::core::cell::{AttrFlags, Cell, CellStyle};
use crate::ui::layout::Size;

/// Where cells end up
pub trait DisplaySurface {
    /// Current display size
    fn size(&mut self) -> io::Result<Size>;

    /// Write cells left to right starting at (row, col), clipped to the display
    fn put_cells(&mut self, row: u16, col: u16, cells: &[Cell]) -> io::Result<()>;

    /// Write a string with one style, clipped to the display
    fn put_str(&mut self, row: u16, col: u16, text: &str, style: CellStyle) -> io::Result<()> {
        let cells: Vec<Cell> = text
            .chars()
            .flat_map(|ch| {
                let cell = Cell::new(ch.to_string(), style);
                if ch.width().unwrap_or(1) == 2 {
                    vec![cell, Cell::continuation(style)]
                } else {
                    vec![cell]
                }
            })
            .collect();
        self.put_cells(row, col, &cells)
    }

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()>;

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Clear the whole display
    fn clear(&mut self) -> io::Result<()>;

    /// Push buffered output to the display
    fn flush(&mut self) -> io::Result<()>;
}

/// The controlling terminal
pub struct CrosstermSurface {
    out: BufWriter<Stdout>,
    initialized: bool,
    size: Size,
    cursor_visible: bool,
}

impl CrosstermSurface {
    pub fn new() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
            initialized: false,
            size: Size::default(),
            cursor_visible: true,
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        self.initialized = true;
        Ok(())
    }

    /// Restore the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let _ = self.out.flush();
        let mut stdout = io::stdout();

        // Reset all attributes first
        let _ = execute!(stdout, ResetColor, SetAttribute(Attribute::Reset));
        let _ = execute!(stdout, Show);
        let _ = execute!(stdout, EnableLineWrap);
        let _ = execute!(stdout, LeaveAlternateScreen);
        let _ = stdout.flush();

        terminal::disable_raw_mode()
    }

    /// Set the window title
    pub fn set_title(&mut self, title: &str) -> io::Result<()> {
        write!(self.out, "\x1b]0;{}\x07", title)?;
        self.out.flush()
    }

    /// Apply cell attributes
    fn apply_style(&mut self, style: &CellStyle) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Reset))?;

        if style.flags.contains(AttrFlags::BOLD) {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if style.flags.contains(AttrFlags::ITALIC) {
            queue!(self.out, SetAttribute(Attribute::Italic))?;
        }
        if style.flags.contains(AttrFlags::UNDERLINE) {
            queue!(self.out, SetAttribute(Attribute::Underlined))?;
        }
        if style.flags.contains(AttrFlags::INVERSE) {
            queue!(self.out, SetAttribute(Attribute::Reverse))?;
        }

        queue!(
            self.out,
            SetForegroundColor(style.fg.to_crossterm()),
            SetBackgroundColor(style.bg.to_crossterm())
        )
    }
}

impl Default for CrosstermSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySurface for CrosstermSurface {
    fn size(&mut self) -> io::Result<Size> {
        let (cols, rows) = terminal::size()?;
        self.size = Size::new(rows, cols);
        Ok(self.size)
    }

    fn put_cells(&mut self, row: u16, col: u16, cells: &[Cell]) -> io::Result<()> {
        if row >= self.size.rows || col >= self.size.cols {
            return Ok(());
        }

        queue!(self.out, MoveTo(col, row))?;
        let mut x = col as usize;
        let mut current: Option<CellStyle> = None;
        for cell in cells {
            if cell.wide_continuation {
                x += 1;
                continue;
            }
            let width = cell.width();
            if x + width > self.size.cols as usize {
                break;
            }
            if current != Some(cell.style) {
                self.apply_style(&cell.style)?;
                current = Some(cell.style);
            }
            queue!(self.out, Print(&cell.text))?;
            x += width;
        }
        queue!(self.out, ResetColor, SetAttribute(Attribute::Reset))
    }

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible == self.cursor_visible {
            return Ok(());
        }
        self.cursor_visible = visible;
        if visible {
            queue!(self.out, Show)
        } else {
            queue!(self.out, Hide)
        }
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Clear(ClearType::All)
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Drop for CrosstermSurface {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// In-memory surface for tests
#[cfg(test)]
pub struct MemorySurface {
    size: Size,
    cells: Vec<Vec<Cell>>,
    pub cursor: (u16, u16),
    pub cursor_visible: bool,
    /// Writes that fell outside the display
    pub out_of_bounds: usize,
    pub flushes: usize,
    pub clears: usize,
}

#[cfg(test)]
impl MemorySurface {
    pub fn new(rows: u16, cols: u16) -> Self {
        let size = Size::new(rows, cols);
        Self {
            size,
            cells: Self::blank_grid(size),
            cursor: (0, 0),
            cursor_visible: true,
            out_of_bounds: 0,
            flushes: 0,
            clears: 0,
        }
    }

    fn blank_grid(size: Size) -> Vec<Vec<Cell>> {
        vec![vec![Cell::blank(); size.cols as usize]; size.rows as usize]
    }

    /// Simulate the user resizing the display
    pub fn set_size(&mut self, rows: u16, cols: u16) {
        self.size = Size::new(rows, cols);
        self.cells = Self::blank_grid(self.size);
    }

    pub fn cell(&self, row: u16, col: u16) -> &Cell {
        &self.cells[row as usize][col as usize]
    }

    /// Text of a row, continuation cells omitted
    pub fn row_text(&self, row: u16) -> String {
        self.cells[row as usize]
            .iter()
            .filter(|c| !c.wide_continuation)
            .map(|c| c.text.as_str())
            .collect()
    }

    /// Text of a row slice
    pub fn text_at(&self, row: u16, col: u16, len: u16) -> String {
        self.cells[row as usize][col as usize..(col + len) as usize]
            .iter()
            .filter(|c| !c.wide_continuation)
            .map(|c| c.text.as_str())
            .collect()
    }

    /// Whether any row contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        (0..self.size.rows).any(|row| self.row_text(row).contains(needle))
    }
}

#[cfg(test)]
impl DisplaySurface for MemorySurface {
    fn size(&mut self) -> io::Result<Size> {
        Ok(self.size)
    }

    fn put_cells(&mut self, row: u16, col: u16, cells: &[Cell]) -> io::Result<()> {
        let mut x = col as usize;
        for cell in cells {
            if row >= self.size.rows || x >= self.size.cols as usize {
                self.out_of_bounds += 1;
            } else {
                self.cells[row as usize][x] = cell.clone();
            }
            x += 1;
        }
        Ok(())
    }

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        if row >= self.size.rows || col >= self.size.cols {
            self.out_of_bounds += 1;
        }
        self.cursor = (row, col);
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_visible = visible;
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.cells = Self::blank_grid(self.size);
        self.clears += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_surface_put_str() {
        let mut surface = MemorySurface::new(3, 10);
        surface.put_str(1, 2, "abc", CellStyle::default()).unwrap();

        assert_eq!(surface.row_text(1), "  abc     ");
        assert_eq!(surface.out_of_bounds, 0);
    }

    #[test]
    fn test_memory_surface_counts_out_of_bounds() {
        let mut surface = MemorySurface::new(2, 4);
        surface.put_str(0, 2, "abcd", CellStyle::default()).unwrap();
        surface.put_str(5, 0, "x", CellStyle::default()).unwrap();

        assert_eq!(surface.row_text(0), "  ab");
        assert_eq!(surface.out_of_bounds, 3);
    }

    #[test]
    fn test_put_str_wide_chars_take_two_columns() {
        let mut surface = MemorySurface::new(1, 6);
        surface.put_str(0, 0, "日x", CellStyle::default()).unwrap();

        assert_eq!(surface.cell(0, 0).text, "日");
        assert!(surface.cell(0, 1).wide_continuation);
        assert_eq!(surface.cell(0, 2).text, "x");
    }

    #[test]
    fn test_set_size_resets_grid() {
        let mut surface = MemorySurface::new(2, 2);
        surface.put_str(0, 0, "ab", CellStyle::default()).unwrap();
        surface.set_size(3, 5);

        assert_eq!(surface.size().unwrap(), Size::new(3, 5));
        assert_eq!(surface.row_text(0), "     ");
    }
}
