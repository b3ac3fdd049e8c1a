//! Styled character cells
//!
//! The unit of exchange between the terminal engine, the chrome painter and
//! the display surface.

use bitflags::bitflags;
use unicode_width::UnicodeWidthStr;

/// Color definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CellColor {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl CellColor {
    /// Convert to crossterm color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        match self {
            CellColor::Default => crossterm::style::Color::Reset,
            CellColor::Indexed(n) => crossterm::style::Color::AnsiValue(n),
            CellColor::Rgb(r, g, b) => crossterm::style::Color::Rgb { r, g, b },
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AttrFlags: u8 {
        const BOLD      = 0b0000_0001;
        const ITALIC    = 0b0000_0100;
        const UNDERLINE = 0b0000_1000;
        const INVERSE   = 0b0001_0000;
    }
}

/// Colors and attributes of a cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: CellColor,
    pub bg: CellColor,
    pub flags: AttrFlags,
}

impl CellStyle {
    pub const fn new(fg: CellColor, bg: CellColor) -> Self {
        Self {
            fg,
            bg,
            flags: AttrFlags::empty(),
        }
    }
}

/// A single grid cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Grapheme shown in the cell (may hold combining marks)
    pub text: String,
    pub style: CellStyle,
    /// Right half of a wide character; occupies a column but draws nothing
    pub wide_continuation: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

impl Cell {
    /// A space with default style
    pub fn blank() -> Self {
        Self {
            text: " ".to_string(),
            style: CellStyle::default(),
            wide_continuation: false,
        }
    }

    pub fn new(text: impl Into<String>, style: CellStyle) -> Self {
        Self {
            text: text.into(),
            style,
            wide_continuation: false,
        }
    }

    pub fn continuation(style: CellStyle) -> Self {
        Self {
            text: String::new(),
            style,
            wide_continuation: true,
        }
    }

    /// Display width in columns
    pub fn width(&self) -> usize {
        if self.wide_continuation {
            0
        } else {
            self.text.width().max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_width() {
        assert_eq!(Cell::blank().width(), 1);
        assert_eq!(Cell::new("a", CellStyle::default()).width(), 1);
        assert_eq!(Cell::new("日", CellStyle::default()).width(), 2);
        assert_eq!(Cell::continuation(CellStyle::default()).width(), 0);
        // Empty text still takes a column
        assert_eq!(Cell::new("", CellStyle::default()).width(), 1);
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(CellColor::Default.to_crossterm(), crossterm::style::Color::Reset);
        assert_eq!(
            CellColor::Indexed(4).to_crossterm(),
            crossterm::style::Color::AnsiValue(4)
        );
        assert_eq!(
            CellColor::Rgb(1, 2, 3).to_crossterm(),
            crossterm::style::Color::Rgb { r: 1, g: 2, b: 3 }
        );
    }
}
