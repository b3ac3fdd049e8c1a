//! Viewport renderer
//!
//! Copies the engine's grid into the viewport rectangle, padding or clipping
//! each row to the viewport width, and places the cursor.

use std::io;

use crate::core::cell::Cell;
use crate::core::engine::TerminalGrid;
use crate::ui::layout::ViewportGeometry;
use crate::ui::surface::DisplaySurface;

/// Render `grid` into the viewport.
///
/// Nothing is written when the geometry is `TooSmall`. The grid and the
/// viewport may disagree on size in either direction.
pub fn render(
    grid: &dyn TerminalGrid,
    geometry: &ViewportGeometry,
    surface: &mut dyn DisplaySurface,
) -> io::Result<()> {
    let (origin, size) = match *geometry {
        ViewportGeometry::Viewport { origin, size } => (origin, size),
        ViewportGeometry::TooSmall => return Ok(()),
    };
    if size.rows == 0 || size.cols == 0 {
        return Ok(());
    }

    for row in 0..size.rows {
        let cells = fit_row(grid.row(row), size.cols);
        surface.put_cells(origin.row + row, origin.col, &cells)?;
    }

    let cursor = grid.cursor();
    let row = cursor.row.min(size.rows - 1);
    let col = cursor.col.min(size.cols - 1);
    surface.set_cursor(origin.row + row, origin.col + col)?;
    surface.set_cursor_visible(grid.cursor_visible())
}

/// Pad with blanks or truncate to exactly `cols` columns
pub fn fit_row(mut cells: Vec<Cell>, cols: u16) -> Vec<Cell> {
    let cols = cols as usize;
    cells.truncate(cols);

    // A wide character cut in half by the right edge becomes a blank
    if let Some(last) = cells.last_mut() {
        if last.width() > 1 {
            *last = Cell::new(" ", last.style);
        }
    }

    cells.resize(cols, Cell::blank());
    cells
}
