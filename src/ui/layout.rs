//! Chrome layout - splits the display into banner, frame and control bar
//!
//! ```text
//! row 0            ┌──────────────────────────────┐
//!   ..             │ banner (banner_height rows)  │
//!                  ├──────────────────────────────┤
//!                  │  ┌────── frame ──────────┐   │
//!                  │  │ viewport (live shell) │   │
//!                  │  └───────────────────────┘   │
//!                  │  background                  │
//! rows - 2         │ control bar (2 rows)         │
//!                  └──────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Rows reserved at the bottom of the display for the control bar
pub const CONTROL_BAR_HEIGHT: u16 = 2;

/// Smallest frame (border included) that still leaves a usable viewport
pub const MIN_FRAME_ROWS: u16 = 3;
pub const MIN_FRAME_COLS: u16 = 6;

/// A size in character cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub rows: u16,
    pub cols: u16,
}

impl Size {
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

/// A cell position (0-based)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub row: u16,
    pub col: u16,
}

impl Position {
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// A rectangle on the display
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub origin: Position,
    pub size: Size,
}

impl Rect {
    pub const fn new(row: u16, col: u16, rows: u16, cols: u16) -> Self {
        Self {
            origin: Position::new(row, col),
            size: Size::new(rows, cols),
        }
    }

    /// First row below the rectangle
    pub fn bottom(&self) -> u16 {
        self.origin.row.saturating_add(self.size.rows)
    }

    /// First column right of the rectangle
    pub fn right(&self) -> u16 {
        self.origin.col.saturating_add(self.size.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.size.rows == 0 || self.size.cols == 0
    }

    /// The rectangle shrunk by one cell on every side (border excluded)
    pub fn inner(&self) -> Rect {
        Rect::new(
            self.origin.row + 1,
            self.origin.col + 1,
            self.size.rows.saturating_sub(2),
            self.size.cols.saturating_sub(2),
        )
    }

    /// Whether the rectangle lies entirely within a display of the given size
    pub fn fits_in(&self, display: Size) -> bool {
        self.bottom() <= display.rows && self.right() <= display.cols
    }
}

/// Where live terminal content goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportGeometry {
    Viewport { origin: Position, size: Size },
    /// The display cannot hold the minimum frame
    TooSmall,
}

impl ViewportGeometry {
    /// Viewport size, if there is one
    pub fn size(&self) -> Option<Size> {
        match self {
            ViewportGeometry::Viewport { size, .. } => Some(*size),
            ViewportGeometry::TooSmall => None,
        }
    }

    pub fn is_too_small(&self) -> bool {
        matches!(self, ViewportGeometry::TooSmall)
    }
}

/// Geometry knobs for the chrome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    /// Rows taken by the banner at the top
    pub banner_height: u16,
    /// Rows taken by the frame band (border included)
    pub frame_height: u16,
    /// Columns left blank left of the frame
    pub inset_left: u16,
    /// Columns left blank right of the frame
    pub inset_right: u16,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            banner_height: 6,
            frame_height: 12,
            inset_left: 2,
            inset_right: 2,
        }
    }
}

/// Every rectangle of the chrome for one display size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChromeGeometry {
    pub display: Size,
    pub banner: Rect,
    /// The bordered frame, absent when the display is too small
    pub frame: Option<Rect>,
    pub control_bar: Rect,
    pub viewport: ViewportGeometry,
}

/// Compute the chrome for a display size.
///
/// Pure and deterministic. The banner is clamped to the display, the frame
/// is clamped to what is left above the control bar, and the control bar
/// always takes the bottom two rows.
pub fn compute(display: Size, config: &ChromeConfig) -> ChromeGeometry {
    let banner_rows = config.banner_height.min(display.rows);
    let banner = Rect::new(0, 0, banner_rows, display.cols);

    let bar_rows = CONTROL_BAR_HEIGHT.min(display.rows);
    let control_bar = Rect::new(display.rows - bar_rows, 0, bar_rows, display.cols);

    let frame_rows = config
        .frame_height
        .min(display.rows.saturating_sub(banner_rows.saturating_add(CONTROL_BAR_HEIGHT)));
    let frame_cols = display
        .cols
        .saturating_sub(config.inset_left.saturating_add(config.inset_right));

    if frame_rows < MIN_FRAME_ROWS || frame_cols < MIN_FRAME_COLS {
        return ChromeGeometry {
            display,
            banner,
            frame: None,
            control_bar,
            viewport: ViewportGeometry::TooSmall,
        };
    }

    let frame = Rect::new(banner_rows, config.inset_left, frame_rows, frame_cols);
    debug_assert!(frame.fits_in(display));
    let inner = frame.inner();

    ChromeGeometry {
        display,
        banner,
        frame: Some(frame),
        control_bar,
        viewport: ViewportGeometry::Viewport {
            origin: inner.origin,
            size: inner.size,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_layout_80x24() {
        let geometry = compute(Size::new(24, 80), &ChromeConfig::default());

        assert_eq!(geometry.banner, Rect::new(0, 0, 6, 80));
        assert_eq!(geometry.frame, Some(Rect::new(6, 2, 12, 76)));
        assert_eq!(geometry.control_bar, Rect::new(22, 0, 2, 80));
        assert_eq!(
            geometry.viewport,
            ViewportGeometry::Viewport {
                origin: Position::new(7, 3),
                size: Size::new(10, 74),
            }
        );
    }

    #[test]
    fn test_frame_clamped_above_control_bar() {
        // 6 banner rows + 2 bar rows leave 4 rows for the frame
        let geometry = compute(Size::new(12, 40), &ChromeConfig::default());

        assert_eq!(geometry.frame, Some(Rect::new(6, 2, 4, 36)));
        assert_eq!(geometry.viewport.size(), Some(Size::new(2, 34)));
    }

    #[test]
    fn test_minimum_frame_is_accepted() {
        let config = ChromeConfig::default();
        let geometry = compute(Size::new(6 + 3 + 2, 2 + 2 + 6), &config);

        assert_eq!(geometry.frame, Some(Rect::new(6, 2, 3, 6)));
        assert_eq!(geometry.viewport.size(), Some(Size::new(1, 4)));
    }

    #[test]
    fn test_too_small() {
        let config = ChromeConfig::default();

        // One row short
        assert!(compute(Size::new(10, 80), &config).viewport.is_too_small());
        // One column short
        assert!(compute(Size::new(24, 9), &config).viewport.is_too_small());
        // Degenerate
        assert!(compute(Size::new(0, 0), &config).viewport.is_too_small());
    }

    #[test]
    fn test_tiny_display_clamps_everything() {
        let geometry = compute(Size::new(1, 3), &ChromeConfig::default());

        assert_eq!(geometry.banner, Rect::new(0, 0, 1, 3));
        assert_eq!(geometry.control_bar, Rect::new(0, 0, 1, 3));
        assert_eq!(geometry.frame, None);
    }

    #[test]
    fn test_custom_insets() {
        let config = ChromeConfig {
            banner_height: 2,
            frame_height: 8,
            inset_left: 5,
            inset_right: 1,
        };
        let geometry = compute(Size::new(30, 50), &config);

        assert_eq!(geometry.frame, Some(Rect::new(2, 5, 8, 44)));
        assert_eq!(
            geometry.viewport,
            ViewportGeometry::Viewport {
                origin: Position::new(3, 6),
                size: Size::new(6, 42),
            }
        );
    }

    fn arb_config() -> impl Strategy<Value = ChromeConfig> {
        (0u16..20, 0u16..30, 0u16..10, 0u16..10).prop_map(
            |(banner_height, frame_height, inset_left, inset_right)| ChromeConfig {
                banner_height,
                frame_height,
                inset_left,
                inset_right,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_geometry_contained_in_display(
            rows in 0u16..200,
            cols in 0u16..300,
            config in arb_config(),
        ) {
            let display = Size::new(rows, cols);
            let geometry = compute(display, &config);

            prop_assert!(geometry.banner.fits_in(display));
            prop_assert!(geometry.control_bar.fits_in(display));
            if let Some(frame) = geometry.frame {
                prop_assert!(frame.fits_in(display));
                prop_assert!(frame.bottom() <= display.rows - CONTROL_BAR_HEIGHT);
            }
            if let ViewportGeometry::Viewport { origin, size } = geometry.viewport {
                let viewport = Rect { origin, size };
                prop_assert!(viewport.fits_in(display));
                prop_assert!(!viewport.is_empty());
            }
        }

        #[test]
        fn prop_threshold_decides_too_small(
            rows in 0u16..100,
            cols in 0u16..100,
            config in arb_config(),
        ) {
            let geometry = compute(Size::new(rows, cols), &config);
            let fits_rows = config.frame_height >= MIN_FRAME_ROWS
                && rows >= config.banner_height + MIN_FRAME_ROWS + CONTROL_BAR_HEIGHT;
            let fits_cols = cols >= config.inset_left + config.inset_right + MIN_FRAME_COLS;

            prop_assert_eq!(!geometry.viewport.is_too_small(), fits_rows && fits_cols);
        }
    }
}
