//! User interface layout, rendering and input handling.
//!
//! - **layout**: chrome geometry for a display size
//! - **chrome**: paints the banner, frame, shadow and control bar
//! - **renderer**: copies the terminal grid into the viewport
//! - **surface**: display abstraction (crossterm or in-memory)
//! - **keymapper**: keyboard events to PTY bytes

pub mod chrome;
pub mod keymapper;
pub mod layout;
pub mod renderer;
pub mod surface;
