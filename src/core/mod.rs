//! Core session plumbing.
//!
//! - **cell**: styled character cells shared by the engine and the display
//! - **engine**: terminal engine capability (vt100 or none)
//! - **pty**: non-blocking pseudo-terminal wrapper over portable-pty
//! - **session**: the one child process and its PTY master
//! - **resize**: display-size changes to viewport-size propagation
//! - **mux**: the single-threaded run loop
//!
//! # Architecture
//!
//! ```text
//! Multiplexer
//! ├── Session (PTY master + child)
//! ├── TerminalEngine (bytes -> grid)
//! ├── ResizeCoordinator (display size -> viewport size)
//! └── DisplaySurface + KeySource (from ui)
//! ```

pub mod cell;
pub mod engine;
pub mod mux;
pub mod pty;
pub mod resize;
pub mod session;
