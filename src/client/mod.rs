//! Client fetcher subsystem.
//!
//! # Data Flow
//! ```text
//! Session start (on_init, once)
//!     → fetcher.rs (logical URL → registry or DNS → single GET)
//!     → display.rs (Loading → Success | Failed, exactly once)
//!     → Renderers read the display handle
//! ```

pub mod display;
pub mod fetcher;

pub use display::{display_cell, DisplayHandle, DisplayState, DisplayWriter};
pub use fetcher::{ClientSession, FetchError, Fetcher, Route};
