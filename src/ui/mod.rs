//! Terminal post viewer behind `gator tui`.
//!
//! - `loop_runner` - event loop and terminal management
//! - `input` - key handling
//! - `render` - list and status bar drawing
//! - `state` - the post list and its cursor

mod input;
mod loop_runner;
mod render;
mod state;

pub use loop_runner::run;
