//! Command-line surface: command handlers and terminal output.

pub mod commands;
pub mod ui;
pub mod util;

pub use ui::Output;
pub use util::{open_database, require_database};
