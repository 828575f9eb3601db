//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, PhotosAction, StripsAction};
pub use commands::{capture, handle_config_action, run, CommandError};
pub use enums::Filter;
