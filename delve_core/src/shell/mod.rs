//! # Shell Module
//!
//! Entry point and CLI logic for the `delve` binary.

pub mod cli;

pub use cli::{Cli, Mode, exit_code_for, load_config, run};
