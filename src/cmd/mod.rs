//! Subcommand implementations

pub mod control;
pub mod list;
pub mod wake;
