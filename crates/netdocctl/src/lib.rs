//! NetDoc Control library - exposes modules for testing.

pub mod cli;
pub mod menu;
pub mod output;
pub mod session;
