pub mod app;
pub mod commands;
pub mod repl;
pub mod terminal;

pub use app::{Cli, Commands};
