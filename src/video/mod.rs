pub mod cli;
pub mod commands;
mod config;
mod errors;
mod matching;
mod pipeline;
mod ranking;
mod render;
mod schedule;
mod segments;
mod support;
mod timeline;

pub use cli::RecapCommands;
pub use commands::handle_recap_command;
