mod common;
mod ui;
mod video;

use clap::Parser;
use std::path::PathBuf;

use crate::ui::prelude::{Level, OutputFormat, emit};
use crate::video::{RecapCommands, handle_recap_command};

/// Overlay the key points of a recorded talk next to the speaker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for events
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    /// Use this configuration file instead of the default location
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: RecapCommands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.format, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = handle_recap_command(cli.command, cli.config.as_deref()).await {
        emit(
            Level::Error,
            "recap.error",
            &format!("Error: {err:#}"),
            Some(serde_json::json!({ "chain": err.chain().map(|e| e.to_string()).collect::<Vec<_>>() })),
        );
        std::process::exit(1);
    }
}
