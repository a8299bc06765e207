use anyhow::{Result, bail};
use std::path::Path;

use crate::ui::prelude::{Level, log_event};

use super::cli::{ConfigCommands, RecapCommands};
use super::config::{RecapConfig, config_path};
use super::render::handle_render;
use super::schedule::{handle_rank, handle_timeline};

pub async fn handle_recap_command(command: RecapCommands, config_file: Option<&Path>) -> Result<()> {
    match command {
        RecapCommands::Rank(args) => handle_rank(args, RecapConfig::load(config_file)?),
        RecapCommands::Timeline(args) => handle_timeline(args, RecapConfig::load(config_file)?),
        RecapCommands::Render(args) => handle_render(args, RecapConfig::load(config_file)?)
            .await
            .map(|_| ()),
        RecapCommands::Config(command) => handle_config_command(command, config_file),
    }
}

fn handle_config_command(command: ConfigCommands, config_file: Option<&Path>) -> Result<()> {
    let path = match config_file {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };

    match command {
        ConfigCommands::Show => {
            let config = RecapConfig::load_from_path(&path)?;
            log_event(
                Level::Debug,
                "recap.config.path",
                format!("Configuration file: {}", path.display()),
            );
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file {} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            RecapConfig::default().save_to_path(&path)?;
            log_event(
                Level::Success,
                "recap.config.init",
                format!("Wrote default configuration to {}", path.display()),
            );
            Ok(())
        }
    }
}
