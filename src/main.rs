use std::path::PathBuf;

use clap::Parser;

mod config;
mod console;
mod deadline;
mod door;
mod hal;
mod manager;
mod messages;
mod mqtt;
mod node;
mod office;
#[cfg(test)]
mod testing;

/// Busy light for an office and its door, coordinated over MQTT.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Which node to run; overrides `[node] role` in the config file
    #[arg(value_enum)]
    role: Option<config::Role>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let config = config::AppConfig::load(&cli.config)?;
    let role = config.role(cli.role)?;

    log::debug!("Config: {:?}", config);

    manager::Manager::new(config, role).run_loop().await
}
