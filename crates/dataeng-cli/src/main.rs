use clap::Parser;
use dataeng::config::Config;
use dataeng::utils::logging::{init_logger, parse_level};
use log::LevelFilter;

mod cli;

use cli::dispatcher::Dispatcher;
use cli::main_types::Cli;

const LOG_NAME: &str = "dataeng-cli";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config_dir.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading config: {}", err);
            std::process::exit(1);
        }
    };

    // --verbose wins over the profile level
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        config
            .resolve_profile(cli.profile.as_deref())
            .log_level
            .and_then(|level| parse_level(&level).ok())
            .unwrap_or(LevelFilter::Warn)
    };
    init_logger(LOG_NAME, level);

    if cli.verbose {
        println!("Verbose mode is enabled");
        if let Some(config_dir) = &cli.config_dir {
            println!("Using config directory: {}", config_dir.display());
        }
    }

    let dispatcher = Dispatcher::new(config, cli.profile, cli.config_dir, cli.verbose);

    if let Err(e) = dispatcher.dispatch(cli.command).await {
        eprintln!("{} Error: {}", e.severity().emoji(), e);
        if let Some(hint) = e.troubleshooting_hint() {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}
