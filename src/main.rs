// src/main.rs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{Env, Shape};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    let filter = if cli.global.verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let env = Env::load(&cli.global)?;

    match cli.command {
        Commands::Setup { backend } => commands::cmd_setup(&env, backend),
        Commands::Status => commands::cmd_status(&env),
        Commands::Create {
            output,
            backend,
            width,
            height,
            depth,
        } => commands::cmd_create(
            &env,
            &output,
            backend,
            Shape {
                width,
                height,
                depth,
            },
        ),
        Commands::Check { model } => commands::cmd_check(&env, &model),
        Commands::Copy { input, output } => commands::cmd_copy(&env, &input, &output),
    }
}
