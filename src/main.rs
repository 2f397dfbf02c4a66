mod assembler;
mod categorizer;
mod classifier;
mod cli;
mod error;
mod fmt;
mod loader;
mod locator;
mod logging;
mod models;
mod pairer;
mod pipeline;
mod settings;
mod splitter;
mod workspace;
mod writer;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_str());
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init { force } => cli::init::run(config, force),
        Commands::Run {
            source,
            result,
            no_move,
            wait,
        } => cli::run::run(cli::run::RunArgs {
            config,
            source: source.as_deref(),
            result: result.as_deref(),
            no_move,
            wait,
        }),
        Commands::Inspect { file, rows } => cli::inspect::run(config, &file, rows),
        Commands::Rules => cli::rules::list(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
