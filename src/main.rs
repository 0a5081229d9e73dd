use clap::Parser;
use colored::Colorize;
use radb::cli::{Cli, Commands};
use radb::subcommands;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let result = match cli.command() {
        Commands::Devices => subcommands::devices::run(&cli),
        Commands::Shell { command } => subcommands::shell::run(&cli, &command),
        Commands::Push {
            local,
            remote,
            verify,
        } => subcommands::push::run(&cli, &local, &remote, verify),
        Commands::Pull { remote, local } => subcommands::pull::run(&cli, &remote, &local),
        Commands::Ls { path } => subcommands::ls::run(&cli, &path),
        Commands::Stat { path } => subcommands::stat::run(&cli, &path),
        Commands::Getprop { propnames } => subcommands::getprop::run(&cli, &propnames).await,
        Commands::Version => subcommands::version::run(&cli),
        Commands::Server { operation } => subcommands::server::run(&cli, operation),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
