use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopvault::cli::commands;
use shopvault::cli::{Cli, Commands};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "shopvault=warn".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Status => commands::status::execute(&cli),
        Commands::Lock => commands::lock::execute(&cli),
        Commands::Passwd => commands::passwd::execute(&cli),
        Commands::Migrate => commands::migrate::execute(&cli),
        Commands::Cred { ref action } => commands::cred::execute(&cli, action),
        Commands::Card { ref action } => commands::card::execute(&cli, action),
        Commands::Generate { length, no_symbols } => commands::generate::execute(length, no_symbols),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::Completions { ref shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(),
    };

    if let Err(e) = result {
        shopvault::cli::output::report(&e);
        std::process::exit(1);
    }
}
