use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gnome_inventory::cli::{Cli, Commands};
use gnome_inventory::commands;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Load(args) => commands::load::run(&cli.store, args),
        Commands::Status(args) => commands::status::run(&cli.store, args),
        Commands::Find(args) => commands::find::run_find(&cli.store, args),
        Commands::Distinct(args) => commands::find::run_distinct(&cli.store, args),
        Commands::Last(args) => commands::find::run_last(&cli.store, args),
        Commands::AddUser(args) => commands::users::run_add_user(&cli.store, args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
