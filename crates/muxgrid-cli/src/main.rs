use anyhow::Result;
use muxgrid_cli::{Cli, Commands, Parser};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let backend = cli.backend.as_deref();

    match cli.command {
        Commands::Pane(args) => args.run(backend),
        Commands::Tab(args) => args.run(backend),
        Commands::Send(args) => args.run(backend),
        Commands::Status(args) => args.run(backend),
    }
}
