use clap::Parser;
use tracing_subscriber::EnvFilter;

use claderef::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("claderef=debug,info")
    } else {
        EnvFilter::new("claderef=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Annotate(args) => {
            cli::annotate::run(args, cli.verbose)?;
        }
        cli::Commands::Validate(args) => {
            cli::validate::run(args, cli.verbose)?;
        }
    }

    Ok(())
}
