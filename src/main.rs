use chart_hardener::{Outcome, cli::Cli, config, run_command};
use clap::Parser;
use std::process;

fn main() {
    match run() {
        Ok(Outcome::Success) => {}
        Ok(Outcome::Failed) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run() -> chart_hardener::Result<Outcome> {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    // Load configuration
    let config = config::load_config(cli.config.as_deref())?;

    let ctx = cli.run_context()?;
    log::debug!("run context: {:?}", ctx);
    run_command(&ctx, &config)
}
