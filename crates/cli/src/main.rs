use clap::Parser;
use tracing_subscriber::EnvFilter;

use phpbridge_cli::Cli;

/// Exit code for configuration, resolution and runner errors
const FATAL_EXIT_CODE: i32 = 2;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; -v only changes the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.execute() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            e.downcast_ref::<phpbridge_core::Error>()
                .map(phpbridge_core::Error::exit_code)
                .unwrap_or(FATAL_EXIT_CODE)
        }
    };
    std::process::exit(code);
}
