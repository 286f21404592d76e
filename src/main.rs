//! skillgrade CLI entry point

use clap::Parser;
use skillgrade::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("skillgrade={}", cli.log_level)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let code = match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            1
        }
    };
    std::process::exit(code);
}
