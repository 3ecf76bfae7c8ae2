use clap::Parser;
use filify::cli::{Args, run};
use filify::output::OutputFormatter;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        OutputFormatter::error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
