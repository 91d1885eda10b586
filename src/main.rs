use clap::Parser;
use tracing_subscriber::EnvFilter;

use pca_press::cli::{self, Args};

fn main() {
    // Setup logging (set RUST_LOG=debug to see every channel write)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    if let Err(e) = cli::run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
