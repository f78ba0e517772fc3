use clap::Parser;

use vfiles_cli::{logging, run, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init_logging();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
