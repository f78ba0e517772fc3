//! Diagnostics for the `vfiles` binary.
//!
//! Output goes to stderr so it never mixes with file content or listings
//! on stdout. The filter comes from `VFILES_LOG` using the usual
//! `EnvFilter` directive syntax, e.g. `VFILES_LOG=vfiles_disk_store=debug`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "VFILES_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

pub fn init_logging() {
    let result = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();
    if let Err(e) = result {
        eprintln!("Warning: could not install logger: {}", e);
    }
}
