//! Log setup for the `github-post` binary.
//!
//! Everything is written to stderr. `--dry-run` prints rendered issues as
//! JSON lines on stdout, and log lines mixed into that stream would break
//! anyone piping it into another tool.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set. `json` switches to one JSON
/// object per line. Only the first call installs a subscriber.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .json(),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(false, Level::DEBUG);
        init_tracing(true, Level::INFO);
        tracing::info!("still logging");
    }
}
