//! Logging bootstrap.

use std::env;
use std::io;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_tree::HierarchicalLayer;

const ENV_FILTER_VARS: [&str; 2] = ["FOLDERMARK_LOG", "RUST_LOG"];

/// How log output is laid out on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogStyle {
    /// One line per event.
    #[default]
    Compact,
    /// Nested output following span structure.
    Tree,
}

/// Install the global subscriber. Logs go to stderr so command output stays clean.
pub fn init(verbosity: u8, style: LogStyle) -> Result<()> {
    let filter = env_filter(verbosity)?;
    let registry = tracing_subscriber::registry().with(filter);

    match style {
        LogStyle::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogStyle::Tree => registry
            .with(HierarchicalLayer::new(2).with_targets(true))
            .try_init(),
    }
    .context("failed to install tracing subscriber")
}

fn env_filter(verbosity: u8) -> Result<EnvFilter> {
    let from_env = ENV_FILTER_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|value| !value.trim().is_empty()));

    let directive = from_env.unwrap_or_else(|| default_directive(verbosity).to_owned());
    EnvFilter::try_new(&directive).with_context(|| format!("invalid log filter '{directive}'"))
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,foldermark=info",
        2 => "warn,foldermark=debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_crate_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(2), "warn,foldermark=debug");
        assert_eq!(default_directive(9), "trace");
        for verbosity in 0..4 {
            assert!(EnvFilter::try_new(default_directive(verbosity)).is_ok());
        }
    }
}
