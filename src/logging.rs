//! Installs the global [`tracing`] subscriber for the binary.

use std::fmt;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a compact fmt subscriber. `RUST_LOG` takes precedence over
/// `default_level` (e.g. `info`, `postlist=debug`).
pub fn init(default_level: &str) -> Result<(), Error> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|err| Error(format!("invalid log level `{}`: {}", default_level, err)))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_fmt::layer().compact().with_target(true))
        .try_init()
        .map_err(|err| Error(format!("failed to install tracing subscriber: {}", err)))
}

/// Returned when the subscriber can't be installed.
#[derive(Debug)]
pub struct Error(String);

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Implements [`std::error::Error`] for [`Error`].
impl std::error::Error for Error {}
