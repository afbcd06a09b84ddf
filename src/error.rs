use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = TimelineError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has mistyped fields.
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown key name `{name}` bound to {action}")]
    UnknownKey { name: String, action: &'static str },

    /// A replay file line could not be decoded into a span.
    #[error("replay line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to spawn replay thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A render pass was started after its surface was torn down.
    #[error("cannot start {pass} pass: surface is detached")]
    SurfaceDetached { pass: &'static str },

    #[error("headless capture failed: {0}")]
    Headless(String),
}

impl TimelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
