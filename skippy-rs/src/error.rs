//! Run-level errors.
//!
//! Everything here is fatal: a run that produces one of these stops at once.
//! Non-fatal conditions (unknown operations, unresolved `$Name` references)
//! are logged by the interpreter and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

use crate::duration::DurationParseError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: unsupported document format (expected .csv)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("command {command}: cannot resolve ${name}: {reason}")]
    VariableResolution {
        command: usize,
        name: String,
        reason: String,
    },

    #[error("command {command}: {source}")]
    DurationParse {
        command: usize,
        #[source]
        source: DurationParseError,
    },

    #[error("command {command}: {source}")]
    Transport {
        command: usize,
        #[source]
        source: TransportError,
    },

    #[error("cancelled before command {command} completed")]
    Cancelled { command: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
