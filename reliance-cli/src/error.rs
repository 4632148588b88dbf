//! This module defines all the errors that can occur while executing reliance-cli.

use thiserror::Error;

/// Error that occur during execution of the CLI app
#[derive(Error, Debug)]
pub enum CliError {
    /// Error while serializing a report
    #[error("unable to serialize report: {0}")]
    SerializationError(#[from] serde_json::Error),
    /// Error originating from the reliance library
    #[error(transparent)]
    RelianceError(#[from] reliance::error::Error),
}
