//! Error-handling module for the crate

use thiserror::Error;

use crate::{execution::scheduler::SchedulerError, io::parser::LocatedParseError};

/// Errors related to reading rule files.
#[allow(variant_size_differences)]
#[derive(Error, Debug)]
pub enum ReadingError {
    /// Errors on reading a file
    #[error("Failed to read \"{filename}\": {error}.")]
    IOReading {
        /// Contains the wrapped error
        error: std::io::Error,
        /// Filename which caused the error
        filename: String,
    },
    /// The file could be read but does not contain a valid program
    #[error(transparent)]
    Parse(#[from] LocatedParseError),
}

/// Errors related to writing diagnostic exports.
#[allow(variant_size_differences)]
#[derive(Error, Debug)]
pub enum ExportError {
    /// Error during a Write operation
    #[error("Failed to write \"{filename}\": {error}")]
    IOWriting {
        /// Underlying IO error
        error: std::io::Error,
        /// Name of the file that could not be written
        filename: String,
    },
    /// CSV serialization error
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Error-Collection for all the possible Errors occurring in this crate
#[allow(variant_size_differences)]
#[derive(Error, Debug)]
pub enum Error {
    /// Reading errors
    #[error(transparent)]
    ReadingError(#[from] ReadingError),
    /// Parse errors
    #[error(transparent)]
    ParseError(#[from] LocatedParseError),
    /// Export errors
    #[error(transparent)]
    ExportError(#[from] ExportError),
    /// Inconsistent scheduler state
    #[error(transparent)]
    SchedulerError(#[from] SchedulerError),
}
