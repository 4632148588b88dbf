//! Functionality to read rule files and to write diagnostic exports is implemented here.

pub mod export;
pub mod parser;

use std::{fs::read_to_string, path::Path};

use crate::{error::ReadingError, model::Program};

/// Load the given `file` and parse the program it contains.
///
/// For details see [`parser::parse_program`]
pub fn load_program(file: impl AsRef<Path>) -> Result<Program, ReadingError> {
    let file = file.as_ref();
    let input = read_to_string(file).map_err(|error| ReadingError::IOReading {
        error,
        filename: file.display().to_string(),
    })?;

    let program = parser::parse_program(input)?;
    log::info!(
        "loaded {} rules from \"{}\"",
        program.len(),
        file.display()
    );

    Ok(program)
}
