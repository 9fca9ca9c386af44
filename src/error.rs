use std::fmt::{self, Debug, Display};
use std::io;

use crate::grid::Position;

/// Provides `SimError` and maps to other errors to
/// convert to a `SimError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// The parameters describe a simulation that cannot be built.
    ConfigurationError(String),
    /// Seeding gave up looking for an unoccupied cell.
    CapacityError(String),
    /// A cell that was expected to be free already holds an occupant.
    OccupancyError(Position),
    ReportError(String),
    SimError(String),
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(error: serde_json::Error) -> Self {
        SimError::JsonError(error)
    }
}

impl From<csv::Error> for SimError {
    fn from(error: csv::Error) -> Self {
        SimError::CsvError(error)
    }
}

impl From<String> for SimError {
    fn from(error: String) -> Self {
        SimError::SimError(error)
    }
}

impl From<&str> for SimError {
    fn from(error: &str) -> Self {
        SimError::SimError(error.to_string())
    }
}

impl std::error::Error for SimError {}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::ConfigurationError(message) => {
                write!(f, "Configuration error: {message}")
            }
            SimError::CapacityError(message) => write!(f, "Capacity error: {message}"),
            SimError::OccupancyError(position) => {
                write!(f, "Occupancy error: cell {position} is already occupied")
            }
            _ => write!(f, "Error: {self:?}"),
        }
    }
}
