//! Error types for level loading and configuration.
//!
//! Level errors always name the course so a broken level pack points at the
//! offending file and field.

use std::io;

use thiserror::Error;

/// Malformed level data. The level is never built from partial data.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The level file could not be read.
    #[error("course '{course}': cannot read level file: {source}")]
    Io {
        /// Course name or path
        course: String,
        /// Underlying I/O error
        source: io::Error,
    },
    /// The level file is not valid JSON for the level schema.
    #[error("course '{course}': malformed level data: {source}")]
    Parse {
        /// Course name or path
        course: String,
        /// Underlying parse error
        source: serde_json::Error,
    },
    /// A field holds a value outside its allowed domain.
    #[error("course '{course}': invalid `{field}`: {reason}")]
    InvalidField {
        /// Course name
        course: String,
        /// Offending field path, e.g. `tiles[3].coins`
        field: String,
        /// What is wrong with it
        reason: String,
    },
    /// Two tiles declared on one cell.
    #[error("course '{course}': `{field}` duplicates the tile at ({x}, {y})")]
    DuplicateTile {
        /// Course name
        course: String,
        /// Offending field path
        field: String,
        /// Cell column
        x: i32,
        /// Cell row
        y: i32,
    },
    /// A placement lies outside the level.
    #[error("course '{course}': `{field}` at ({x}, {y}) is outside the {width}x{height} level")]
    OutOfBounds {
        /// Course name
        course: String,
        /// Offending field path
        field: String,
        /// Cell column
        x: i32,
        /// Cell row
        y: i32,
        /// Level width in tiles
        width: u32,
        /// Level height in tiles
        height: u32,
    },
}

impl LevelError {
    /// Name of the course the error belongs to.
    #[must_use]
    pub fn course(&self) -> &str {
        match self {
            Self::Io { course, .. }
            | Self::Parse { course, .. }
            | Self::InvalidField { course, .. }
            | Self::DuplicateTile { course, .. }
            | Self::OutOfBounds { course, .. } => course,
        }
    }
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    /// The config file is not valid JSON.
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A tunable is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
