//! Error types for mapstyle operations.

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while classifying layers or generating a render script.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (reading GeoJSON or config files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Layer payload is not a GeoJSON FeatureCollection, Feature or Geometry.
    #[error("not a recognized geometry or feature collection: {0}")]
    InvalidLayerData(String),

    /// A constant fill color was combined with a named color map.
    #[error("a constant color and a color map cannot both be specified")]
    ConflictingColorOptions,

    /// A named color map was requested without a color attribute to drive it.
    #[error("a color map requires a color attribute")]
    ColorMapWithoutAttribute,

    /// Failure while preparing one layer, tagged with the layer position.
    #[error("layer {index}: {source}")]
    Layer {
        /// Position of the offending layer.
        index: usize,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Scale domain error (e.g., equal domain bounds).
    #[error("Scale domain error: {0}")]
    ScaleDomain(String),

    /// Color parsing error.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),
}

impl Error {
    /// Attach the position of the layer that produced this error.
    #[must_use]
    pub fn in_layer(self, index: usize) -> Self {
        Error::Layer { index, source: Box::new(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_layer() {
        let err = Error::Layer {
            index: 2,
            source: Box::new(Error::InvalidLayerData("expected an object".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("layer 2"));
        assert!(msg.contains("expected an object"));
    }

    #[test]
    fn test_layer_error_exposes_source() {
        use std::error::Error as _;

        let err = Error::Layer { index: 0, source: Box::new(Error::ConflictingColorOptions) };
        let source = err.source().expect("layer error carries its cause");
        assert!(source.to_string().contains("color map"));
    }

    #[test]
    fn test_config_parse_display_includes_line() {
        let err = Error::ConfigParse {
            line: 4,
            message: "invalid type".to_string(),
        };
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
