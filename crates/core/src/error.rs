/// All errors that can be returned while parsing a segment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The segment is missing a required top-level field.
    #[error("segment missing required field: '{field}'")]
    MissingField { field: String },

    /// The segment value is not a JSON object.
    #[error("segment configuration must be a JSON object")]
    NotAnObject,

    /// A segment field has the wrong shape.
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// A rule in the ruleset is structurally invalid.
    #[error("rule {index}: {message}")]
    InvalidRule { index: usize, message: String },

    /// A JSON number has no exact decimal representation.
    #[error("number '{value}' cannot be represented as a decimal")]
    UnrepresentableNumber { value: String },
}
