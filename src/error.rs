//! Error types for the textbook-markup library.

use thiserror::Error;

/// Result type alias for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a compilation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid front matter in {container}: {message}")]
    FrontMatter { container: String, message: String },

    #[error("Front matter for {container} has no page property")]
    MissingPage { container: String },

    #[error("Front matter appears before any chapter")]
    OrphanMetadata,

    #[error("Level {level} heading {heading:?} has no open parent container")]
    OrphanHeading { level: u8, heading: String },

    #[error("Heading id {id:?} is already used by another container")]
    DuplicateContainer { id: String },

    #[error("Unterminated <{tag}> tag at end of input")]
    UnterminatedTag { tag: String },

    #[error("Unrecognized tag <{tag}>")]
    UnknownTag { tag: String },

    #[error("Missing attribute {attribute:?} on <{tag}>")]
    MissingAttribute { tag: String, attribute: String },

    #[error("Invalid value {value:?} for attribute {attribute:?} on <{tag}>")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
    },
}

/// Errors from loading a book manifest.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Empty {0} in book manifest")]
    Empty(&'static str),
}

/// Errors from converting strings into references.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Invalid reference: {0:?}")]
    Invalid(String),
}
