//! Error types for the decoder proxy.

use crate::decproxy::StreamType;
use thiserror::Error;

/// Result type alias using the crate's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for proxy and element operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The registry holds no decoder factory at or above the minimum rank.
    #[error("no decoders registered")]
    NoDecodersRegistered,

    /// No registered decoder accepts the format (or only the proxy itself does).
    #[error("no decoder matches the stream format")]
    NoMatchingDecoder,

    /// No placeholder decoder can be created for this stream type.
    #[error("no placeholder decoder available for {0} streams")]
    PlaceholderUnavailable(StreamType),

    /// A decoder swap was aborted before anything was committed.
    #[error("decoder swap aborted: {0}")]
    Swap(String),

    /// Data arrived before the format was known.
    #[error("not negotiated: {0}")]
    NotNegotiated(String),

    /// Nothing is linked where data was pushed.
    #[error("not linked: {0}")]
    NotLinked(String),

    /// The data path is shutting down.
    #[error("flushing")]
    Flushing,

    /// A property is not exposed by the element.
    #[error("element '{element}' has no property '{property}'")]
    UnknownProperty {
        /// Element name.
        element: String,
        /// Requested property.
        property: String,
    },

    /// A property was given a value of the wrong type.
    #[error("invalid value for property '{0}'")]
    InvalidPropertyValue(String),

    /// No factory is registered under the name.
    #[error("no element factory named '{0}'")]
    FactoryNotFound(String),

    /// Generic element failure.
    #[error("element error: {0}")]
    Element(String),

    /// Configuration could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a decoder resolution failure.
    ///
    /// Resolution failures only mean the format cannot be decoded right now;
    /// callers fall back to a placeholder instead of failing the stream.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Error::NoDecodersRegistered | Error::NoMatchingDecoder)
    }
}
