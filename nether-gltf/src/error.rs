//! Error types for glTF loading and evaluation.
//!
//! Every failure carries enough context to find the offending element: a
//! human-readable path such as `animation[2].channel[0].sampler` for
//! validation problems, or the chunk/byte range for container problems.

use std::path::PathBuf;

/// Result type for nether-gltf operations.
pub type Result<T> = std::result::Result<T, GltfError>;

/// Errors that can occur while loading or evaluating a glTF asset.
#[derive(Debug, thiserror::Error)]
pub enum GltfError {
    /// Malformed container: bad GLB magic/version/chunks, invalid JSON, bad data URI.
    #[error("format error: {0}")]
    Format(String),

    /// A reference or size in the document does not check out.
    #[error("validation error: {path} {message}")]
    Validation {
        /// Path to the offending element (e.g. `accessor[4].bufferView`)
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// The node hierarchy is not a forest (cycle or shared child).
    #[error("structural error: {path} {message}")]
    Structural { path: String, message: String },

    /// A required extension is not supported and strict mode is on.
    #[error("unsupported required extension `{name}`")]
    UnsupportedExtension { name: String },

    /// A configured resource limit was hit.
    #[error("{what} is {size} bytes, limit is {limit} bytes")]
    LimitExceeded {
        what: String,
        size: u64,
        limit: u64,
    },

    /// Query-time index into the document is out of range.
    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    /// Reading a file failed.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Load options could not be parsed.
    #[error("invalid load options: {0}")]
    Config(#[from] toml::de::Error),
}

impl GltfError {
    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Create a validation error at `path`.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a structural error at `path`.
    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Validation error for a reference that does not resolve.
    ///
    /// Renders as `<path> references <kind> <index>, out of range`.
    pub fn dangling(path: impl Into<String>, kind: &str, index: usize) -> Self {
        Self::validation(path, format!("references {} {}, out of range", kind, index))
    }

    /// Returns true for container-level failures.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_message() {
        let err = GltfError::dangling("animation[2].channel[0].sampler", "sampler", 9);
        assert_eq!(
            err.to_string(),
            "validation error: animation[2].channel[0].sampler references sampler 9, out of range"
        );
    }

    #[test]
    fn test_limit_message() {
        let err = GltfError::LimitExceeded {
            what: "decoded buffers".into(),
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "decoded buffers is 2048 bytes, limit is 1024 bytes"
        );
    }
}
