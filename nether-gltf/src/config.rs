//! Load options.
//!
//! Options can be built in code or parsed from TOML, e.g.
//!
//! ```toml
//! max_buffer_bytes = 67108864
//! strict = false
//! allowed_extensions = ["EXT_meshopt_compression"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// 256 MiB
const DEFAULT_MAX_BUFFER_BYTES: u64 = 256 * 1024 * 1024;
/// 512 MiB
const DEFAULT_MAX_FILE_BYTES: u64 = 512 * 1024 * 1024;

/// Options controlling how a glTF asset is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Cap on the total size of decoded buffers (default: 256 MiB)
    #[serde(default = "default_max_buffer_bytes")]
    pub max_buffer_bytes: u64,
    /// Cap on the size of any file read from disk (default: 512 MiB)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Reject unknown entries in `extensionsRequired` (default: true)
    #[serde(default = "default_true")]
    pub strict: bool,
    /// Directory used to resolve external buffer uris.
    ///
    /// Set automatically by [`crate::load_path`]. When `None`, external uris
    /// are rejected.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Extra extension names treated as supported
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_buffer_bytes: default_max_buffer_bytes(),
            max_file_bytes: default_max_file_bytes(),
            strict: true,
            base_dir: None,
            allowed_extensions: Vec::new(),
        }
    }
}

impl LoadOptions {
    /// Parse options from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Builder-style setter for `strict`.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builder-style setter for `max_buffer_bytes`.
    pub fn max_buffer_bytes(mut self, limit: u64) -> Self {
        self.max_buffer_bytes = limit;
        self
    }

    /// Builder-style setter for `base_dir`.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Builder-style helper adding one allowed extension.
    pub fn allow_extension(mut self, name: impl Into<String>) -> Self {
        self.allowed_extensions.push(name.into());
        self
    }
}

fn default_max_buffer_bytes() -> u64 {
    DEFAULT_MAX_BUFFER_BYTES
}
fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = LoadOptions::default();
        assert_eq!(options.max_buffer_bytes, 256 * 1024 * 1024);
        assert!(options.strict);
        assert!(options.base_dir.is_none());
    }

    #[test]
    fn test_empty_toml_matches_default() {
        let options = LoadOptions::from_toml_str("").unwrap();
        assert_eq!(options, LoadOptions::default());
    }

    #[test]
    fn test_partial_toml() {
        let options = LoadOptions::from_toml_str(
            r#"
            max_buffer_bytes = 1024
            strict = false
            allowed_extensions = ["EXT_foo"]
            "#,
        )
        .unwrap();
        assert_eq!(options.max_buffer_bytes, 1024);
        assert!(!options.strict);
        assert_eq!(options.allowed_extensions, vec!["EXT_foo".to_string()]);
        assert_eq!(options.max_file_bytes, 512 * 1024 * 1024);
    }

    #[test]
    fn test_bad_toml() {
        let err = LoadOptions::from_toml_str("strict = \"yes\"").unwrap_err();
        assert!(matches!(err, crate::GltfError::Config(_)));
    }
}
