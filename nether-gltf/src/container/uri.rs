//! Buffer uri resolution: base64 data uris and files next to the asset.

use base64::Engine;
use std::path::{Path, PathBuf};

use crate::error::{GltfError, Result};

/// Media types accepted for embedded buffers.
const BUFFER_MEDIA_TYPES: &[&str] = &["application/octet-stream", "application/gltf-buffer"];

/// A buffer source named by a uri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriSource<'a> {
    /// `data:<media type>;base64,<payload>`
    Data { media_type: &'a str, payload: &'a str },
    /// Relative path to an external file
    File(PathBuf),
}

impl<'a> UriSource<'a> {
    pub fn parse(uri: &'a str) -> Result<Self> {
        let Some(rest) = uri.strip_prefix("data:") else {
            return Ok(Self::File(PathBuf::from(percent_decode(uri)?)));
        };

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| GltfError::format("data uri has no ',' separator"))?;
        let media_type = header.strip_suffix(";base64").ok_or_else(|| {
            GltfError::format(format!("data uri `{}` is not base64 encoded", header))
        })?;
        Ok(Self::Data {
            media_type,
            payload,
        })
    }

    /// Upper bound on the decoded size, known before decoding.
    pub fn decoded_len_hint(&self) -> Option<u64> {
        match self {
            Self::Data { payload, .. } => Some((payload.len() as u64).div_ceil(4) * 3),
            Self::File(_) => None,
        }
    }
}

/// Decode a base64 data uri payload.
pub fn decode_data(media_type: &str, payload: &str) -> Result<Vec<u8>> {
    if !media_type.is_empty() && !BUFFER_MEDIA_TYPES.contains(&media_type) {
        tracing::warn!("Unexpected media type `{}` for buffer data uri", media_type);
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| GltfError::format(format!("invalid base64 in data uri: {}", e)))
}

/// Read an external file, refusing anything larger than `max_bytes`.
pub fn read_file(path: &Path, max_bytes: u64) -> Result<Vec<u8>> {
    let io_err = |source| GltfError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > max_bytes {
        return Err(GltfError::LimitExceeded {
            what: format!("file {:?}", path),
            size,
            limit: max_bytes,
        });
    }
    std::fs::read(path).map_err(io_err)
}

/// Decode `%XX` escapes in a relative uri.
fn percent_decode(uri: &str) -> Result<String> {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = uri
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| GltfError::format(format!("bad percent escape in uri `{}`", uri)))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| GltfError::format(format!("uri `{}` is not UTF-8", uri)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_uri() {
        let source = UriSource::parse("data:application/octet-stream;base64,AAECAw==").unwrap();
        let UriSource::Data {
            media_type,
            payload,
        } = source
        else {
            panic!("expected data uri");
        };
        assert_eq!(media_type, "application/octet-stream");
        assert_eq!(decode_data(media_type, payload).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_gltf_buffer_media_type() {
        let source = UriSource::parse("data:application/gltf-buffer;base64,AQ==").unwrap();
        assert_eq!(source.decoded_len_hint(), Some(3));
    }

    #[test]
    fn test_non_base64_data_uri_rejected() {
        assert!(UriSource::parse("data:text/plain,hello").unwrap_err().is_format());
    }

    #[test]
    fn test_bad_base64() {
        assert!(decode_data("application/octet-stream", "@@@").unwrap_err().is_format());
    }

    #[test]
    fn test_file_uri_percent_decoded() {
        let source = UriSource::parse("my%20mesh.bin").unwrap();
        assert_eq!(source, UriSource::File(PathBuf::from("my mesh.bin")));
    }

    #[test]
    fn test_read_file_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        assert!(matches!(
            read_file(&path, 32),
            Err(GltfError::LimitExceeded { size: 64, .. })
        ));
        assert_eq!(read_file(&path, 64).unwrap().len(), 64);
    }
}
