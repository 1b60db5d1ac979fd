//! Container reader: `.gltf` / `.glb` bytes to raw JSON plus buffer blobs.
//!
//! This stage knows nothing about accessors or nodes. It only splits the
//! container, parses the JSON and materializes every buffer, enforcing the
//! configured size limits along the way.

pub mod glb;
pub mod uri;

use std::path::Path;

use crate::config::LoadOptions;
use crate::error::{GltfError, Result};
use crate::schema::Root;
use uri::UriSource;

/// Raw document: unvalidated JSON tree and one byte blob per buffer.
#[derive(Debug, Clone)]
pub struct RawAsset {
    pub root: Root,
    pub buffers: Vec<Vec<u8>>,
}

/// Read a container from memory.
pub fn read(data: &[u8], options: &LoadOptions) -> Result<RawAsset> {
    if glb::is_glb(data) {
        let parsed = glb::parse(data)?;
        tracing::debug!(
            "GLB container: JSON {} bytes, BIN {} bytes",
            parsed.json.len(),
            parsed.bin.map_or(0, <[u8]>::len)
        );
        let root = parse_json(parsed.json)?;
        let buffers = load_buffers(&root, parsed.bin, options)?;
        Ok(RawAsset { root, buffers })
    } else {
        if looks_binary(data) {
            return Err(GltfError::format(format!(
                "invalid GLB magic 0x{:08X}",
                u32::from_le_bytes([data[0], data[1], data[2], data[3]])
            )));
        }
        let root = parse_json(data)?;
        let buffers = load_buffers(&root, None, options)?;
        Ok(RawAsset { root, buffers })
    }
}

/// Read a container from disk. External buffers resolve next to the file
/// unless `options.base_dir` is already set.
pub fn read_path(path: &Path, options: &LoadOptions) -> Result<RawAsset> {
    let data = uri::read_file(path, options.max_file_bytes)?;
    if options.base_dir.is_some() {
        return read(&data, options);
    }
    let mut options = options.clone();
    options.base_dir = Some(
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    );
    read(&data, &options)
}

fn parse_json(json: &[u8]) -> Result<Root> {
    serde_json::from_slice(json).map_err(|e| GltfError::format(format!("invalid glTF JSON: {}", e)))
}

/// Non-JSON bytes: anything whose first non-whitespace byte is not `{`.
fn looks_binary(data: &[u8]) -> bool {
    data.len() >= 4
        && data
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|&b| b != b'{')
}

fn load_buffers(root: &Root, bin: Option<&[u8]>, options: &LoadOptions) -> Result<Vec<Vec<u8>>> {
    let mut total: u64 = 0;
    let mut buffers = Vec::with_capacity(root.buffers.len());

    for (i, buffer) in root.buffers.iter().enumerate() {
        let path = format!("buffer[{}]", i);
        let declared = buffer.byte_length as u64;
        check_budget(&mut total, declared, options.max_buffer_bytes)?;

        let mut data = match buffer.uri.as_deref() {
            None if i == 0 => bin
                .ok_or_else(|| GltfError::validation(&path, "has no uri and the container has no BIN chunk"))?
                .to_vec(),
            None => {
                return Err(GltfError::validation(path, "has no uri"));
            }
            Some(uri) => {
                let source = UriSource::parse(uri)?;
                // Reject oversized payloads before decoding them
                if let Some(hint) = source.decoded_len_hint() {
                    if hint > options.max_buffer_bytes {
                        return Err(GltfError::LimitExceeded {
                            what: format!("{} data uri", path),
                            size: hint,
                            limit: options.max_buffer_bytes,
                        });
                    }
                }
                match source {
                    UriSource::Data {
                        media_type,
                        payload,
                    } => uri::decode_data(media_type, payload)?,
                    UriSource::File(relative) => {
                        let base = options.base_dir.as_ref().ok_or_else(|| {
                            GltfError::validation(
                                &path,
                                format!(
                                    "references external file {:?} but no base directory is set",
                                    relative
                                ),
                            )
                        })?;
                        uri::read_file(&base.join(relative), options.max_file_bytes)?
                    }
                }
            }
        };

        if data.len() < buffer.byte_length {
            return Err(GltfError::validation(
                path,
                format!(
                    "declares byteLength {} but only {} bytes are available",
                    buffer.byte_length,
                    data.len()
                ),
            ));
        }
        data.truncate(buffer.byte_length);
        buffers.push(data);
    }

    Ok(buffers)
}

fn check_budget(total: &mut u64, add: u64, limit: u64) -> Result<()> {
    *total = total.saturating_add(add);
    if *total > limit {
        return Err(GltfError::LimitExceeded {
            what: "decoded buffers".into(),
            size: *total,
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_embedded_json() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 4, "uri": "data:application/octet-stream;base64,AAECAw=="}]
        }"#;
        let raw = read(json, &LoadOptions::default()).unwrap();
        assert_eq!(raw.buffers, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_buffer_truncated_to_declared_length() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 2, "uri": "data:application/octet-stream;base64,AAECAw=="}]
        }"#;
        let raw = read(json, &LoadOptions::default()).unwrap();
        assert_eq!(raw.buffers[0], vec![0, 1]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 8, "uri": "data:application/octet-stream;base64,AAECAw=="}]
        }"#;
        let err = read(json, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, GltfError::Validation { .. }));
    }

    #[test]
    fn test_buffer_limit() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 4, "uri": "data:application/octet-stream;base64,AAECAw=="}]
        }"#;
        let options = LoadOptions::default().max_buffer_bytes(3);
        let err = read(json, &options).unwrap_err();
        assert!(matches!(err, GltfError::LimitExceeded { .. }));
    }

    #[test]
    fn test_external_buffer_needs_base_dir() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 4, "uri": "data.bin"}]
        }"#;
        let err = read(json, &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no base directory"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(read(b"{ not json", &LoadOptions::default()).unwrap_err().is_format());
    }

    #[test]
    fn test_binary_garbage_is_format_error() {
        let err = read(&[0x00, 0x01, 0x02, 0x03, 0x04], &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }
}
