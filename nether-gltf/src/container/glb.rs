//! GLB binary container.
//!
//! Layout: 12-byte header (magic, version, total length) followed by chunks,
//! each an 8-byte header (length, type) plus 4-byte aligned payload. The JSON
//! chunk comes first, the optional BIN chunk second.

use crate::error::{GltfError, Result};

/// GLB magic number ("glTF" little-endian).
pub const GLB_MAGIC: u32 = 0x4654_6C67;
/// Only container version understood.
pub const GLB_VERSION: u32 = 2;
/// JSON chunk type ("JSON" little-endian).
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// Binary chunk type ("BIN\0" little-endian).
pub const CHUNK_BIN: u32 = 0x004E_4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Borrowed view of a parsed GLB.
#[derive(Debug, Clone, Copy)]
pub struct Glb<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// True when `data` starts with the GLB magic.
pub fn is_glb(data: &[u8]) -> bool {
    read_u32(data, 0) == Some(GLB_MAGIC)
}

/// Split a GLB into its JSON and BIN chunks.
pub fn parse(data: &[u8]) -> Result<Glb<'_>> {
    if data.len() < HEADER_LEN {
        return Err(GltfError::format(format!(
            "GLB too short: {} bytes, header needs {}",
            data.len(),
            HEADER_LEN
        )));
    }

    let magic = read_u32(data, 0).unwrap_or_default();
    if magic != GLB_MAGIC {
        return Err(GltfError::format(format!(
            "invalid GLB magic 0x{:08X}",
            magic
        )));
    }

    let version = read_u32(data, 4).unwrap_or_default();
    if version != GLB_VERSION {
        return Err(GltfError::format(format!(
            "GLB version {} not supported",
            version
        )));
    }

    let total_length = read_u32(data, 8).unwrap_or_default() as usize;
    if total_length > data.len() {
        return Err(GltfError::format(format!(
            "GLB header declares {} bytes but only {} are present",
            total_length,
            data.len()
        )));
    }
    if total_length < HEADER_LEN {
        return Err(GltfError::format(format!(
            "GLB header declares invalid length {}",
            total_length
        )));
    }
    let data = &data[..total_length];

    let mut offset = HEADER_LEN;
    let mut json: Option<&[u8]> = None;
    let mut bin: Option<&[u8]> = None;
    let mut chunk_index = 0usize;

    while offset < data.len() {
        if offset + CHUNK_HEADER_LEN > data.len() {
            return Err(GltfError::format(format!(
                "truncated header for chunk {} at byte {}",
                chunk_index, offset
            )));
        }
        let chunk_length = read_u32(data, offset).unwrap_or_default() as usize;
        let chunk_type = read_u32(data, offset + 4).unwrap_or_default();
        let start = offset + CHUNK_HEADER_LEN;

        let end = start
            .checked_add(chunk_length)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                GltfError::format(format!(
                    "chunk {} length {} overruns container ({} bytes left)",
                    chunk_index,
                    chunk_length,
                    data.len() - start
                ))
            })?;
        let payload = &data[start..end];

        match (chunk_index, chunk_type) {
            (0, CHUNK_JSON) => json = Some(payload),
            (0, other) => {
                return Err(GltfError::format(format!(
                    "first chunk must be JSON, found type 0x{:08X}",
                    other
                )));
            }
            (1, CHUNK_BIN) => bin = Some(payload),
            (_, CHUNK_JSON) => {
                return Err(GltfError::format("GLB contains more than one JSON chunk"));
            }
            (_, CHUNK_BIN) => {
                return Err(GltfError::format(
                    "BIN chunk must directly follow the JSON chunk",
                ));
            }
            (_, other) => {
                tracing::debug!("Skipping unknown GLB chunk type 0x{:08X}", other);
            }
        }

        offset = (end + 3) & !3;
        chunk_index += 1;
    }

    let json = json.ok_or_else(|| GltfError::format("GLB has no JSON chunk"))?;
    Ok(Glb { json, bin })
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
        let pad = |len: usize| (4 - len % 4) % 4;
        let mut body = Vec::new();
        body.extend_from_slice(&((json.len() + pad(json.len())) as u32).to_le_bytes());
        body.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        body.extend_from_slice(json);
        body.extend(std::iter::repeat_n(b' ', pad(json.len())));
        if let Some(bin) = bin {
            body.extend_from_slice(&((bin.len() + pad(bin.len())) as u32).to_le_bytes());
            body.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            body.extend_from_slice(bin);
            body.extend(std::iter::repeat_n(0u8, pad(bin.len())));
        }
        let mut glb = Vec::new();
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        glb.extend_from_slice(&body);
        glb
    }

    #[test]
    fn test_parse_json_and_bin() {
        let glb = build(b"{}", Some(&[1, 2, 3, 4]));
        let parsed = parse(&glb).unwrap();
        assert_eq!(parsed.json, b"{}  ");
        assert_eq!(parsed.bin, Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn test_parse_json_only() {
        let glb = build(b"{\"a\":1}", None);
        let parsed = parse(&glb).unwrap();
        assert!(parsed.bin.is_none());
    }

    #[test]
    fn test_bad_magic() {
        let mut glb = build(b"{}", None);
        glb[0] = b'x';
        let err = parse(&glb).unwrap_err();
        assert!(err.is_format());
        assert!(!is_glb(&glb));
    }

    #[test]
    fn test_bad_version() {
        let mut glb = build(b"{}", None);
        glb[4] = 1;
        assert!(parse(&glb).unwrap_err().is_format());
    }

    #[test]
    fn test_chunk_overrun() {
        let mut glb = build(b"{}", Some(&[0; 8]));
        // BIN chunk length field sits after header + JSON chunk (8 + 4)
        let bin_len_at = 12 + 8 + 4;
        glb[bin_len_at..bin_len_at + 4].copy_from_slice(&1000u32.to_le_bytes());
        let err = parse(&glb).unwrap_err();
        assert!(err.to_string().contains("overruns"));
    }

    #[test]
    fn test_declared_length_overrun() {
        let mut glb = build(b"{}", None);
        glb[8..12].copy_from_slice(&4096u32.to_le_bytes());
        assert!(parse(&glb).unwrap_err().is_format());
    }

    #[test]
    fn test_truncated_header() {
        assert!(parse(b"glTF").unwrap_err().is_format());
    }

    #[test]
    fn test_first_chunk_must_be_json() {
        let mut glb = build(b"{}", None);
        glb[16..20].copy_from_slice(&CHUNK_BIN.to_le_bytes());
        assert!(parse(&glb).unwrap_err().is_format());
    }
}
