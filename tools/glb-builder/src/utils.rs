//! Utility functions for GLB construction

use anyhow::{Context, Result};
use base64::Engine;
use serde_json::Value;

/// Compute bounding box for positions
pub fn compute_bounds(positions: &[[f32; 3]]) -> (Vec<f32>, Vec<f32>) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];

    for pos in positions {
        for i in 0..3 {
            min[i] = min[i].min(pos[i]);
            max[i] = max[i].max(pos[i]);
        }
    }

    (min.to_vec(), max.to_vec())
}

/// Align buffer to 4-byte boundary
pub fn align_buffer(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

/// `data:application/octet-stream;base64,...` uri for embedded buffers
pub fn data_uri(bytes: &[u8]) -> String {
    format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Assemble GLB binary from JSON and buffer data
pub fn assemble_glb(root: &Value, buffer_data: &[u8]) -> Result<Vec<u8>> {
    let json_bytes = serde_json::to_vec(root).context("Failed to serialize glTF JSON")?;
    Ok(assemble_glb_chunks(&json_bytes, Some(buffer_data), &[]))
}

/// Assemble a GLB from raw chunks.
///
/// `extra` chunks (type, payload) are appended after BIN, which lets tests
/// exercise unknown chunk handling.
pub fn assemble_glb_chunks(json_bytes: &[u8], bin: Option<&[u8]>, extra: &[(u32, &[u8])]) -> Vec<u8> {
    // Pad JSON with spaces, binary chunks with zeros
    let mut chunks: Vec<(u32, Vec<u8>)> = Vec::new();
    let mut json = json_bytes.to_vec();
    while json.len() % 4 != 0 {
        json.push(0x20);
    }
    chunks.push((0x4E4F534A, json)); // "JSON"
    if let Some(bin) = bin {
        let mut data = bin.to_vec();
        align_buffer(&mut data);
        chunks.push((0x004E4942, data)); // "BIN\0"
    }
    for (kind, payload) in extra {
        let mut data = payload.to_vec();
        align_buffer(&mut data);
        chunks.push((*kind, data));
    }

    let total_length = 12 + chunks.iter().map(|(_, d)| 8 + d.len()).sum::<usize>();
    let mut glb = Vec::with_capacity(total_length);

    // GLB header
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes()); // version
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    for (kind, data) in chunks {
        glb.extend_from_slice(&(data.len() as u32).to_le_bytes());
        glb.extend_from_slice(&kind.to_le_bytes());
        glb.extend_from_slice(&data);
    }

    glb
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compute_bounds_simple() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-1.0, -2.0, -3.0]];
        let (min, max) = compute_bounds(&positions);
        assert_eq!(min, vec![-1.0, -2.0, -3.0]);
        assert_eq!(max, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_align_buffer() {
        let mut buffer = vec![1, 2, 3];
        align_buffer(&mut buffer);
        assert_eq!(buffer, vec![1, 2, 3, 0]);

        let mut buffer2 = vec![1, 2, 3, 4];
        align_buffer(&mut buffer2);
        assert_eq!(buffer2.len(), 4); // Already aligned
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(data_uri(&[0, 1, 2, 3]), "data:application/octet-stream;base64,AAECAw==");
    }

    #[test]
    fn test_assemble_glb_layout() {
        let glb = assemble_glb(&json!({"asset": {"version": "2.0"}}), &[1, 2, 3]).unwrap();
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize, glb.len());
        assert_eq!(glb.len() % 4, 0);
    }
}
