//! glTF extensions as tagged variants.
//!
//! Known extensions are decoded into typed variants; everything else is kept
//! as raw JSON under its name. Callers ask capability questions through
//! [`Extensions::has`] instead of poking at JSON.

use serde_json::Value;

use crate::schema::ExtensionMap;

pub const KHR_MESH_QUANTIZATION: &str = "KHR_mesh_quantization";
pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";
pub const KHR_MATERIALS_EMISSIVE_STRENGTH: &str = "KHR_materials_emissive_strength";
pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";

/// Extensions this crate understands well enough to load assets that require them.
///
/// Mesh quantization needs no special handling because every component type
/// is accepted for every attribute.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    KHR_MESH_QUANTIZATION,
    KHR_MATERIALS_UNLIT,
    KHR_MATERIALS_EMISSIVE_STRENGTH,
    KHR_TEXTURE_TRANSFORM,
];

/// UV transform from `KHR_texture_transform`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    pub offset: [f32; 2],
    pub rotation: f32,
    pub scale: [f32; 2],
    pub tex_coord: Option<u32>,
}

/// One extension attached to a glTF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    MaterialsUnlit,
    EmissiveStrength(f32),
    TextureTransform(TextureTransform),
    /// Unknown extension, kept verbatim
    Other { name: String, value: Value },
}

impl Extension {
    /// Extension name as written in the asset.
    pub fn name(&self) -> &str {
        match self {
            Self::MaterialsUnlit => KHR_MATERIALS_UNLIT,
            Self::EmissiveStrength(_) => KHR_MATERIALS_EMISSIVE_STRENGTH,
            Self::TextureTransform(_) => KHR_TEXTURE_TRANSFORM,
            Self::Other { name, .. } => name,
        }
    }

    fn decode(name: &str, value: &Value) -> Self {
        match name {
            KHR_MATERIALS_UNLIT => Self::MaterialsUnlit,
            KHR_MATERIALS_EMISSIVE_STRENGTH => Self::EmissiveStrength(
                value
                    .get("emissiveStrength")
                    .and_then(Value::as_f64)
                    .unwrap_or(1.0) as f32,
            ),
            KHR_TEXTURE_TRANSFORM => Self::TextureTransform(TextureTransform {
                offset: read_vec2(value.get("offset")).unwrap_or([0.0, 0.0]),
                rotation: value.get("rotation").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                scale: read_vec2(value.get("scale")).unwrap_or([1.0, 1.0]),
                tex_coord: value
                    .get("texCoord")
                    .and_then(Value::as_u64)
                    .map(|v| v as u32),
            }),
            _ => Self::Other {
                name: name.to_string(),
                value: value.clone(),
            },
        }
    }
}

fn read_vec2(value: Option<&Value>) -> Option<[f32; 2]> {
    let array = value?.as_array()?;
    match array.as_slice() {
        [x, y] => Some([x.as_f64()? as f32, y.as_f64()? as f32]),
        _ => None,
    }
}

/// Extensions attached to one glTF object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    entries: Vec<Extension>,
}

impl Extensions {
    pub fn from_json(map: &ExtensionMap) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(name, value)| Extension::decode(name, value))
                .collect(),
        }
    }

    /// True when an extension with this name is present.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emissive strength multiplier, 1.0 when absent.
    pub fn emissive_strength(&self) -> f32 {
        self.entries
            .iter()
            .find_map(|e| match e {
                Extension::EmissiveStrength(s) => Some(*s),
                _ => None,
            })
            .unwrap_or(1.0)
    }

    pub fn texture_transform(&self) -> Option<&TextureTransform> {
        self.entries.iter().find_map(|e| match e {
            Extension::TextureTransform(t) => Some(t),
            _ => None,
        })
    }
}

/// True when `name` is built in or listed in `allowed`.
pub fn is_supported(name: &str, allowed: &[String]) -> bool {
    SUPPORTED_EXTENSIONS.contains(&name) || allowed.iter().any(|a| a == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ExtensionMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_known_and_unknown() {
        let ext = Extensions::from_json(&map(json!({
            "KHR_materials_unlit": {},
            "VENDOR_thing": {"a": 1}
        })));
        assert!(ext.has(KHR_MATERIALS_UNLIT));
        assert!(ext.has("VENDOR_thing"));
        assert!(!ext.has(KHR_TEXTURE_TRANSFORM));
        assert_eq!(
            ext.get("VENDOR_thing"),
            Some(&Extension::Other {
                name: "VENDOR_thing".into(),
                value: json!({"a": 1})
            })
        );
    }

    #[test]
    fn test_texture_transform_defaults() {
        let ext = Extensions::from_json(&map(json!({
            "KHR_texture_transform": {"offset": [0.5, 0.25]}
        })));
        let transform = ext.texture_transform().unwrap();
        assert_eq!(transform.offset, [0.5, 0.25]);
        assert_eq!(transform.scale, [1.0, 1.0]);
        assert_eq!(transform.rotation, 0.0);
        assert_eq!(transform.tex_coord, None);
    }

    #[test]
    fn test_emissive_strength() {
        let ext = Extensions::from_json(&map(json!({
            "KHR_materials_emissive_strength": {"emissiveStrength": 4.0}
        })));
        assert_eq!(ext.emissive_strength(), 4.0);
        assert_eq!(Extensions::default().emissive_strength(), 1.0);
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(KHR_MESH_QUANTIZATION, &[]));
        assert!(!is_supported("EXT_meshopt_compression", &[]));
        assert!(is_supported(
            "EXT_meshopt_compression",
            &["EXT_meshopt_compression".to_string()]
        ));
    }
}
