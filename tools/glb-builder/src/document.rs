//! glTF document construction

use anyhow::Result;
use serde_json::{Map, Value, json};

use crate::utils::{assemble_glb, data_uri};
use crate::{AnimationAccessors, BufferBuilder, MeshAccessors, SkeletonAccessors};

/// How buffer 0 is stored in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferStorage {
    /// No uri; the GLB BIN chunk
    Glb,
    /// Base64 data uri inside the JSON
    Embedded,
    /// External file next to the .gltf
    External(String),
}

/// Builder for complete glTF documents
pub struct GltfBuilder {
    nodes: Vec<Value>,
    meshes: Vec<Value>,
    skins: Vec<Value>,
    animations: Vec<Value>,
    scenes: Vec<Value>,
    materials: Vec<Value>,
    textures: Vec<Value>,
    images: Vec<Value>,
    cameras: Vec<Value>,
    extensions_used: Vec<String>,
    extensions_required: Vec<String>,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            meshes: Vec::new(),
            skins: Vec::new(),
            animations: Vec::new(),
            scenes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            images: Vec::new(),
            cameras: Vec::new(),
            extensions_used: Vec::new(),
            extensions_required: Vec::new(),
        }
    }

    /// Add a node (any JSON node object)
    pub fn add_node(mut self, node: Value) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add multiple nodes
    pub fn add_nodes(mut self, nodes: Vec<Value>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Get the current node count
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Add a mesh with one primitive
    pub fn add_mesh_from_accessors(mut self, name: &str, accessors: &MeshAccessors) -> Self {
        let mut mesh = json!({"name": name, "primitives": [accessors.primitive_json()]});
        if let Some(weights) = &accessors.default_weights {
            mesh["weights"] = json!(weights);
        }
        self.meshes.push(mesh);
        self
    }

    /// Add a mesh object as-is
    pub fn add_mesh(mut self, mesh: Value) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Add a skin
    pub fn add_skin(mut self, name: &str, accessors: &SkeletonAccessors) -> Self {
        let mut skin = json!({"name": name, "joints": accessors.joints});
        if let Some(ibm) = accessors.inverse_bind_matrices {
            skin["inverseBindMatrices"] = ibm.as_json();
        }
        if let Some(root) = accessors.skeleton_root {
            skin["skeleton"] = json!(root);
        }
        self.skins.push(skin);
        self
    }

    /// Add an animation
    pub fn add_animation(mut self, name: &str, accessors: &AnimationAccessors) -> Self {
        self.animations.push(accessors.animation_json(name));
        self
    }

    /// Add an animation object as-is
    pub fn add_animation_json(mut self, animation: Value) -> Self {
        self.animations.push(animation);
        self
    }

    /// Add a scene
    pub fn add_scene(mut self, name: &str, root_nodes: &[u32]) -> Self {
        self.scenes.push(json!({"name": name, "nodes": root_nodes}));
        self
    }

    pub fn add_material(mut self, material: Value) -> Self {
        self.materials.push(material);
        self
    }

    pub fn add_texture(mut self, texture: Value) -> Self {
        self.textures.push(texture);
        self
    }

    pub fn add_image(mut self, image: Value) -> Self {
        self.images.push(image);
        self
    }

    pub fn add_camera(mut self, camera: Value) -> Self {
        self.cameras.push(camera);
        self
    }

    /// Declare an extension in `extensionsUsed`
    pub fn extension_used(mut self, name: &str) -> Self {
        self.extensions_used.push(name.to_string());
        self
    }

    /// Declare an extension in both `extensionsUsed` and `extensionsRequired`
    pub fn extension_required(mut self, name: &str) -> Self {
        self.extensions_used.push(name.to_string());
        self.extensions_required.push(name.to_string());
        self
    }

    /// Build the final glTF JSON
    pub fn build(self, buffer: &BufferBuilder, storage: BufferStorage, generator: &str) -> Value {
        let data = buffer.data();
        let mut root = Map::new();
        root.insert("asset".into(), json!({"version": "2.0", "generator": generator}));

        if !data.is_empty() {
            let mut buffer_json = json!({"byteLength": data.len()});
            match &storage {
                BufferStorage::Glb => {}
                BufferStorage::Embedded => buffer_json["uri"] = json!(data_uri(data)),
                BufferStorage::External(uri) => buffer_json["uri"] = json!(uri),
            }
            root.insert("buffers".into(), json!([buffer_json]));
            root.insert("bufferViews".into(), json!(buffer.views()));
        }
        if !buffer.accessors().is_empty() {
            root.insert("accessors".into(), json!(buffer.accessors()));
        }

        if !self.scenes.is_empty() {
            root.insert("scene".into(), json!(0));
        }
        let arrays = [
            ("scenes", self.scenes),
            ("nodes", self.nodes),
            ("meshes", self.meshes),
            ("skins", self.skins),
            ("animations", self.animations),
            ("materials", self.materials),
            ("textures", self.textures),
            ("images", self.images),
            ("cameras", self.cameras),
        ];
        for (key, values) in arrays {
            if !values.is_empty() {
                root.insert(key.into(), Value::Array(values));
            }
        }
        if !self.extensions_used.is_empty() {
            root.insert("extensionsUsed".into(), json!(self.extensions_used));
        }
        if !self.extensions_required.is_empty() {
            root.insert("extensionsRequired".into(), json!(self.extensions_required));
        }
        Value::Object(root)
    }

    /// Build and assemble a `.glb`
    pub fn build_glb(self, buffer: &BufferBuilder, generator: &str) -> Result<Vec<u8>> {
        let root = self.build(buffer, BufferStorage::Glb, generator);
        assemble_glb(&root, buffer.data())
    }

    /// Build a self-contained `.gltf` (buffer as data uri)
    pub fn build_embedded(self, buffer: &BufferBuilder, generator: &str) -> Result<Vec<u8>> {
        let root = self.build(buffer, BufferStorage::Embedded, generator);
        Ok(serde_json::to_vec_pretty(&root)?)
    }
}

impl Default for GltfBuilder {
    fn default() -> Self {
        Self::new()
    }
}
