//! Raw asset to validated [`Document`].
//!
//! Validation runs in dependency order: buffers and views first, then
//! accessors (which need view bounds), then everything that references
//! accessors. Animation samplers are checked last because their keyframe
//! times have to be decoded.

use std::collections::BTreeMap;

use crate::accessor::{AccessorType, ComponentType, ElementLayout, SparseOverrides};
use crate::config::LoadOptions;
use crate::container::RawAsset;
use crate::error::{GltfError, Result};
use crate::extensions::{self, Extensions};
use crate::schema;

use super::*;

const MIN_BYTE_STRIDE: usize = 4;
const MAX_BYTE_STRIDE: usize = 252;

/// Validate and type a raw asset.
pub(crate) fn build_document(raw: RawAsset, options: &LoadOptions) -> Result<Document> {
    let RawAsset { root, buffers } = raw;

    check_asset(&root.asset)?;
    check_required_extensions(&root, options)?;

    let buffers: Vec<Buffer> = root
        .buffers
        .iter()
        .zip(buffers)
        .map(|(raw, data)| Buffer {
            name: raw.name.clone(),
            uri: raw.uri.clone(),
            data,
        })
        .collect();

    let buffer_views = root
        .buffer_views
        .iter()
        .enumerate()
        .map(|(i, view)| build_buffer_view(i, view, &buffers))
        .collect::<Result<Vec<_>>>()?;

    // Accessors without a bufferView decode to zeros; their size counts
    // against the same budget as real buffers.
    let mut zero_filled: u64 = buffers.iter().map(|b| b.data.len() as u64).sum();
    let accessors = root
        .accessors
        .iter()
        .enumerate()
        .map(|(i, accessor)| build_accessor(i, accessor, &buffer_views, options, &mut zero_filled))
        .collect::<Result<Vec<_>>>()?;

    let textures = root
        .textures
        .iter()
        .enumerate()
        .map(|(i, texture)| build_texture(i, texture, &root))
        .collect::<Result<Vec<_>>>()?;

    let images = root
        .images
        .iter()
        .enumerate()
        .map(|(i, image)| build_image(i, image, buffer_views.len()))
        .collect::<Result<Vec<_>>>()?;

    let materials = root
        .materials
        .iter()
        .enumerate()
        .map(|(i, material)| build_material(i, material, textures.len()))
        .collect::<Result<Vec<_>>>()?;

    let meshes = root
        .meshes
        .iter()
        .enumerate()
        .map(|(i, mesh)| build_mesh(i, mesh, &accessors, materials.len()))
        .collect::<Result<Vec<_>>>()?;

    let cameras = root
        .cameras
        .iter()
        .enumerate()
        .map(|(i, camera)| build_camera(i, camera))
        .collect::<Result<Vec<_>>>()?;

    let skins = root
        .skins
        .iter()
        .enumerate()
        .map(|(i, skin)| build_skin(i, skin, &root, &accessors))
        .collect::<Result<Vec<_>>>()?;

    let nodes = root
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| build_node(i, node, &root, &meshes))
        .collect::<Result<Vec<_>>>()?;

    let parents = link_parents(&nodes)?;

    let scenes = root
        .scenes
        .iter()
        .enumerate()
        .map(|(i, scene)| build_scene(i, scene, &parents))
        .collect::<Result<Vec<_>>>()?;

    if let Some(scene) = root.scene {
        check_ref("scene".into(), "scene", scene, scenes.len())?;
    }

    let mut skin_users = vec![Vec::new(); skins.len()];
    let mut mesh_users = vec![Vec::new(); meshes.len()];
    for (i, node) in nodes.iter().enumerate() {
        if let Some(skin) = node.skin {
            skin_users[skin].push(i);
        }
        if let Some(mesh) = node.mesh {
            mesh_users[mesh].push(i);
        }
    }

    let animations = root
        .animations
        .iter()
        .enumerate()
        .map(|(i, animation)| build_animation(i, animation, &nodes))
        .collect::<Result<Vec<_>>>()?;

    let mut document = Document {
        asset: AssetInfo {
            version: root.asset.version.clone(),
            generator: root.asset.generator.clone(),
            copyright: root.asset.copyright.clone(),
        },
        default_scene: root.scene,
        scenes,
        nodes,
        meshes,
        accessors,
        buffer_views,
        buffers,
        skins,
        animations,
        materials,
        textures,
        texture_samplers: root
            .samplers
            .iter()
            .map(|s| TextureSampler {
                mag_filter: s.mag_filter,
                min_filter: s.min_filter,
                wrap_s: s.wrap_s,
                wrap_t: s.wrap_t,
            })
            .collect(),
        images,
        cameras,
        extensions: Extensions::from_json(&root.extensions),
        extensions_used: root.extensions_used.clone(),
        extensions_required: root.extensions_required.clone(),
        sparse_overrides: Vec::new(),
        parents,
        skin_users,
        mesh_users,
    };

    document.sparse_overrides = (0..document.accessors.len())
        .map(|i| resolve_sparse(&document, i))
        .collect::<Result<Vec<_>>>()?;

    check_mesh_accessors(&document)?;
    check_skin_accessors(&document)?;
    check_animation_accessors(&document)?;

    Ok(document)
}

/// `Validation` error unless `index < count`.
fn check_ref(path: String, kind: &str, index: usize, count: usize) -> Result<usize> {
    if index < count {
        Ok(index)
    } else {
        Err(GltfError::dangling(path, kind, index))
    }
}

fn check_asset(asset: &schema::Asset) -> Result<()> {
    let major = asset.version.split('.').next().unwrap_or_default();
    if major != "2" {
        return Err(GltfError::validation(
            "asset.version",
            format!("is `{}`, only glTF 2.x is supported", asset.version),
        ));
    }
    Ok(())
}

fn check_required_extensions(root: &schema::Root, options: &LoadOptions) -> Result<()> {
    for name in &root.extensions_required {
        if !root.extensions_used.contains(name) {
            tracing::warn!("Extension {} is required but not listed in extensionsUsed", name);
        }
        if extensions::is_supported(name, &options.allowed_extensions) {
            continue;
        }
        if options.strict {
            return Err(GltfError::UnsupportedExtension { name: name.clone() });
        }
        tracing::warn!("Required extension {} is not supported, loading anyway", name);
    }
    Ok(())
}

fn build_buffer_view(i: usize, raw: &schema::BufferView, buffers: &[Buffer]) -> Result<BufferView> {
    let path = format!("bufferView[{}]", i);
    let buffer = check_ref(format!("{}.buffer", path), "buffer", raw.buffer, buffers.len())?;

    let end = raw.byte_offset.checked_add(raw.byte_length);
    let available = buffers[buffer].data.len();
    if end.is_none_or(|end| end > available) {
        return Err(GltfError::validation(
            path,
            format!(
                "range {}+{} exceeds buffer {} ({} bytes)",
                raw.byte_offset, raw.byte_length, buffer, available
            ),
        ));
    }

    if let Some(stride) = raw.byte_stride {
        if !(MIN_BYTE_STRIDE..=MAX_BYTE_STRIDE).contains(&stride) || stride % 4 != 0 {
            return Err(GltfError::validation(
                format!("{}.byteStride", path),
                format!(
                    "is {}, must be a multiple of 4 in {}..={}",
                    stride, MIN_BYTE_STRIDE, MAX_BYTE_STRIDE
                ),
            ));
        }
    }

    let target = match raw.target {
        None => None,
        Some(34962) => Some(BufferTarget::ArrayBuffer),
        Some(34963) => Some(BufferTarget::ElementArrayBuffer),
        Some(other) => {
            return Err(GltfError::validation(
                format!("{}.target", path),
                format!("is {}, expected 34962 or 34963", other),
            ));
        }
    };

    Ok(BufferView {
        name: raw.name.clone(),
        buffer,
        byte_offset: raw.byte_offset,
        byte_length: raw.byte_length,
        byte_stride: raw.byte_stride,
        target,
    })
}

fn parse_component_type(path: String, value: u32) -> Result<ComponentType> {
    ComponentType::from_gl(value)
        .ok_or_else(|| GltfError::validation(path, format!("unknown component type {}", value)))
}

fn build_accessor(
    i: usize,
    raw: &schema::Accessor,
    views: &[BufferView],
    options: &LoadOptions,
    decoded_bytes: &mut u64,
) -> Result<Accessor> {
    let path = format!("accessor[{}]", i);
    let component_type = parse_component_type(format!("{}.componentType", path), raw.component_type)?;
    let accessor_type = AccessorType::parse(&raw.type_).ok_or_else(|| {
        GltfError::validation(format!("{}.type", path), format!("unknown type `{}`", raw.type_))
    })?;
    if raw.normalized && !component_type.can_normalize() {
        return Err(GltfError::validation(
            format!("{}.normalized", path),
            format!("is set on {:?} components", component_type),
        ));
    }

    let layout = ElementLayout::new(component_type, accessor_type);
    let components = accessor_type.components();
    for (name, bound) in [("min", &raw.min), ("max", &raw.max)] {
        if let Some(values) = bound {
            if values.len() != components {
                return Err(GltfError::validation(
                    format!("{}.{}", path, name),
                    format!("has {} values, expected {}", values.len(), components),
                ));
            }
        }
    }

    if let Some(view_index) = raw.buffer_view {
        let view_index = check_ref(
            format!("{}.bufferView", path),
            "bufferView",
            view_index,
            views.len(),
        )?;
        let view = &views[view_index];
        let element_size = layout.size();
        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(GltfError::validation(
                path,
                format!(
                    "element size {} exceeds byteStride {} of bufferView {}",
                    element_size, stride, view_index
                ),
            ));
        }
        if raw.count > 0 {
            let needed = (raw.count - 1)
                .checked_mul(stride)
                .and_then(|n| n.checked_add(raw.byte_offset))
                .and_then(|n| n.checked_add(element_size));
            if needed.is_none_or(|needed| needed > view.byte_length) {
                return Err(GltfError::validation(
                    path,
                    format!(
                        "{} elements of {} bytes at offset {} (stride {}) overrun bufferView {} ({} bytes)",
                        raw.count, element_size, raw.byte_offset, stride, view_index, view.byte_length
                    ),
                ));
            }
        }
        if raw.byte_offset > view.byte_length {
            return Err(GltfError::validation(
                format!("{}.byteOffset", path),
                format!(
                    "is {}, past the end of bufferView {} ({} bytes)",
                    raw.byte_offset, view_index, view.byte_length
                ),
            ));
        }
        // Both offsets lie inside the buffer, so the sum cannot overflow
        if (view.byte_offset + raw.byte_offset) % component_type.size() != 0 {
            tracing::warn!(
                "{} is not aligned to its {}-byte component size",
                path,
                component_type.size()
            );
        }
    }

    if raw.buffer_view.is_none() {
        let size = raw
            .count
            .checked_mul(layout.size())
            .map_or(u64::MAX, |n| n as u64);
        *decoded_bytes = decoded_bytes.saturating_add(size);
        if *decoded_bytes > options.max_buffer_bytes {
            return Err(GltfError::LimitExceeded {
                what: format!("{} (zero-filled, {} elements)", path, raw.count),
                size: *decoded_bytes,
                limit: options.max_buffer_bytes,
            });
        }
    }

    let sparse = match &raw.sparse {
        Some(sparse) => Some(build_sparse(&path, raw, sparse, layout, views)?),
        None => None,
    };

    Ok(Accessor {
        name: raw.name.clone(),
        buffer_view: raw.buffer_view,
        byte_offset: raw.byte_offset,
        component_type,
        accessor_type,
        normalized: raw.normalized,
        count: raw.count,
        min: raw.min.clone(),
        max: raw.max.clone(),
        sparse,
    })
}

fn build_sparse(
    path: &str,
    accessor: &schema::Accessor,
    raw: &schema::Sparse,
    layout: ElementLayout,
    views: &[BufferView],
) -> Result<Sparse> {
    let path = format!("{}.sparse", path);
    if raw.count == 0 || raw.count > accessor.count {
        return Err(GltfError::validation(
            format!("{}.count", path),
            format!("is {}, must be in 1..={}", raw.count, accessor.count),
        ));
    }

    let indices_type = parse_component_type(
        format!("{}.indices.componentType", path),
        raw.indices.component_type,
    )?;
    if !matches!(indices_type, ComponentType::U8 | ComponentType::U16 | ComponentType::U32) {
        return Err(GltfError::validation(
            format!("{}.indices.componentType", path),
            format!("is {:?}, expected an unsigned integer type", indices_type),
        ));
    }

    let parts = [
        ("indices", raw.indices.buffer_view, raw.indices.byte_offset, indices_type.size()),
        ("values", raw.values.buffer_view, raw.values.byte_offset, layout.size()),
    ];
    for (name, view_index, offset, element_size) in parts {
        let view_path = format!("{}.{}.bufferView", path, name);
        let view_index = check_ref(view_path.clone(), "bufferView", view_index, views.len())?;
        let needed = raw
            .count
            .checked_mul(element_size)
            .and_then(|n| n.checked_add(offset));
        if needed.is_none_or(|needed| needed > views[view_index].byte_length) {
            return Err(GltfError::validation(
                view_path,
                format!(
                    "{} sparse {} overrun bufferView {} ({} bytes)",
                    raw.count, name, view_index, views[view_index].byte_length
                ),
            ));
        }
    }

    Ok(Sparse {
        count: raw.count,
        indices_view: raw.indices.buffer_view,
        indices_offset: raw.indices.byte_offset,
        indices_type,
        values_view: raw.values.buffer_view,
        values_offset: raw.values.byte_offset,
    })
}

/// Decode the sparse index/value arrays of accessor `i` into a lookup map.
fn resolve_sparse(document: &Document, i: usize) -> Result<Option<SparseOverrides>> {
    let accessor = &document.accessors[i];
    let Some(sparse) = &accessor.sparse else {
        return Ok(None);
    };
    let path = format!("accessor[{}].sparse", i);
    let index_layout = ElementLayout::new(sparse.indices_type, AccessorType::Scalar);
    let value_layout = accessor.layout();
    let indices = &document.view_bytes(sparse.indices_view)?[sparse.indices_offset..];
    let values = &document.view_bytes(sparse.values_view)?[sparse.values_offset..];

    let mut overrides = SparseOverrides::with_capacity(sparse.count);
    let mut previous: Option<usize> = None;
    for n in 0..sparse.count {
        let at = n * index_layout.size();
        let target = index_layout.decode(&indices[at..], false)[0] as usize;
        if target >= accessor.count {
            return Err(GltfError::validation(
                format!("{}.indices[{}]", path, n),
                format!("is {}, accessor has {} elements", target, accessor.count),
            ));
        }
        if previous.is_some_and(|p| target <= p) {
            return Err(GltfError::validation(
                format!("{}.indices[{}]", path, n),
                "is not strictly increasing",
            ));
        }
        previous = Some(target);
        let at = n * value_layout.size();
        overrides.insert(target, value_layout.decode(&values[at..], accessor.normalized));
    }
    Ok(Some(overrides))
}

fn texture_ref(path: String, index: usize, tex_coord: u32, ext: Option<&schema::ExtensionMap>, textures: usize) -> Result<TextureRef> {
    let index = check_ref(path, "texture", index, textures)?;
    Ok(TextureRef {
        index,
        tex_coord,
        transform: ext.and_then(|map| Extensions::from_json(map).texture_transform().copied()),
    })
}

fn build_material(i: usize, raw: &schema::Material, textures: usize) -> Result<Material> {
    let path = format!("material[{}]", i);
    let mut material = Material {
        name: raw.name.clone(),
        extensions: Extensions::from_json(&raw.extensions),
        double_sided: raw.double_sided,
        ..Material::default()
    };

    if let Some(pbr) = &raw.pbr_metallic_roughness {
        let pbr_path = format!("{}.pbrMetallicRoughness", path);
        if let Some(factor) = pbr.base_color_factor {
            material.base_color_factor = factor;
        }
        if let Some(factor) = pbr.metallic_factor {
            material.metallic_factor = factor;
        }
        if let Some(factor) = pbr.roughness_factor {
            material.roughness_factor = factor;
        }
        if let Some(info) = &pbr.base_color_texture {
            material.base_color_texture = Some(texture_ref(
                format!("{}.baseColorTexture.index", pbr_path),
                info.index,
                info.tex_coord,
                Some(&info.extensions),
                textures,
            )?);
        }
        if let Some(info) = &pbr.metallic_roughness_texture {
            material.metallic_roughness_texture = Some(texture_ref(
                format!("{}.metallicRoughnessTexture.index", pbr_path),
                info.index,
                info.tex_coord,
                Some(&info.extensions),
                textures,
            )?);
        }
    }

    if let Some(info) = &raw.normal_texture {
        material.normal_texture = Some(texture_ref(
            format!("{}.normalTexture.index", path),
            info.index,
            info.tex_coord,
            None,
            textures,
        )?);
        material.normal_scale = info.scale.unwrap_or(1.0);
    }
    if let Some(info) = &raw.occlusion_texture {
        material.occlusion_texture = Some(texture_ref(
            format!("{}.occlusionTexture.index", path),
            info.index,
            info.tex_coord,
            None,
            textures,
        )?);
        material.occlusion_strength = info.strength.unwrap_or(1.0);
    }
    if let Some(info) = &raw.emissive_texture {
        material.emissive_texture = Some(texture_ref(
            format!("{}.emissiveTexture.index", path),
            info.index,
            info.tex_coord,
            Some(&info.extensions),
            textures,
        )?);
    }
    if let Some(factor) = raw.emissive_factor {
        material.emissive_factor = factor;
    }

    material.alpha_mode = match raw.alpha_mode.as_deref() {
        None | Some("OPAQUE") => AlphaMode::Opaque,
        Some("MASK") => AlphaMode::Mask,
        Some("BLEND") => AlphaMode::Blend,
        Some(other) => {
            return Err(GltfError::validation(
                format!("{}.alphaMode", path),
                format!("unknown alpha mode `{}`", other),
            ));
        }
    };
    if let Some(cutoff) = raw.alpha_cutoff {
        material.alpha_cutoff = cutoff;
    }

    Ok(material)
}

fn build_texture(i: usize, raw: &schema::Texture, root: &schema::Root) -> Result<Texture> {
    let path = format!("texture[{}]", i);
    if let Some(sampler) = raw.sampler {
        check_ref(format!("{}.sampler", path), "sampler", sampler, root.samplers.len())?;
    }
    if let Some(source) = raw.source {
        check_ref(format!("{}.source", path), "image", source, root.images.len())?;
    }
    Ok(Texture {
        name: raw.name.clone(),
        sampler: raw.sampler,
        source: raw.source,
    })
}

fn build_image(i: usize, raw: &schema::Image, views: usize) -> Result<Image> {
    let path = format!("image[{}]", i);
    let source = match (&raw.uri, raw.buffer_view) {
        (Some(uri), None) => ImageSource::Uri(uri.clone()),
        (None, Some(view)) => {
            check_ref(format!("{}.bufferView", path), "bufferView", view, views)?;
            if raw.mime_type.is_none() {
                tracing::warn!("{} is stored in a buffer view without a mimeType", path);
            }
            ImageSource::View {
                buffer_view: view,
                mime_type: raw.mime_type.clone(),
            }
        }
        _ => {
            return Err(GltfError::validation(
                path,
                "must define exactly one of uri and bufferView",
            ));
        }
    };
    Ok(Image {
        name: raw.name.clone(),
        source,
    })
}

fn build_camera(i: usize, raw: &schema::Camera) -> Result<Camera> {
    let path = format!("camera[{}]", i);
    let projection = match (raw.type_.as_str(), &raw.perspective, &raw.orthographic) {
        ("perspective", Some(p), _) => Projection::Perspective {
            aspect_ratio: p.aspect_ratio,
            yfov: p.yfov,
            znear: p.znear,
            zfar: p.zfar,
        },
        ("orthographic", _, Some(o)) => Projection::Orthographic {
            xmag: o.xmag,
            ymag: o.ymag,
            znear: o.znear,
            zfar: o.zfar,
        },
        (kind, _, _) => {
            return Err(GltfError::validation(
                path,
                format!("has type `{}` without matching projection", kind),
            ));
        }
    };
    Ok(Camera {
        name: raw.name.clone(),
        projection,
    })
}

fn build_mesh(i: usize, raw: &schema::Mesh, accessors: &[Accessor], materials: usize) -> Result<Mesh> {
    let path = format!("mesh[{}]", i);
    if raw.primitives.is_empty() {
        return Err(GltfError::validation(path, "has no primitives"));
    }

    let mut primitives = Vec::with_capacity(raw.primitives.len());
    for (p, prim) in raw.primitives.iter().enumerate() {
        let prim_path = format!("{}.primitive[{}]", path, p);

        let mut attributes = BTreeMap::new();
        for (name, &accessor) in &prim.attributes {
            check_ref(
                format!("{}.attributes.{}", prim_path, name),
                "accessor",
                accessor,
                accessors.len(),
            )?;
            attributes.insert(Semantic::parse(name), accessor);
        }

        if let Some(indices) = prim.indices {
            check_ref(format!("{}.indices", prim_path), "accessor", indices, accessors.len())?;
        }
        if let Some(material) = prim.material {
            check_ref(format!("{}.material", prim_path), "material", material, materials)?;
        }
        let mode = Mode::from_gl(prim.mode).ok_or_else(|| {
            GltfError::validation(
                format!("{}.mode", prim_path),
                format!("unknown primitive mode {}", prim.mode),
            )
        })?;

        let mut targets = Vec::with_capacity(prim.targets.len());
        for (t, target) in prim.targets.iter().enumerate() {
            let mut morph = MorphTarget::default();
            for (name, &accessor) in target {
                check_ref(
                    format!("{}.targets[{}].{}", prim_path, t, name),
                    "accessor",
                    accessor,
                    accessors.len(),
                )?;
                match name.as_str() {
                    "POSITION" => morph.positions = Some(accessor),
                    "NORMAL" => morph.normals = Some(accessor),
                    "TANGENT" => morph.tangents = Some(accessor),
                    other => tracing::debug!("{}.targets[{}]: ignoring {}", prim_path, t, other),
                }
            }
            targets.push(morph);
        }

        primitives.push(Primitive {
            attributes,
            indices: prim.indices,
            material: prim.material,
            mode,
            targets,
        });
    }

    let target_count = primitives[0].targets.len();
    if let Some(p) = primitives.iter().position(|p| p.targets.len() != target_count) {
        return Err(GltfError::validation(
            format!("{}.primitive[{}].targets", path, p),
            format!(
                "has {} morph targets, primitive 0 has {}",
                primitives[p].targets.len(),
                target_count
            ),
        ));
    }

    let weights = match &raw.weights {
        Some(weights) if weights.len() != target_count => {
            return Err(GltfError::validation(
                format!("{}.weights", path),
                format!("has {} values for {} morph targets", weights.len(), target_count),
            ));
        }
        Some(weights) => weights.clone(),
        None => vec![0.0; target_count],
    };

    Ok(Mesh {
        name: raw.name.clone(),
        primitives,
        weights,
        extensions: Extensions::from_json(&raw.extensions),
    })
}

fn build_skin(i: usize, raw: &schema::Skin, root: &schema::Root, accessors: &[Accessor]) -> Result<Skin> {
    let path = format!("skin[{}]", i);
    if raw.joints.is_empty() {
        return Err(GltfError::validation(format!("{}.joints", path), "is empty"));
    }
    for (j, &joint) in raw.joints.iter().enumerate() {
        check_ref(format!("{}.joints[{}]", path, j), "node", joint, root.nodes.len())?;
    }
    if let Some(skeleton) = raw.skeleton {
        check_ref(format!("{}.skeleton", path), "node", skeleton, root.nodes.len())?;
    }
    if let Some(ibm) = raw.inverse_bind_matrices {
        check_ref(
            format!("{}.inverseBindMatrices", path),
            "accessor",
            ibm,
            accessors.len(),
        )?;
        let accessor = &accessors[ibm];
        if accessor.accessor_type != AccessorType::Mat4 || accessor.count < raw.joints.len() {
            return Err(GltfError::validation(
                format!("{}.inverseBindMatrices", path),
                format!(
                    "accessor {} is {} x{}, expected MAT4 x{}",
                    ibm,
                    accessor.accessor_type.name(),
                    accessor.count,
                    raw.joints.len()
                ),
            ));
        }
    }
    Ok(Skin {
        name: raw.name.clone(),
        joints: raw.joints.clone(),
        inverse_bind_matrices: raw.inverse_bind_matrices,
        skeleton: raw.skeleton,
    })
}

fn build_node(i: usize, raw: &schema::Node, root: &schema::Root, meshes: &[Mesh]) -> Result<Node> {
    let path = format!("node[{}]", i);
    for (c, &child) in raw.children.iter().enumerate() {
        check_ref(format!("{}.children[{}]", path, c), "node", child, root.nodes.len())?;
    }
    if let Some(mesh) = raw.mesh {
        check_ref(format!("{}.mesh", path), "mesh", mesh, meshes.len())?;
    }
    if let Some(skin) = raw.skin {
        check_ref(format!("{}.skin", path), "skin", skin, root.skins.len())?;
        if raw.mesh.is_none() {
            tracing::warn!("{} has a skin but no mesh", path);
        }
    }
    if let Some(camera) = raw.camera {
        check_ref(format!("{}.camera", path), "camera", camera, root.cameras.len())?;
    }

    let has_trs = raw.translation.is_some() || raw.rotation.is_some() || raw.scale.is_some();
    let transform = match raw.matrix {
        Some(_) if has_trs => {
            return Err(GltfError::validation(
                format!("{}.matrix", path),
                "is set together with translation/rotation/scale",
            ));
        }
        Some(m) => Transform::Matrix(Mat4::from_cols_array(&m)),
        None => Transform::Decomposed(Trs {
            translation: raw.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
            rotation: raw.rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY),
            scale: raw.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
        }),
    };

    if let (Some(weights), Some(mesh)) = (&raw.weights, raw.mesh) {
        let targets = meshes[mesh].target_count();
        if weights.len() != targets {
            return Err(GltfError::validation(
                format!("{}.weights", path),
                format!("has {} values for {} morph targets", weights.len(), targets),
            ));
        }
    }

    Ok(Node {
        name: raw.name.clone(),
        transform,
        children: raw.children.clone(),
        mesh: raw.mesh,
        skin: raw.skin,
        camera: raw.camera,
        weights: raw.weights.clone(),
        extensions: Extensions::from_json(&raw.extensions),
    })
}

/// Parent table. Fails if a node has two parents or the hierarchy has a cycle.
fn link_parents(nodes: &[Node]) -> Result<Vec<Option<usize>>> {
    let mut parents: Vec<Option<usize>> = vec![None; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for (c, &child) in node.children.iter().enumerate() {
            if let Some(existing) = parents[child] {
                return Err(GltfError::structural(
                    format!("node[{}].children[{}]", i, c),
                    format!("node {} already has parent {}", child, existing),
                ));
            }
            parents[child] = Some(i);
        }
    }

    // With at most one parent each, any node that walks up for more than
    // `len` steps is on a cycle.
    for start in 0..nodes.len() {
        let mut current = start;
        let mut steps = 0;
        while let Some(parent) = parents[current] {
            if parent == start || steps > nodes.len() {
                return Err(GltfError::structural(
                    format!("node[{}]", start),
                    "is its own ancestor",
                ));
            }
            current = parent;
            steps += 1;
        }
    }
    Ok(parents)
}

fn build_scene(i: usize, raw: &schema::Scene, parents: &[Option<usize>]) -> Result<Scene> {
    for (n, &node) in raw.nodes.iter().enumerate() {
        check_ref(format!("scene[{}].nodes[{}]", i, n), "node", node, parents.len())?;
        if parents[node].is_some() {
            tracing::warn!("scene[{}].nodes[{}]: node {} is not a root", i, n, node);
        }
    }
    Ok(Scene {
        name: raw.name.clone(),
        nodes: raw.nodes.clone(),
    })
}

fn build_animation(i: usize, raw: &schema::Animation, nodes: &[Node]) -> Result<Animation> {
    let path = format!("animation[{}]", i);
    let mut samplers = Vec::with_capacity(raw.samplers.len());
    for (s, sampler) in raw.samplers.iter().enumerate() {
        let interpolation = match sampler.interpolation.as_deref() {
            None => Interpolation::Linear,
            Some(name) => Interpolation::parse(name).ok_or_else(|| {
                GltfError::validation(
                    format!("{}.sampler[{}].interpolation", path, s),
                    format!("unknown interpolation `{}`", name),
                )
            })?,
        };
        samplers.push(AnimationSampler {
            input: sampler.input,
            output: sampler.output,
            interpolation,
        });
    }

    let mut channels = Vec::with_capacity(raw.channels.len());
    for (c, channel) in raw.channels.iter().enumerate() {
        let channel_path = format!("{}.channel[{}]", path, c);
        let sampler = check_ref(
            format!("{}.sampler", channel_path),
            "sampler",
            channel.sampler,
            samplers.len(),
        )?;
        let Some(node) = channel.target.node else {
            tracing::debug!("{} has no target node, skipping", channel_path);
            continue;
        };
        let node = check_ref(format!("{}.target.node", channel_path), "node", node, nodes.len())?;
        let Some(property) = Property::parse(&channel.target.path) else {
            tracing::warn!(
                "{} targets unsupported path `{}`, skipping",
                channel_path,
                channel.target.path
            );
            continue;
        };
        if property == Property::Weights && nodes[node].mesh.is_none() {
            return Err(GltfError::validation(
                format!("{}.target", channel_path),
                format!("animates weights of node {}, which has no mesh", node),
            ));
        }
        channels.push(Channel {
            sampler,
            node,
            property,
        });
    }

    Ok(Animation {
        name: raw.name.clone(),
        channels,
        samplers,
    })
}

fn check_mesh_accessors(document: &Document) -> Result<()> {
    for (m, mesh) in document.meshes.iter().enumerate() {
        for (p, prim) in mesh.primitives.iter().enumerate() {
            let path = format!("mesh[{}].primitive[{}]", m, p);
            let vertex_count = prim
                .get(&Semantic::Positions)
                .map(|a| document.accessors[a].count);

            if let Some(count) = vertex_count {
                for &a in prim.attributes.values() {
                    if document.accessors[a].count != count {
                        return Err(GltfError::validation(
                            format!("{}.attributes", path),
                            format!(
                                "accessor {} has {} elements, POSITION has {}",
                                a, document.accessors[a].count, count
                            ),
                        ));
                    }
                }
                for (t, target) in prim.targets.iter().enumerate() {
                    for a in [target.positions, target.normals, target.tangents].into_iter().flatten() {
                        if document.accessors[a].count != count {
                            return Err(GltfError::validation(
                                format!("{}.targets[{}]", path, t),
                                format!(
                                    "accessor {} has {} elements, POSITION has {}",
                                    a, document.accessors[a].count, count
                                ),
                            ));
                        }
                    }
                }
            }

            if let Some(indices) = prim.indices {
                let accessor = &document.accessors[indices];
                let unsigned = matches!(
                    accessor.component_type,
                    ComponentType::U8 | ComponentType::U16 | ComponentType::U32
                );
                if accessor.accessor_type != AccessorType::Scalar || !unsigned || accessor.normalized {
                    return Err(GltfError::validation(
                        format!("{}.indices", path),
                        format!(
                            "accessor {} is {} {:?}, expected unsigned integer SCALAR",
                            indices,
                            accessor.accessor_type.name(),
                            accessor.component_type
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn check_skin_accessors(document: &Document) -> Result<()> {
    for (s, skin) in document.skins.iter().enumerate() {
        if let Some(ibm) = skin.inverse_bind_matrices {
            // Decoding up front surfaces bad sparse/view data at load time
            document.reader(ibm)?.read_mat4().map_err(|e| {
                GltfError::validation(format!("skin[{}].inverseBindMatrices", s), e.to_string())
            })?;
        }
    }
    Ok(())
}

fn check_animation_accessors(document: &Document) -> Result<()> {
    for (a, animation) in document.animations.iter().enumerate() {
        for (s, sampler) in animation.samplers.iter().enumerate() {
            let path = format!("animation[{}].sampler[{}]", a, s);
            let input = check_ref(
                format!("{}.input", path),
                "accessor",
                sampler.input,
                document.accessors.len(),
            )?;
            check_ref(
                format!("{}.output", path),
                "accessor",
                sampler.output,
                document.accessors.len(),
            )?;

            let accessor = &document.accessors[input];
            if accessor.accessor_type != AccessorType::Scalar
                || accessor.component_type != ComponentType::F32
            {
                return Err(GltfError::validation(
                    format!("{}.input", path),
                    format!(
                        "accessor {} is {} {:?}, expected SCALAR F32",
                        input,
                        accessor.accessor_type.name(),
                        accessor.component_type
                    ),
                ));
            }
            if accessor.count == 0 {
                return Err(GltfError::validation(format!("{}.input", path), "has no keyframes"));
            }

            let times = document.reader(input)?.read_f32()?;
            if let Some(k) = times.windows(2).position(|w| w[1] < w[0]) {
                return Err(GltfError::validation(
                    format!("{}.input", path),
                    format!(
                        "keyframe {} at {}s is earlier than keyframe {} at {}s",
                        k + 1,
                        times[k + 1],
                        k,
                        times[k]
                    ),
                ));
            }
            if times.iter().any(|t| !t.is_finite() || *t < 0.0) {
                return Err(GltfError::validation(
                    format!("{}.input", path),
                    "contains negative or non-finite times",
                ));
            }
        }

        for (c, channel) in animation.channels.iter().enumerate() {
            let path = format!("animation[{}].channel[{}]", a, c);
            let sampler = &animation.samplers[channel.sampler];
            let output = &document.accessors[sampler.output];
            let keyframes = document.accessors[sampler.input].count;

            let (expected_type, per_key) = match channel.property {
                Property::Translation | Property::Scale => (AccessorType::Vec3, 1),
                Property::Rotation => (AccessorType::Vec4, 1),
                Property::Weights => {
                    let mesh = document.nodes[channel.node].mesh.map_or(0, |m| {
                        document.meshes[m].target_count()
                    });
                    if mesh == 0 {
                        return Err(GltfError::validation(
                            format!("{}.target", path),
                            format!("animates weights of node {}, whose mesh has no morph targets", channel.node),
                        ));
                    }
                    (AccessorType::Scalar, mesh)
                }
            };
            if output.accessor_type != expected_type {
                return Err(GltfError::validation(
                    format!("{}.sampler", path),
                    format!(
                        "output accessor {} is {}, expected {}",
                        sampler.output,
                        output.accessor_type.name(),
                        expected_type.name()
                    ),
                ));
            }
            let tangents = if sampler.interpolation == Interpolation::CubicSpline { 3 } else { 1 };
            let expected = keyframes * tangents * per_key;
            if output.count != expected {
                return Err(GltfError::validation(
                    format!("{}.sampler", path),
                    format!(
                        "output accessor {} has {} elements, expected {} ({} keyframes)",
                        sampler.output, output.count, expected, keyframes
                    ),
                ));
            }
        }
    }
    Ok(())
}
