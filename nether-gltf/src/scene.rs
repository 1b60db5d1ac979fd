//! Scene graph: local and world transforms.
//!
//! World transforms are computed depth-first from the roots (parentless
//! nodes, in index order), so every parent is resolved before its children.
//! Local transforms can be overridden per node, which is how an animated
//! pose is fed through the hierarchy without touching the [`Document`].

use glam::Mat4;

use crate::document::{Document, Trs};
use crate::error::{GltfError, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    Open,
    Done,
}

/// World transforms for every node of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    world: Vec<Mat4>,
    /// Nodes in the order they were visited (parents before children)
    order: Vec<usize>,
}

impl SceneGraph {
    /// Rest pose: every node at its document transform.
    pub fn build(document: &Document) -> Result<Self> {
        Self::with_overrides(document, &[])
    }

    /// Like [`Self::build`], but `overrides[i]` (when present) replaces the
    /// local transform of node `i`. Shorter slices leave the rest untouched.
    pub fn with_overrides(document: &Document, overrides: &[Option<Trs>]) -> Result<Self> {
        let locals: Vec<Mat4> = (0..document.nodes().len())
            .map(|i| match overrides.get(i).copied().flatten() {
                Some(trs) => trs.to_matrix(),
                None => local_matrix(document, i),
            })
            .collect();
        Self::from_locals(document, &locals)
    }

    /// Propagate explicit local matrices (one per node) through the hierarchy.
    pub fn from_locals(document: &Document, locals: &[Mat4]) -> Result<Self> {
        let nodes = document.nodes();
        if locals.len() != nodes.len() {
            return Err(GltfError::IndexOutOfRange {
                kind: "local transform",
                index: locals.len(),
                count: nodes.len(),
            });
        }

        let mut world = vec![Mat4::IDENTITY; nodes.len()];
        let mut state = vec![Visit::Unseen; nodes.len()];
        let mut order = Vec::with_capacity(nodes.len());
        // (node, next child to visit)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in document.root_nodes() {
            world[root] = locals[root];
            state[root] = Visit::Open;
            order.push(root);
            stack.push((root, 0));

            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                let Some(&child) = nodes[node].children.get(*next) else {
                    state[node] = Visit::Done;
                    stack.pop();
                    continue;
                };
                *next += 1;
                match state[child] {
                    Visit::Unseen => {}
                    Visit::Open => {
                        return Err(GltfError::structural(
                            format!("node[{}]", child),
                            format!("is reachable from its own descendant {}", node),
                        ));
                    }
                    Visit::Done => {
                        return Err(GltfError::structural(
                            format!("node[{}]", child),
                            format!("is reached twice (again from node {})", node),
                        ));
                    }
                }
                world[child] = world[node] * locals[child];
                state[child] = Visit::Open;
                order.push(child);
                stack.push((child, 0));
            }
        }

        if let Some(orphan) = state.iter().position(|s| *s == Visit::Unseen) {
            return Err(GltfError::structural(
                format!("node[{}]", orphan),
                "is not reachable from any root",
            ));
        }

        Ok(Self { world, order })
    }

    /// World transform of `node`.
    pub fn world(&self, node: usize) -> Result<Mat4> {
        self.world
            .get(node)
            .copied()
            .ok_or(GltfError::IndexOutOfRange {
                kind: "node",
                index: node,
                count: self.world.len(),
            })
    }

    pub fn world_transforms(&self) -> &[Mat4] {
        &self.world
    }

    /// Traversal order, parents before children.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn into_world_transforms(self) -> Vec<Mat4> {
        self.world
    }
}

/// Local matrix of a node: its `matrix` verbatim, else T × R × S.
pub fn local_matrix(document: &Document, node: usize) -> Mat4 {
    document
        .nodes()
        .get(node)
        .map_or(Mat4::IDENTITY, |n| n.transform.matrix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadOptions;
    use glam::Vec3;

    fn doc(json: &str) -> Document {
        crate::load(json.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_root_world_equals_local() {
        let document = doc(r#"{
            "asset": {"version": "2.0"},
            "nodes": [{"translation": [1, 2, 3], "scale": [2, 2, 2]}]
        }"#);
        let graph = SceneGraph::build(&document).unwrap();
        assert_eq!(graph.world(0).unwrap(), local_matrix(&document, 0));
    }

    #[test]
    fn test_child_inherits_parent() {
        let document = doc(r#"{
            "asset": {"version": "2.0"},
            "nodes": [
                {"translation": [1, 0, 0], "children": [1]},
                {"translation": [0, 2, 0]}
            ]
        }"#);
        let graph = SceneGraph::build(&document).unwrap();
        let p = graph.world(1).unwrap().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(graph.order(), &[0, 1]);
    }

    #[test]
    fn test_overrides_replace_local() {
        let document = doc(r#"{
            "asset": {"version": "2.0"},
            "nodes": [{"children": [1]}, {"translation": [0, 2, 0]}]
        }"#);
        let overrides = [
            Some(Trs {
                translation: Vec3::new(5.0, 0.0, 0.0),
                ..Trs::IDENTITY
            }),
        ];
        let graph = SceneGraph::with_overrides(&document, &overrides).unwrap();
        let p = graph.world(1).unwrap().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(5.0, 2.0, 0.0));
    }

    #[test]
    fn test_roots_in_index_order() {
        let document = doc(r#"{
            "asset": {"version": "2.0"},
            "nodes": [{}, {"children": [0]}, {}]
        }"#);
        let graph = SceneGraph::build(&document).unwrap();
        assert_eq!(graph.order(), &[1, 0, 2]);
    }

    #[test]
    fn test_wrong_local_count() {
        let document = doc(r#"{"asset": {"version": "2.0"}, "nodes": [{}]}"#);
        assert!(SceneGraph::from_locals(&document, &[]).is_err());
    }
}
