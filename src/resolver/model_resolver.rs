//! A resolver that renders every block as a full textured cube.

use crate::mesher::geometry::{box_mesh, Material, MeshBuffer};
use crate::resolver::ModelResolver;
use crate::types::{BlockInfo, Direction};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Blocks without geometry of their own.
const EMPTY_MODELS: [&str; 5] = ["air", "cave_air", "void_air", "water", "lava"];

/// Resolves blocks to unit cubes with one material per block.
///
/// Individual blocks can be overridden with explicit geometry, and per-block
/// average colors can be registered for level-of-detail materials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CubeModelResolver {
    /// Explicit geometry by normalized block id.
    #[serde(default)]
    pub models: HashMap<String, MeshBuffer>,
    /// Average sRGB color by normalized block id.
    #[serde(default)]
    pub colors: HashMap<String, [f32; 3]>,
}

impl CubeModelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `mesh` for every block with the given id.
    pub fn with_model(mut self, id: impl Into<String>, mesh: MeshBuffer) -> Self {
        self.models.insert(id.into(), mesh);
        self
    }

    /// Register the average color of a block.
    pub fn with_color(mut self, id: impl Into<String>, color: [f32; 3]) -> Self {
        self.colors.insert(id.into(), color);
        self
    }

    fn normalize(namespace: &str, name: &str) -> String {
        BlockInfo::new(format!("{}:{}", namespace, name)).normalized_id()
    }
}

impl ModelResolver for CubeModelResolver {
    fn resolve_model(&self, namespace: &str, name: &str) -> MeshBuffer {
        let id = Self::normalize(namespace, name);
        if let Some(mesh) = self.models.get(&id) {
            return mesh.clone();
        }
        if EMPTY_MODELS.contains(&id.as_str()) {
            return MeshBuffer::new();
        }
        let material = Material::new(id.clone(), format!("{}:block/{}", namespace, id));
        box_mesh(Vec3::ZERO, Vec3::ONE, Direction::ALL, vec![material], |_| 0)
    }

    fn average_color(&self, namespace: &str, name: &str, _face: Direction) -> Option<[f32; 3]> {
        self.colors.get(&Self::normalize(namespace, name)).copied()
    }
}
