//! Vertex, UV and face deduplication.
//!
//! Coordinates are quantized onto a fixed grid so that near-equal points hash
//! identically. Faces that occur more than once after canonicalization are
//! coincident overlapping geometry and are removed entirely.

use crate::error::Result;
use crate::mesher::geometry::{Material, MeshBuffer, Quad};
use crate::types::FaceDirection;
use std::collections::HashMap;

/// Spatial quantization step.
pub const SPATIAL_QUANTUM: f64 = 1e-4;

/// Texture coordinate quantization step.
pub const UV_QUANTUM: f64 = 1e-6;

/// Round half up onto a grid of `quantum`.
pub(crate) fn quantize(value: f32, quantum: f64) -> i64 {
    (value as f64 / quantum + 0.5).floor() as i64
}

/// Canonical hash key of a vertex position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey(pub i64, pub i64, pub i64);

impl VertexKey {
    pub fn from_position(position: [f32; 3]) -> Self {
        Self(
            quantize(position[0], SPATIAL_QUANTUM),
            quantize(position[1], SPATIAL_QUANTUM),
            quantize(position[2], SPATIAL_QUANTUM),
        )
    }
}

/// Canonical hash key of a texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UvKey(pub i64, pub i64);

impl UvKey {
    pub fn from_uv(uv: [f32; 2]) -> Self {
        Self(quantize(uv[0], UV_QUANTUM), quantize(uv[1], UV_QUANTUM))
    }
}

/// Canonical key of a face: its sorted vertex indices, plus the material
/// when deduplication is strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceKey {
    pub vertices: [u32; 4],
    pub material: Option<u32>,
}

impl FaceKey {
    pub fn new(face: &Quad, strict: bool) -> Self {
        let mut vertices = face.vertices;
        vertices.sort_unstable();
        Self {
            vertices,
            material: strict.then_some(face.material),
        }
    }
}

/// Incrementally builds a mesh whose vertices and UVs are unique by key.
///
/// The first occurrence of a key keeps its exact coordinates.
#[derive(Debug, Default)]
pub struct MeshWelder {
    mesh: MeshBuffer,
    vertex_map: HashMap<VertexKey, u32>,
    uv_map: HashMap<UvKey, u32>,
}

impl MeshWelder {
    pub fn new(materials: Vec<Material>) -> Self {
        Self {
            mesh: MeshBuffer {
                materials,
                ..MeshBuffer::default()
            },
            ..Self::default()
        }
    }

    /// Index of the canonical vertex for `position`.
    pub fn vertex(&mut self, position: [f32; 3]) -> u32 {
        let mesh = &mut self.mesh;
        *self
            .vertex_map
            .entry(VertexKey::from_position(position))
            .or_insert_with(|| mesh.add_vertex(position))
    }

    /// Index of the canonical UV for `uv`.
    pub fn uv(&mut self, uv: [f32; 2]) -> u32 {
        let mesh = &mut self.mesh;
        *self
            .uv_map
            .entry(UvKey::from_uv(uv))
            .or_insert_with(|| mesh.add_uv(uv))
    }

    /// Add a quad from raw corner data.
    pub fn push_quad(
        &mut self,
        positions: [[f32; 3]; 4],
        uvs: [[f32; 2]; 4],
        material: u32,
        direction: FaceDirection,
    ) {
        let vertices = positions.map(|p| self.vertex(p));
        let uvs = uvs.map(|t| self.uv(t));
        self.mesh.add_quad(vertices, uvs, material, direction);
    }

    /// Copy a quad out of `source`, welding its corners.
    ///
    /// The quad must have been validated against `source`, and `source` must
    /// share this welder's material list.
    pub fn push_face_from(&mut self, source: &MeshBuffer, face: &Quad) {
        let positions = face.vertices.map(|i| source.vertices[i as usize]);
        let uvs = face.uvs.map(|i| source.uvs[i as usize]);
        self.push_quad(positions, uvs, face.material, face.direction);
    }

    pub fn finish(self) -> MeshBuffer {
        self.mesh
    }
}

/// Rebuild a mesh with unique vertices and UVs.
///
/// Vertices and UVs are renumbered in order of first reference by a face;
/// entries no face references are dropped.
pub fn weld(mesh: &MeshBuffer) -> Result<MeshBuffer> {
    mesh.validate()?;
    let mut welder = MeshWelder::new(mesh.materials.clone());
    for face in &mesh.faces {
        welder.push_face_from(mesh, face);
    }
    Ok(welder.finish())
}

/// Remove every face whose canonical key occurs more than once.
///
/// The mesh must already be welded, so that equal positions share an index.
pub fn remove_duplicate_faces(mesh: &mut MeshBuffer, strict: bool) {
    let mut counts: HashMap<FaceKey, u32> = HashMap::with_capacity(mesh.faces.len());
    for face in &mesh.faces {
        *counts.entry(FaceKey::new(face, strict)).or_insert(0) += 1;
    }
    mesh.faces
        .retain(|face| counts.get(&FaceKey::new(face, strict)) == Some(&1));
}

/// Full deduplication pass: weld, drop duplicate faces, compact.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshDeduplicator {
    /// Include the material in face keys.
    pub strict: bool,
}

impl MeshDeduplicator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Deduplicate vertices, UVs and faces.
    ///
    /// Idempotent: running it on its own output returns an equal mesh.
    pub fn dedup(&self, mesh: &MeshBuffer) -> Result<MeshBuffer> {
        let mut welded = weld(mesh)?;
        let before = welded.face_count();
        remove_duplicate_faces(&mut welded, self.strict);
        let removed = before - welded.face_count();
        if removed > 0 {
            log::debug!("dedup removed {} coincident faces", removed);
            // Renumber so vertices only referenced by removed faces go away.
            welded = weld(&welded)?;
        }
        Ok(welded)
    }

    /// Deduplicate, then optionally greedy-merge coplanar quads.
    pub fn optimize(&self, mesh: &MeshBuffer, greedy: bool) -> Result<MeshBuffer> {
        let deduped = self.dedup(mesh)?;
        if greedy {
            crate::mesher::greedy::greedy_mesh(&deduped)
        } else {
            Ok(deduped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesher::geometry::{box_mesh, Material, UNIT_UVS};
    use crate::mesher::merge::merge_all;
    use crate::types::Direction;
    use glam::Vec3;
    use proptest::prelude::*;

    fn cube(at: [i32; 3], material: &str) -> MeshBuffer {
        let from = Vec3::new(at[0] as f32, at[1] as f32, at[2] as f32);
        box_mesh(
            from,
            from + Vec3::ONE,
            Direction::ALL,
            vec![Material::new(material, format!("block/{}", material))],
            |_| 0,
        )
    }

    #[test]
    fn test_quantize_rounds_half_up() {
        assert_eq!(quantize(0.5, 1.0), 1);
        assert_eq!(quantize(-0.5, 1.0), 0);
        assert_eq!(quantize(-1.5, 1.0), -1);
        assert_eq!(quantize(0.00006, SPATIAL_QUANTUM), 1);
        assert_eq!(quantize(0.00004, SPATIAL_QUANTUM), 0);
        assert_eq!(quantize(1.0, SPATIAL_QUANTUM), 10_000);
    }

    #[test]
    fn test_near_equal_points_share_key() {
        let a = VertexKey::from_position([1.0, 2.0, 3.0]);
        let b = VertexKey::from_position([1.00001, 2.0, 2.99999]);
        let c = VertexKey::from_position([1.001, 2.0, 3.0]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_face_key_ignores_rotation() {
        let face = Quad {
            vertices: [3, 1, 2, 0],
            uvs: [0, 1, 2, 3],
            material: 4,
            direction: FaceDirection::Up,
        };
        let rotated = Quad {
            vertices: [1, 2, 0, 3],
            material: 5,
            ..face
        };
        assert_eq!(FaceKey::new(&face, false), FaceKey::new(&rotated, false));
        assert_ne!(FaceKey::new(&face, true), FaceKey::new(&rotated, true));
    }

    #[test]
    fn test_isolated_cube_has_eight_vertices() {
        let deduped = MeshDeduplicator::default().dedup(&cube([0, 0, 0], "stone")).unwrap();
        assert_eq!(deduped.face_count(), 6);
        assert_eq!(deduped.vertex_count(), 8);
        assert_eq!(deduped.uvs.len(), 4);
    }

    #[test]
    fn test_shared_faces_are_removed_entirely() {
        let merged = merge_all(vec![cube([0, 0, 0], "stone"), cube([1, 0, 0], "stone")]).unwrap();
        let deduped = MeshDeduplicator::default().dedup(&merged).unwrap();
        // The two faces at x = 1 coincide; both go.
        assert_eq!(deduped.face_count(), 10);
        assert_eq!(deduped.vertex_count(), 12);
    }

    #[test]
    fn test_strict_keeps_coincident_faces_of_different_materials() {
        let merged = merge_all(vec![cube([0, 0, 0], "stone"), cube([1, 0, 0], "dirt")]).unwrap();
        let loose = MeshDeduplicator::new(false).dedup(&merged).unwrap();
        let strict = MeshDeduplicator::new(true).dedup(&merged).unwrap();
        assert_eq!(loose.face_count(), 10);
        assert_eq!(strict.face_count(), 12);
    }

    #[test]
    fn test_dedup_drops_unreferenced_vertices() {
        let mut mesh = cube([0, 0, 0], "stone");
        mesh.add_vertex([50.0, 50.0, 50.0]);
        mesh.add_uv([0.5, 0.5]);
        let deduped = MeshDeduplicator::default().dedup(&mesh).unwrap();
        assert_eq!(deduped.vertex_count(), 8);
        assert_eq!(deduped.uvs.len(), 4);
    }

    #[test]
    fn test_welder_reuses_corners() {
        let mut welder = MeshWelder::new(vec![Material::new("stone", "block/stone")]);
        welder.push_quad(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            UNIT_UVS,
            0,
            FaceDirection::Down,
        );
        welder.push_quad(
            [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 0.0, 1.0], [1.00001, 0.0, 1.0]],
            UNIT_UVS,
            0,
            FaceDirection::Down,
        );
        let mesh = welder.finish();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.uvs.len(), 4);
        assert_eq!(mesh.faces[1].vertices[0], mesh.faces[0].vertices[1]);
        assert_eq!(mesh.faces[1].vertices[3], mesh.faces[0].vertices[2]);
    }

    proptest! {
        #[test]
        fn prop_dedup_is_idempotent(
            cells in prop::collection::vec((0i32..4, 0i32..3, 0i32..4, 0usize..2), 1..24),
            strict in any::<bool>(),
        ) {
            let materials = ["stone", "dirt"];
            let mesh = merge_all(
                cells.iter().map(|&(x, y, z, m)| cube([x, y, z], materials[m]))
            ).unwrap();
            let dedup = MeshDeduplicator::new(strict);
            let once = dedup.dedup(&mesh).unwrap();
            let twice = dedup.dedup(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
