//! Mesh geometry types.

use crate::error::{MesherError, Result};
use crate::types::{Direction, FaceDirection};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A surface material referenced by quads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique material name; merges unify materials by this name.
    pub name: String,
    /// Texture path (e.g., "block/stone").
    pub texture_path: String,
    /// Animated materials are never greedy-merged.
    #[serde(default)]
    pub animated: bool,
    /// Flat linear RGBA color, for untextured materials.
    #[serde(default)]
    pub color: Option<[f32; 4]>,
}

impl Material {
    pub fn new(name: impl Into<String>, texture_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture_path: texture_path.into(),
            animated: false,
            color: None,
        }
    }

    pub fn animated(mut self) -> Self {
        self.animated = true;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = Some(color);
        self
    }
}

/// A four-sided face referencing vertices, UVs and a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    /// Vertex indices in winding order.
    pub vertices: [u32; 4],
    /// UV indices, one per vertex.
    pub uvs: [u32; 4],
    /// Index into the mesh's material list.
    pub material: u32,
    /// Culling tag.
    pub direction: FaceDirection,
}

/// An indexed quad mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffer {
    pub vertices: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub faces: Vec<Quad>,
    pub materials: Vec<Material>,
}

impl MeshBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, position: [f32; 3]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(position);
        index
    }

    /// Add a texture coordinate and return its index.
    pub fn add_uv(&mut self, uv: [f32; 2]) -> u32 {
        let index = self.uvs.len() as u32;
        self.uvs.push(uv);
        index
    }

    /// Add a material, reusing an existing one with the same name.
    pub fn add_material(&mut self, material: Material) -> u32 {
        if let Some(index) = self.material_index(&material.name) {
            return index;
        }
        let index = self.materials.len() as u32;
        self.materials.push(material);
        index
    }

    /// Index of the material with the given name.
    pub fn material_index(&self, name: &str) -> Option<u32> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| i as u32)
    }

    /// Add a quad by index.
    pub fn add_quad(
        &mut self,
        vertices: [u32; 4],
        uvs: [u32; 4],
        material: u32,
        direction: FaceDirection,
    ) {
        self.faces.push(Quad {
            vertices,
            uvs,
            material,
            direction,
        });
    }

    /// Add a quad from raw corner data, appending fresh vertices and UVs.
    pub fn push_quad(
        &mut self,
        positions: [[f32; 3]; 4],
        uvs: [[f32; 2]; 4],
        material: u32,
        direction: FaceDirection,
    ) {
        let v = positions.map(|p| self.add_vertex(p));
        let t = uvs.map(|uv| self.add_uv(uv));
        self.add_quad(v, t, material, direction);
    }

    /// Get the number of quads.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Check if the mesh has no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Translate all vertices by an offset.
    pub fn translate(&mut self, offset: [f32; 3]) {
        let offset = Vec3::from(offset);
        for vertex in &mut self.vertices {
            *vertex = (Vec3::from(*vertex) + offset).to_array();
        }
    }

    /// Retag every face as [`FaceDirection::DoNotCull`].
    pub fn force_do_not_cull(&mut self) {
        for face in &mut self.faces {
            face.direction = FaceDirection::DoNotCull;
        }
    }

    /// Check that every quad index is inside its buffer.
    pub fn validate(&self) -> Result<()> {
        for face in &self.faces {
            self.validate_face(face)?;
        }
        Ok(())
    }

    /// Check a single quad against this buffer.
    pub fn validate_face(&self, face: &Quad) -> Result<()> {
        check_index("vertex", &face.vertices, self.vertices.len())?;
        check_index("uv", &face.uvs, self.uvs.len())?;
        check_index("material", &[face.material], self.materials.len())
    }

    /// World-space corners of a quad.
    ///
    /// The quad must have been validated against this buffer.
    pub fn face_positions(&self, face: &Quad) -> [[f32; 3]; 4] {
        face.vertices.map(|i| self.vertices[i as usize])
    }

    /// Area of a quad, as the sum of its two triangles.
    pub fn face_area(&self, face: &Quad) -> f32 {
        let [a, b, c, d] = self.face_positions(face).map(Vec3::from);
        let first = (b - a).cross(c - a).length() * 0.5;
        let second = (c - a).cross(d - a).length() * 0.5;
        first + second
    }

    /// Total area of all quads.
    pub fn surface_area(&self) -> f32 {
        self.faces.iter().map(|f| self.face_area(f)).sum()
    }
}

fn check_index(buffer: &'static str, indices: &[u32], len: usize) -> Result<()> {
    match indices.iter().find(|&&i| i as usize >= len) {
        Some(&index) => Err(MesherError::IndexOutOfRange {
            buffer,
            index: index as usize,
            len,
        }),
        None => Ok(()),
    }
}

/// Standard UVs for a full unit face, in winding order.
pub const UNIT_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Corner positions of one face of the box `from..to`, wound counter-clockwise
/// when seen from outside the box.
pub fn box_face_positions(direction: Direction, from: Vec3, to: Vec3) -> [[f32; 3]; 4] {
    match direction {
        Direction::Up => [
            [from.x, to.y, from.z],
            [from.x, to.y, to.z],
            [to.x, to.y, to.z],
            [to.x, to.y, from.z],
        ],
        Direction::Down => [
            [from.x, from.y, from.z],
            [to.x, from.y, from.z],
            [to.x, from.y, to.z],
            [from.x, from.y, to.z],
        ],
        Direction::North => [
            [to.x, from.y, from.z],
            [from.x, from.y, from.z],
            [from.x, to.y, from.z],
            [to.x, to.y, from.z],
        ],
        Direction::South => [
            [from.x, from.y, to.z],
            [to.x, from.y, to.z],
            [to.x, to.y, to.z],
            [from.x, to.y, to.z],
        ],
        Direction::West => [
            [from.x, from.y, from.z],
            [from.x, from.y, to.z],
            [from.x, to.y, to.z],
            [from.x, to.y, from.z],
        ],
        Direction::East => [
            [to.x, from.y, to.z],
            [to.x, from.y, from.z],
            [to.x, to.y, from.z],
            [to.x, to.y, to.z],
        ],
    }
}

/// Build an axis-aligned box mesh with one quad per listed face.
///
/// `material_for` picks the material index of each face.
pub fn box_mesh(
    from: Vec3,
    to: Vec3,
    faces: impl IntoIterator<Item = Direction>,
    materials: Vec<Material>,
    material_for: impl Fn(Direction) -> u32,
) -> MeshBuffer {
    let mut mesh = MeshBuffer {
        materials,
        ..MeshBuffer::default()
    };
    for direction in faces {
        mesh.push_quad(
            box_face_positions(direction, from, to),
            UNIT_UVS,
            material_for(direction),
            direction.into(),
        );
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> MeshBuffer {
        box_mesh(
            Vec3::ZERO,
            Vec3::ONE,
            Direction::ALL,
            vec![Material::new("stone", "block/stone")],
            |_| 0,
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mut mesh = MeshBuffer::new();
        assert!(mesh.is_empty());

        let material = mesh.add_material(Material::new("stone", "block/stone"));
        mesh.push_quad(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            UNIT_UVS,
            material,
            FaceDirection::Down,
        );

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_add_material_reuses_name() {
        let mut mesh = MeshBuffer::new();
        let a = mesh.add_material(Material::new("stone", "block/stone"));
        let b = mesh.add_material(Material::new("dirt", "block/dirt"));
        let c = mesh.add_material(Material::new("stone", "block/other"));
        assert_eq!((a, b, c), (0, 1, 0));
        assert_eq!(mesh.materials.len(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut mesh = unit_cube();
        mesh.faces[3].vertices[2] = 99;
        match mesh.validate() {
            Err(MesherError::IndexOutOfRange { buffer, index, len }) => {
                assert_eq!(buffer, "vertex");
                assert_eq!(index, 99);
                assert_eq!(len, 24);
            }
            other => panic!("expected index error, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_cube_area_and_normals() {
        let mesh = unit_cube();
        assert_eq!(mesh.face_count(), 6);
        assert!((mesh.surface_area() - 6.0).abs() < 1e-5);

        // Every face winds counter-clockwise around its outward normal.
        for face in &mesh.faces {
            let [a, b, c, _] = mesh.face_positions(face).map(Vec3::from);
            let normal = (b - a).cross(c - a).normalize();
            let expected = Vec3::from(face.direction.direction().unwrap().normal());
            assert!((normal - expected).length() < 1e-5, "{:?}", face.direction);
        }
    }

    #[test]
    fn test_translate() {
        let mut mesh = unit_cube();
        mesh.translate([2.0, -1.0, 3.0]);
        let min = mesh
            .vertices
            .iter()
            .fold([f32::MAX; 3], |acc, v| [acc[0].min(v[0]), acc[1].min(v[1]), acc[2].min(v[2])]);
        assert_eq!(min, [2.0, -1.0, 3.0]);
    }

    #[test]
    fn test_force_do_not_cull() {
        let mut mesh = unit_cube();
        mesh.force_do_not_cull();
        assert!(mesh.faces.iter().all(|f| f.direction == FaceDirection::DoNotCull));
    }
}
