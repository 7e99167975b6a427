//! Face culling for hidden faces between adjacent blocks.
//!
//! A face is hidden when the neighbor on its side is not air. The neighbor
//! states come precomputed from the world source as a six-slot mask, indexed
//! by [`Direction::mask_slot`]. Faces tagged `DoNotCull` or `Unknown` are
//! never culled.

use crate::error::Result;
use crate::mesher::geometry::MeshBuffer;
use crate::types::{Direction, FaceDirection};

/// Face culler for a single block position.
#[derive(Debug, Clone, Copy)]
pub struct FaceCuller {
    neighbor_air: [bool; 6],
}

impl FaceCuller {
    pub fn new(neighbor_air: [bool; 6]) -> Self {
        Self { neighbor_air }
    }

    /// Check if the neighbor in a direction is air.
    pub fn is_open(&self, direction: Direction) -> bool {
        self.neighbor_air[direction.mask_slot()]
    }

    /// Check if a face with the given tag should be hidden.
    pub fn should_cull(&self, face: FaceDirection) -> bool {
        match face.direction() {
            Some(direction) => !self.is_open(direction),
            None => false,
        }
    }

    /// Drop the hidden faces of a block mesh.
    ///
    /// The mesh is validated first; vertices of culled faces are left in
    /// place for the deduplicator to compact.
    pub fn cull(&self, mut mesh: MeshBuffer) -> Result<MeshBuffer> {
        mesh.validate()?;
        mesh.faces.retain(|face| !self.should_cull(face.direction));
        Ok(mesh)
    }
}

/// Drop the faces of `mesh` whose neighbor is not air.
pub fn cull_faces(mesh: MeshBuffer, neighbor_air: [bool; 6]) -> Result<MeshBuffer> {
    FaceCuller::new(neighbor_air).cull(mesh)
}
