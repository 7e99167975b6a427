//! Export results.
//!
//! [`ExportOutput`] is what a meshing run hands to its caller: one merged
//! mesh, or one mesh per scheduling group, plus every material they use.
//! Serializing the meshes to a file format is left to the caller.

use crate::mesher::geometry::{Material, MeshBuffer};
use crate::types::ColumnPos;
use serde::{Deserialize, Serialize};

/// One independently usable mesh of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshUnit {
    /// Origin column of the group this unit covers; `None` for a merged export.
    pub origin: Option<ColumnPos>,
    pub mesh: MeshBuffer,
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    pub columns: usize,
    pub groups: usize,
    pub tasks: usize,
    /// Tasks meshed at a reduced level of detail.
    pub lod_tasks: usize,
    /// Columns whose load hook failed; they read as air.
    pub load_failures: usize,
    pub faces: usize,
    pub vertices: usize,
    pub materials: usize,
}

/// The result of a meshing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportOutput {
    /// Meshes, sorted by group origin when partitioned.
    pub units: Vec<MeshUnit>,
    /// Every material used by any unit, sorted by name.
    pub materials: Vec<Material>,
    pub stats: ExportStats,
}

impl ExportOutput {
    /// Total number of quads across all units.
    pub fn face_count(&self) -> usize {
        self.units.iter().map(|u| u.mesh.face_count()).sum()
    }

    /// Total number of vertices across all units.
    pub fn vertex_count(&self) -> usize {
        self.units.iter().map(|u| u.mesh.vertex_count()).sum()
    }

    /// Total quad area across all units.
    pub fn surface_area(&self) -> f32 {
        self.units.iter().map(|u| u.mesh.surface_area()).sum()
    }

    /// Returns `true` if no unit has any faces.
    pub fn is_empty(&self) -> bool {
        self.units.iter().all(|u| u.mesh.is_empty())
    }

    /// Find the unit of a group.
    pub fn unit_at(&self, origin: ColumnPos) -> Option<&MeshUnit> {
        self.units.iter().find(|u| u.origin == Some(origin))
    }
}
