//! Mesh generation from voxel worlds.
//!
//! Full-resolution sections are built by [`chunk::ChunkMeshBuilder`], coarse
//! ones by [`lod::LodApproximator`]. Both produce [`MeshBuffer`]s that are
//! combined with [`merge`] and cleaned up by [`dedup::MeshDeduplicator`].

pub mod chunk;
pub mod dedup;
pub mod face_culler;
pub mod geometry;
pub mod greedy;
pub mod liquid;
pub mod lod;
pub mod merge;
pub mod tint;

pub use chunk::ChunkMeshBuilder;
pub use dedup::MeshDeduplicator;
pub use geometry::{Material, MeshBuffer, Quad};
pub use lod::LodApproximator;
pub use tint::{TintColors, TintProvider};

use crate::error::{MesherError, Result};
use crate::types::BlockBounds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Level-of-detail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// When false every column is meshed at full resolution.
    pub enabled: bool,
    /// Column distances from `center` at which levels 1, 2, 4 and 8 begin.
    pub thresholds: [u32; 4],
    /// Column the distances are measured from.
    pub center: [i32; 2],
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            thresholds: [4, 8, 16, 32],
            center: [0, 0],
        }
    }
}

/// Main mesher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MesherConfig {
    /// Inclusive block box to mesh; the whole world when absent.
    pub bounds: Option<BlockBounds>,
    /// Skip blocks that cannot see the sky through any air neighbor.
    pub cave_culling: bool,
    /// Keep level-of-detail faces on the edge of the bounds.
    pub keep_boundary: bool,
    /// Mesh only light blocks.
    pub light_only: bool,
    pub lod: LodConfig,
    /// Widen the bounds on x and z to whole columns.
    pub chunk_aligned: bool,
    /// Edge length, in columns, of one scheduling group.
    pub partition_size: u32,
    /// Only treat coincident faces as duplicates when their materials match.
    pub strict_dedup: bool,
    /// Merge coplanar quads after deduplication.
    pub greedy_mesh: bool,
    /// Emit one mesh per group instead of a single merged mesh.
    pub partitioned: bool,
    /// Worker count; hardware concurrency when absent.
    pub threads: Option<usize>,
    /// Biome used to tint level-of-detail colors.
    pub biome: Option<String>,
}

impl Default for MesherConfig {
    fn default() -> Self {
        Self {
            bounds: None,
            cave_culling: false,
            keep_boundary: true,
            light_only: false,
            lod: LodConfig::default(),
            chunk_aligned: false,
            partition_size: 4,
            strict_dedup: false,
            greedy_mesh: false,
            partitioned: false,
            threads: None,
            biome: None,
        }
    }
}

impl MesherConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Set the bounds to mesh.
    pub fn with_bounds(mut self, bounds: BlockBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Check the values that cannot produce a valid run.
    pub fn validate(&self) -> Result<()> {
        if self.partition_size == 0 {
            return Err(MesherError::InvalidConfig(
                "partition_size must be at least 1".to_string(),
            ));
        }
        if let Some(bounds) = &self.bounds {
            if !bounds.is_valid() {
                return Err(MesherError::InvalidConfig(format!(
                    "bounds min {:?} exceeds max {:?}",
                    bounds.min, bounds.max
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(MesherError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.lod.enabled && self.lod.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MesherError::InvalidConfig(format!(
                "lod thresholds must be strictly increasing, got {:?}",
                self.lod.thresholds
            )));
        }
        Ok(())
    }

    /// The bounds to mesh, widened to columns when `chunk_aligned` is set.
    pub fn effective_bounds(&self, world_bounds: Option<BlockBounds>) -> Option<BlockBounds> {
        let bounds = self.bounds.or(world_bounds)?;
        Some(if self.chunk_aligned {
            bounds.aligned_to_columns()
        } else {
            bounds
        })
    }

    /// Number of mesh workers to run.
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
