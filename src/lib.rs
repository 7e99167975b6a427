//! # World Mesher
//!
//! A Rust library for turning voxel worlds into multi-resolution quad meshes.
//!
//! ## Overview
//!
//! A world is read through the [`WorldSource`] trait and block geometry comes
//! from a [`ModelResolver`]. Columns near the configured center are meshed
//! block by block with face culling and fluid surfaces; farther columns are
//! approximated with coarse super-voxel boxes. Results are merged across a
//! worker pool, deduplicated and optionally greedy-meshed.
//!
//! ## Quick Start
//!
//! ```ignore
//! use world_mesher::{mesh_world, CubeModelResolver, MemoryWorld, MesherConfig};
//!
//! let world = MemoryWorld::from_path("world.json")?;
//! let config = MesherConfig::from_path("mesher.json")?;
//!
//! let output = mesh_world(&world, &CubeModelResolver::new(), config)?;
//! println!("{} faces in {} units", output.face_count(), output.units.len());
//! ```
//!
//! ## Custom Worlds
//!
//! Any storage that implements [`WorldSource`] can be meshed through
//! [`WorldMesher`] directly; the configuration must then carry bounds:
//!
//! ```ignore
//! let config = MesherConfig::default().with_bounds(BlockBounds::new([0, 0, 0], [255, 127, 255]));
//! let output = WorldMesher::new(&my_world, &my_resolver, config)?.export()?;
//! ```

pub mod error;
pub mod mesh_output;
pub mod mesher;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod types;
pub mod world;

// Re-export main types for convenience
pub use error::{MesherError, Result};
pub use mesh_output::{ExportOutput, ExportStats, MeshUnit};
pub use mesher::{
    ChunkMeshBuilder, LodApproximator, LodConfig, Material, MeshBuffer, MeshDeduplicator,
    MesherConfig, Quad, TintColors, TintProvider,
};
pub use registry::Registries;
pub use resolver::{CubeModelResolver, ModelResolver};
pub use scheduler::{partition, Group, LodMap, Task, WorldMesher};
pub use types::{
    BlockBounds, BlockInfo, BlockPosition, BlockQuery, ColumnPos, Direction, FaceDirection,
    WorldSource,
};
pub use world::{MemoryWorld, WorldFile};

/// Mesh a world with a configuration, defaulting the bounds to the whole
/// world when the configuration has none.
pub fn mesh_world(
    world: &MemoryWorld,
    resolver: &dyn ModelResolver,
    config: MesherConfig,
) -> Result<ExportOutput> {
    let config = match config.effective_bounds(world.bounds()) {
        Some(bounds) => config.with_bounds(bounds),
        None => {
            log::info!("world is empty, nothing to mesh");
            return Ok(ExportOutput::default());
        }
    };
    WorldMesher::new(world, resolver, config)?.export()
}
