//! Full-resolution meshing of one (column, section) unit.

use crate::error::Result;
use crate::mesher::face_culler::cull_faces;
use crate::mesher::geometry::MeshBuffer;
use crate::mesher::merge::{merge_into, merge_owned};
use crate::mesher::MesherConfig;
use crate::registry::Registries;
use crate::resolver::ModelResolver;
use crate::types::{BlockBounds, BlockInfo, BlockQuery, ColumnPos, WorldSource, SKY_ENCLOSED};

/// Normalized id of the blocks kept by the light-only filter.
pub const LIGHT_BLOCK_ID: &str = "light";

/// Builds the full-resolution mesh of a section.
pub struct ChunkMeshBuilder<'a> {
    world: &'a dyn WorldSource,
    resolver: &'a dyn ModelResolver,
    registries: &'a Registries,
    config: &'a MesherConfig,
}

impl<'a> ChunkMeshBuilder<'a> {
    pub fn new(
        world: &'a dyn WorldSource,
        resolver: &'a dyn ModelResolver,
        registries: &'a Registries,
        config: &'a MesherConfig,
    ) -> Self {
        Self {
            world,
            resolver,
            registries,
            config,
        }
    }

    /// Mesh every block of a section inside `bounds`, in world coordinates.
    ///
    /// The column's entity geometry is appended by the first section of the
    /// column to be built.
    pub fn build(&self, column: ColumnPos, section_y: i32, bounds: &BlockBounds) -> Result<MeshBuffer> {
        let mut mesh = MeshBuffer::new();

        if let Some(area) = bounds.clip_to_section(column, section_y) {
            for y in area.min[1]..=area.max[1] {
                for z in area.min[2]..=area.max[2] {
                    for x in area.min[0]..=area.max[0] {
                        if let Some(block) = self.block_mesh(x, y, z)? {
                            merge_owned(&mut mesh, block)?;
                        }
                    }
                }
            }
        }

        if self.registries.processed_columns.claim(column) {
            if let Some(entities) = self.world.column_entities(column) {
                merge_owned(&mut mesh, entities)?;
            }
        }

        log::debug!(
            "meshed column ({}, {}) section {}: {} faces",
            column.x,
            column.z,
            section_y,
            mesh.face_count()
        );
        Ok(mesh)
    }

    /// Culled world-space geometry of one block, or `None` if it adds nothing.
    fn block_mesh(&self, x: i32, y: i32, z: i32) -> Result<Option<MeshBuffer>> {
        let query = self.world.query_block(x, y, z);
        let info = match self.world.block_info(query.block_id) {
            Some(info) if !info.is_air() => info,
            _ => return Ok(None),
        };
        if self.config.light_only && info.normalized_id() != LIGHT_BLOCK_ID {
            return Ok(None);
        }
        if self.config.cave_culling && self.world.sky_exposure(x, y, z) == SKY_ENCLOSED {
            return Ok(None);
        }

        let geometry = self.block_geometry(info, &query)?;
        let mut culled = cull_faces(geometry, query.neighbor_air)?;
        if culled.is_empty() {
            return Ok(None);
        }
        culled.translate([x as f32, y as f32, z as f32]);
        Ok(Some(culled))
    }

    /// Local geometry of a block before culling.
    fn block_geometry(&self, info: &BlockInfo, query: &BlockQuery) -> Result<MeshBuffer> {
        let model = self.registries.geometry.get_or_resolve(info, self.resolver);
        if !info.is_fluid() {
            return Ok((*model).clone());
        }

        let mut fluid = self.resolver.synthesize_fluid_surface(&query.fluid_levels);
        self.resolver.assign_fluid_materials(&mut fluid, &info.name);
        if model.is_empty() {
            return Ok(fluid);
        }
        // Blocks submerged in fluid keep every face of their own model.
        let mut combined = (*model).clone();
        combined.force_do_not_cull();
        merge_into(&mut combined, &fluid)?;
        Ok(combined)
    }
}
