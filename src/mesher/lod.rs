//! Level-of-detail approximation.
//!
//! A section meshed at level `L` is split into `L x L x L` super-voxels.
//! Each super-voxel is classified from its blocks and, unless it is empty,
//! replaced by a single flat-colored box covering its floor up to its draft
//! (the air layers on top are left out). Box faces against non-empty
//! neighbors are dropped.

use crate::error::Result;
use crate::mesher::geometry::{box_mesh, Material, MeshBuffer};
use crate::mesher::merge::merge_owned;
use crate::mesher::tint::TintProvider;
use crate::resolver::ModelResolver;
use crate::scheduler::LodMap;
use crate::types::{
    BlockBounds, BlockPosition, ColumnPos, Direction, WorldSource, COLUMN_SIZE, SECTION_HEIGHT,
};
use glam::Vec3;

/// What a super-voxel mostly holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoxelKind {
    Air,
    Fluid,
    Solid,
}

/// Classification of one super-voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelClassification {
    pub kind: VoxelKind,
    /// Palette id of the block that colors the box.
    pub representative_id: u32,
    /// Empty layers between the top of the super-voxel and its surface.
    pub level: u32,
}

/// Counts of one horizontal layer of a super-voxel.
#[derive(Default)]
struct LayerCounts {
    air: u32,
    fluid: u32,
    solid: u32,
    first_fluid: Option<u32>,
    first_solid: Option<u32>,
}

/// Builds level-of-detail meshes.
pub struct LodApproximator<'a> {
    world: &'a dyn WorldSource,
    resolver: &'a dyn ModelResolver,
    bounds: BlockBounds,
    keep_boundary: bool,
    tint: TintProvider,
    lod_map: Option<&'a LodMap>,
}

impl<'a> LodApproximator<'a> {
    pub fn new(
        world: &'a dyn WorldSource,
        resolver: &'a dyn ModelResolver,
        bounds: BlockBounds,
        keep_boundary: bool,
    ) -> Self {
        Self {
            world,
            resolver,
            bounds,
            keep_boundary,
            tint: TintProvider::new(),
            lod_map: None,
        }
    }

    /// Tint level-of-detail colors for a biome.
    pub fn with_tint(mut self, tint: TintProvider) -> Self {
        self.tint = tint;
        self
    }

    /// Levels of the surrounding tasks, for exact occlusion across level
    /// changes. Without a map every neighbor is assumed to share the level.
    pub fn with_lod_map(mut self, lod_map: &'a LodMap) -> Self {
        self.lod_map = Some(lod_map);
        self
    }

    fn classify_cell(&self, x: i32, y: i32, z: i32) -> (VoxelKind, u32) {
        let id = self.world.query_block(x, y, z).block_id;
        match self.world.block_info(id) {
            Some(info) if info.is_air() => (VoxelKind::Air, id),
            Some(info) if info.is_fluid() => (VoxelKind::Fluid, id),
            Some(_) => (VoxelKind::Solid, id),
            None => (VoxelKind::Air, id),
        }
    }

    fn layer_counts(&self, corner: BlockPosition, size: i32, y: i32) -> LayerCounts {
        let mut counts = LayerCounts::default();
        for z in corner.z..corner.z + size {
            for x in corner.x..corner.x + size {
                match self.classify_cell(x, y, z) {
                    (VoxelKind::Air, _) => counts.air += 1,
                    (VoxelKind::Fluid, id) => {
                        counts.fluid += 1;
                        counts.first_fluid.get_or_insert(id);
                    }
                    (VoxelKind::Solid, id) => {
                        counts.solid += 1;
                        counts.first_solid.get_or_insert(id);
                    }
                }
            }
        }
        counts
    }

    /// Classify the super-voxel of edge `size` whose minimum corner is `corner`.
    pub fn classify(&self, corner: BlockPosition, size: u32) -> VoxelClassification {
        let edge = size as i32;
        let mut air_layers = 0;
        let mut fluid_layers = 0;
        let mut surface_found = false;
        let mut fluid_id = None;
        let mut solid_id = None;

        for y in (corner.y..corner.y + edge).rev() {
            let counts = self.layer_counts(corner, edge, y);
            if counts.air == size * size {
                if !surface_found {
                    air_layers += 1;
                }
                continue;
            }
            surface_found = true;

            if counts.fluid >= counts.solid {
                fluid_id = fluid_id.or(counts.first_fluid);
                if solid_id.is_some() {
                    return VoxelClassification {
                        kind: VoxelKind::Fluid,
                        representative_id: fluid_id.or(solid_id).unwrap_or_default(),
                        level: air_layers,
                    };
                }
                fluid_layers += 1;
            } else {
                solid_id = solid_id.or(counts.first_solid);
            }
        }

        match (fluid_id, solid_id) {
            (Some(id), _) => VoxelClassification {
                kind: VoxelKind::Fluid,
                representative_id: id,
                level: air_layers,
            },
            (None, Some(id)) => VoxelClassification {
                kind: VoxelKind::Solid,
                representative_id: id,
                level: air_layers + fluid_layers,
            },
            (None, None) => VoxelClassification {
                kind: VoxelKind::Air,
                representative_id: 0,
                level: air_layers,
            },
        }
    }

    /// Like [`classify`](Self::classify), but a super-voxel with a non-empty
    /// super-voxel on top reaches all the way up.
    pub fn classify_with_upper_check(&self, corner: BlockPosition, size: u32) -> VoxelClassification {
        let mut classification = self.classify(corner, size);
        if classification.kind != VoxelKind::Air {
            let above = corner.offset((0, size as i32, 0));
            if self.classify(above, size).kind != VoxelKind::Air {
                classification.level = 0;
            }
        }
        classification
    }

    /// Whether any block of the super-voxel at `corner` lies inside the bounds.
    fn in_bounds(&self, corner: BlockPosition, size: i32) -> bool {
        (0..3).all(|axis| {
            let lo = [corner.x, corner.y, corner.z][axis];
            lo <= self.bounds.max[axis] && lo + size - 1 >= self.bounds.min[axis]
        })
    }

    fn level_at(&self, pos: BlockPosition, size: u32) -> u32 {
        match self.lod_map {
            Some(map) => map.level_at(pos.column(), pos.section()),
            None => size,
        }
    }

    /// Whether the face of a box in `direction` is hidden by what is next to it.
    fn face_hidden(
        &self,
        corner: BlockPosition,
        size: u32,
        height: u32,
        direction: Direction,
    ) -> bool {
        let edge = size as i32;
        let (dx, dy, dz) = direction.offset();
        let neighbor = corner.offset((dx * edge, dy * edge, dz * edge));

        if !self.in_bounds(neighbor, edge) {
            return !self.keep_boundary;
        }

        if self.level_at(neighbor, size) != size {
            return self.face_covered(corner, size, height, direction);
        }
        self.classify(neighbor, size).kind != VoxelKind::Air
    }

    /// Exact test: every block just across the face is non-air.
    fn face_covered(&self, corner: BlockPosition, size: u32, height: u32, direction: Direction) -> bool {
        let edge = size as i32;
        let height = height as i32;
        let (xs, ys, zs) = match direction {
            Direction::Up => (corner.x..corner.x + edge, corner.y + height..corner.y + height + 1, corner.z..corner.z + edge),
            Direction::Down => (corner.x..corner.x + edge, corner.y - 1..corner.y, corner.z..corner.z + edge),
            Direction::North => (corner.x..corner.x + edge, corner.y..corner.y + height, corner.z - 1..corner.z),
            Direction::South => (corner.x..corner.x + edge, corner.y..corner.y + height, corner.z + edge..corner.z + edge + 1),
            Direction::West => (corner.x - 1..corner.x, corner.y..corner.y + height, corner.z..corner.z + edge),
            Direction::East => (corner.x + edge..corner.x + edge + 1, corner.y..corner.y + height, corner.z..corner.z + edge),
        };
        for x in xs {
            for y in ys.clone() {
                for z in zs.clone() {
                    if self.world.is_air_at(x, y, z) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Materials of a box: one for fluids, top and side for solids.
    fn box_materials(&self, classification: &VoxelClassification) -> Vec<Material> {
        let (namespace, name, id) = match self.world.block_info(classification.representative_id) {
            Some(info) => (
                info.namespace().to_string(),
                info.block_id().to_string(),
                info.normalized_id(),
            ),
            None => ("minecraft".to_string(), "unknown".to_string(), "unknown".to_string()),
        };
        let material = |suffix: &str, face: Direction| {
            let average = self.resolver.average_color(&namespace, &name, face);
            let color = self.tint.lod_color(&id, face, average);
            Material::new(
                format!("lod_{}{}", id, suffix),
                format!("{}:block/{}", namespace, id),
            )
            .with_color(color)
        };
        match classification.kind {
            VoxelKind::Fluid => vec![material("", Direction::Up)],
            _ => vec![material("_top", Direction::Up), material("_side", Direction::North)],
        }
    }

    /// The box of one super-voxel with its hidden faces removed, in world
    /// coordinates. `None` when the super-voxel is empty or fully hidden.
    pub fn super_voxel_mesh(&self, corner: BlockPosition, size: u32) -> Option<MeshBuffer> {
        let classification = self.classify_with_upper_check(corner, size);
        if classification.kind == VoxelKind::Air || classification.level >= size {
            return None;
        }
        let height = size - classification.level;

        let visible: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|&direction| {
                // Air layers of the super-voxel itself sit on top of the box.
                if direction == Direction::Up && classification.level > 0 {
                    return true;
                }
                !self.face_hidden(corner, size, height, direction)
            })
            .collect();
        if visible.is_empty() {
            return None;
        }

        // Super-voxels straddling the bounds are cut at the bounds, like the
        // full-resolution path.
        let corner_vec = Vec3::new(corner.x as f32, corner.y as f32, corner.z as f32);
        let bounds_min = Vec3::from(self.bounds.min.map(|v| v as f32));
        let bounds_max = Vec3::from(self.bounds.max.map(|v| (v + 1) as f32));
        let from = corner_vec.max(bounds_min);
        let to = (corner_vec + Vec3::new(size as f32, height as f32, size as f32)).min(bounds_max);
        if (to - from).cmple(Vec3::ZERO).any() {
            return None;
        }
        let two_materials = classification.kind != VoxelKind::Fluid;
        Some(box_mesh(
            from,
            to,
            visible,
            self.box_materials(&classification),
            |direction| (two_materials && direction != Direction::Up) as u32,
        ))
    }

    /// Mesh one section at super-voxel edge `size`.
    pub fn build(&self, column: ColumnPos, section_y: i32, size: u32) -> Result<MeshBuffer> {
        let edge = size.max(1) as i32;
        let mut mesh = MeshBuffer::new();
        let step = edge as usize;
        let (base_x, base_y, base_z) = (column.min_block_x(), section_y * SECTION_HEIGHT, column.min_block_z());

        for y in (base_y..base_y + SECTION_HEIGHT).step_by(step) {
            for z in (base_z..base_z + COLUMN_SIZE).step_by(step) {
                for x in (base_x..base_x + COLUMN_SIZE).step_by(step) {
                    let corner = BlockPosition::new(x, y, z);
                    if !self.in_bounds(corner, edge) {
                        continue;
                    }
                    if let Some(boxed) = self.super_voxel_mesh(corner, edge as u32) {
                        merge_owned(&mut mesh, boxed)?;
                    }
                }
            }
        }

        log::debug!(
            "lod {} column ({}, {}) section {}: {} faces",
            size,
            column.x,
            column.z,
            section_y,
            mesh.face_count()
        );
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::CubeModelResolver;
    use crate::types::{BlockInfo, FaceDirection};
    use crate::world::MemoryWorld;

    fn stone() -> BlockInfo {
        BlockInfo::new("minecraft:stone")
    }

    fn water() -> BlockInfo {
        BlockInfo::new("minecraft:water").with_fluid_level(0)
    }

    fn layer(world: &mut MemoryWorld, y: i32, info: BlockInfo) {
        world.fill(BlockBounds::new([0, y, 0], [3, y, 3]), info);
    }

    fn wide() -> BlockBounds {
        BlockBounds::new([-64, -64, -64], [63, 63, 63])
    }

    #[test]
    fn test_air_over_floor_is_solid() {
        let mut world = MemoryWorld::new();
        layer(&mut world, 0, stone());
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);

        let c = lod.classify(BlockPosition::new(0, 0, 0), 4);
        assert_eq!(c.kind, VoxelKind::Solid);
        assert_eq!(c.level, 3);
        assert_eq!(world.block_info(c.representative_id), Some(&stone()));
    }

    #[test]
    fn test_fluid_over_floor_is_fluid() {
        let mut world = MemoryWorld::new();
        layer(&mut world, 0, stone());
        layer(&mut world, 1, water());
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);

        let c = lod.classify(BlockPosition::new(0, 0, 0), 4);
        assert_eq!(c.kind, VoxelKind::Fluid);
        assert_eq!(c.level, 2);
    }

    #[test]
    fn test_fluid_under_solid_returns_early() {
        let mut world = MemoryWorld::new();
        layer(&mut world, 3, stone());
        layer(&mut world, 2, water());
        layer(&mut world, 1, stone());
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);

        let c = lod.classify(BlockPosition::new(0, 0, 0), 4);
        assert_eq!(c.kind, VoxelKind::Fluid);
        assert_eq!(c.level, 0);
    }

    #[test]
    fn test_mixed_layer_majority() {
        let mut world = MemoryWorld::new();
        // Ten solid cells and six fluid cells: a solid layer.
        layer(&mut world, 0, water());
        world.fill(BlockBounds::new([0, 0, 0], [1, 0, 3]), stone());
        world.fill(BlockBounds::new([2, 0, 0], [2, 0, 1]), stone());
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);

        let c = lod.classify(BlockPosition::new(0, 0, 0), 4);
        assert_eq!(c.kind, VoxelKind::Solid);
    }

    #[test]
    fn test_empty_super_voxel() {
        let world = MemoryWorld::new();
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);
        let c = lod.classify(BlockPosition::new(0, 0, 0), 2);
        assert_eq!(c.kind, VoxelKind::Air);
        assert_eq!(c.level, 2);
        assert!(lod.super_voxel_mesh(BlockPosition::new(0, 0, 0), 2).is_none());
    }

    #[test]
    fn test_upper_check_resets_level() {
        let mut world = MemoryWorld::new();
        layer(&mut world, 0, stone());
        layer(&mut world, 5, stone());
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);

        let corner = BlockPosition::new(0, 0, 0);
        assert_eq!(lod.classify(corner, 4).level, 3);
        assert_eq!(lod.classify_with_upper_check(corner, 4).level, 0);
    }

    #[test]
    fn test_box_follows_draft() {
        let mut world = MemoryWorld::new();
        layer(&mut world, 0, stone());
        let resolver = CubeModelResolver::new().with_color("stone", [0.5, 0.5, 0.5]);
        let lod = LodApproximator::new(&world, &resolver, wide(), true);

        let mesh = lod.super_voxel_mesh(BlockPosition::new(0, 0, 0), 4).unwrap();
        assert_eq!(mesh.face_count(), 6);
        let max_y = mesh.vertices.iter().map(|v| v[1]).fold(f32::MIN, f32::max);
        assert_eq!(max_y, 1.0);
        assert!((mesh.surface_area() - (16.0 * 2.0 + 4.0 * 4.0)).abs() < 1e-4);

        let names: Vec<_> = mesh.materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["lod_stone_top", "lod_stone_side"]);
        assert!(mesh.materials.iter().all(|m| m.color.is_some()));
        for face in &mesh.faces {
            let expected = (face.direction != FaceDirection::Up) as u32;
            assert_eq!(face.material, expected);
        }
    }

    #[test]
    fn test_fluid_box_has_one_material() {
        let mut world = MemoryWorld::new();
        layer(&mut world, 0, water());
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);
        let mesh = lod.super_voxel_mesh(BlockPosition::new(0, 0, 0), 4).unwrap();
        assert_eq!(mesh.materials.len(), 1);
        assert_eq!(mesh.materials[0].name, "lod_water");
    }

    #[test]
    fn test_surrounded_super_voxel_has_no_faces() {
        let mut world = MemoryWorld::new();
        world.fill(BlockBounds::new([0, 0, 0], [11, 11, 11]), stone());
        let resolver = CubeModelResolver::new();
        let lod = LodApproximator::new(&world, &resolver, wide(), true);
        assert!(lod.super_voxel_mesh(BlockPosition::new(4, 4, 4), 4).is_none());
    }

    #[test]
    fn test_boundary_policy() {
        let mut world = MemoryWorld::new();
        world.fill(BlockBounds::new([0, 0, 0], [3, 3, 3]), stone());
        let resolver = CubeModelResolver::new();
        let bounds = BlockBounds::new([0, 0, 0], [3, 3, 3]);
        let corner = BlockPosition::new(0, 0, 0);

        let keep = LodApproximator::new(&world, &resolver, bounds, true);
        assert_eq!(keep.super_voxel_mesh(corner, 4).unwrap().face_count(), 6);

        let drop = LodApproximator::new(&world, &resolver, bounds, false);
        assert!(drop.super_voxel_mesh(corner, 4).is_none());
    }

    #[test]
    fn test_box_clipped_to_bounds() {
        let mut world = MemoryWorld::new();
        world.fill(BlockBounds::new([0, 0, 0], [7, 7, 7]), stone());
        let resolver = CubeModelResolver::new();
        let bounds = BlockBounds::new([0, 0, 0], [5, 15, 15]);
        let lod = LodApproximator::new(&world, &resolver, bounds, true);

        let mesh = lod.super_voxel_mesh(BlockPosition::new(0, 0, 0), 8).unwrap();
        let max_x = mesh.vertices.iter().map(|v| v[0]).fold(f32::MIN, f32::max);
        let max_y = mesh.vertices.iter().map(|v| v[1]).fold(f32::MIN, f32::max);
        assert_eq!(max_x, 6.0);
        assert_eq!(max_y, 8.0);
        assert!(mesh.vertices.iter().all(|v| v[0] >= 0.0 && v[2] <= 8.0));

        let section = lod.build(ColumnPos::new(0, 0), 0, 8).unwrap();
        assert!(section.vertices.iter().all(|v| v[0] <= 6.0));
    }

    #[test]
    fn test_level_change_uses_exact_scan() {
        let mut world = MemoryWorld::new();
        world.fill(BlockBounds::new([0, 0, 0], [19, 3, 3]), stone());
        let resolver = CubeModelResolver::new();
        let bounds = BlockBounds::new([0, 0, 0], [19, 3, 3]);

        let mut map = LodMap::new();
        map.insert(ColumnPos::new(0, 0), 0, 4);
        map.insert(ColumnPos::new(1, 0), 0, 0);

        let corner = BlockPosition::new(12, 0, 0);
        {
            let lod = LodApproximator::new(&world, &resolver, bounds, false).with_lod_map(&map);
            assert!(lod.super_voxel_mesh(corner, 4).is_none());
        }

        // A single hole across the face exposes it.
        world.set_block(BlockPosition::new(16, 2, 1), BlockInfo::new("minecraft:air"));
        let lod = LodApproximator::new(&world, &resolver, bounds, false).with_lod_map(&map);
        let mesh = lod.super_voxel_mesh(corner, 4).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.faces[0].direction, FaceDirection::East);
    }

    #[test]
    fn test_build_section() {
        let mut world = MemoryWorld::new();
        world.fill(BlockBounds::new([0, 0, 0], [15, 0, 15]), stone());
        let resolver = CubeModelResolver::new();
        let bounds = BlockBounds::new([0, 0, 0], [15, 15, 15]);
        let lod = LodApproximator::new(&world, &resolver, bounds, true);

        let mesh = lod.build(ColumnPos::new(0, 0), 0, 8).unwrap();
        // Four 8x8 slabs one block high: tops, bottoms, and the outer sides.
        assert_eq!(mesh.face_count(), 4 + 4 + 8);
        assert!((mesh.surface_area() - (256.0 * 2.0 + 64.0)).abs() < 1e-3);
    }
}
