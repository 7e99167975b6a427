//! In-memory voxel world.
//!
//! [`MemoryWorld`] stores a sparse set of blocks against a palette and
//! answers [`WorldSource`] queries directly. It is the world used by the
//! command-line driver and the test suite; on-disk formats plug in through
//! their own [`WorldSource`] implementations.

use crate::error::{MesherError, Result};
use crate::mesher::geometry::MeshBuffer;
use crate::types::{
    BlockBounds, BlockInfo, BlockPosition, BlockQuery, ColumnPos, Direction, WorldSource,
    FLUID_AIR, FLUID_SLOT_OFFSETS, FLUID_SOLID, SKY_ENCLOSED,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Sky exposure reported for a position that sees the sky.
pub const SKY_OPEN: i32 = 15;

/// A block placed in a world file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedBlock {
    pub pos: [i32; 3],
    /// Index into the palette.
    pub id: u32,
}

/// Decorative entity geometry attached to a column, in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEntities {
    pub column: ColumnPos,
    pub mesh: MeshBuffer,
}

/// Serialized form of a [`MemoryWorld`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldFile {
    pub palette: Vec<BlockInfo>,
    #[serde(default)]
    pub blocks: Vec<PlacedBlock>,
    #[serde(default)]
    pub entities: Vec<ColumnEntities>,
}

/// A sparse voxel world held in memory.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    palette: Vec<BlockInfo>,
    air: u32,
    blocks: HashMap<BlockPosition, u32>,
    /// Heights of the non-air blocks in each (x, z) column of blocks.
    heights: HashMap<(i32, i32), BTreeSet<i32>>,
    entities: HashMap<ColumnPos, MeshBuffer>,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorld {
    /// Create an empty world whose palette holds only air.
    pub fn new() -> Self {
        Self {
            palette: vec![BlockInfo::new("minecraft:air")],
            air: 0,
            blocks: HashMap::new(),
            heights: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    /// Build a world from its serialized form.
    pub fn from_file(file: WorldFile) -> Result<Self> {
        let mut world = Self::new();
        world.palette = file.palette;
        world.air = match world.palette.iter().position(BlockInfo::is_air) {
            Some(index) => index as u32,
            None => {
                world.palette.push(BlockInfo::new("minecraft:air"));
                (world.palette.len() - 1) as u32
            }
        };

        for block in file.blocks {
            if block.id as usize >= world.palette.len() {
                return Err(MesherError::InvalidWorld(format!(
                    "block at {:?} uses palette id {} but the palette has {} entries",
                    block.pos,
                    block.id,
                    world.palette.len()
                )));
            }
            let [x, y, z] = block.pos;
            world.set_block_id(BlockPosition::new(x, y, z), block.id);
        }
        for entities in file.entities {
            world.add_entities(entities.column, entities.mesh);
        }
        Ok(world)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_file(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Palette id of a block, adding it to the palette if needed.
    pub fn intern(&mut self, info: BlockInfo) -> u32 {
        if let Some(index) = self.palette.iter().position(|known| *known == info) {
            return index as u32;
        }
        self.palette.push(info);
        (self.palette.len() - 1) as u32
    }

    /// Place a block, replacing whatever was there.
    pub fn set_block(&mut self, pos: BlockPosition, info: BlockInfo) {
        let id = self.intern(info);
        self.set_block_id(pos, id);
    }

    /// Fill an inclusive box with one block.
    pub fn fill(&mut self, bounds: BlockBounds, info: BlockInfo) {
        let id = self.intern(info);
        for x in bounds.min[0]..=bounds.max[0] {
            for y in bounds.min[1]..=bounds.max[1] {
                for z in bounds.min[2]..=bounds.max[2] {
                    self.set_block_id(BlockPosition::new(x, y, z), id);
                }
            }
        }
    }

    fn set_block_id(&mut self, pos: BlockPosition, id: u32) {
        let column = self.heights.entry((pos.x, pos.z)).or_default();
        if self.palette[id as usize].is_air() {
            self.blocks.remove(&pos);
            column.remove(&pos.y);
        } else {
            self.blocks.insert(pos, id);
            column.insert(pos.y);
        }
    }

    /// Attach entity geometry to a column, merging with any already there.
    pub fn add_entities(&mut self, column: ColumnPos, mesh: MeshBuffer) {
        let existing = self.entities.entry(column).or_default();
        if existing.is_empty() {
            *existing = mesh;
        } else if let Err(err) = crate::mesher::merge::merge_into(existing, &mesh) {
            log::warn!("dropping corrupt entity mesh for column {:?}: {}", column, err);
        }
    }

    pub fn palette(&self) -> &[BlockInfo] {
        &self.palette
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Palette id at a position; air where nothing is placed.
    pub fn block_id_at(&self, pos: BlockPosition) -> u32 {
        self.blocks.get(&pos).copied().unwrap_or(self.air)
    }

    fn info_at(&self, pos: BlockPosition) -> Option<&BlockInfo> {
        self.palette.get(self.block_id_at(pos) as usize)
    }

    fn is_air_pos(&self, pos: BlockPosition) -> bool {
        self.info_at(pos).map(BlockInfo::is_air).unwrap_or(true)
    }

    fn fluid_level_at(&self, pos: BlockPosition) -> i8 {
        match self.info_at(pos) {
            Some(info) if info.is_air() => FLUID_AIR,
            Some(BlockInfo {
                fluid_level: Some(level),
                ..
            }) => (*level).min(i8::MAX as u8) as i8,
            Some(_) => FLUID_SOLID,
            None => FLUID_AIR,
        }
    }

    /// Whether nothing non-air sits at or above `pos` in its block column.
    fn sees_sky(&self, pos: BlockPosition) -> bool {
        match self.heights.get(&(pos.x, pos.z)).and_then(|ys| ys.last()) {
            Some(&top) => pos.y > top,
            None => true,
        }
    }

    /// Smallest box holding every non-air block.
    pub fn bounds(&self) -> Option<BlockBounds> {
        let mut positions = self.blocks.keys();
        let first = positions.next()?;
        let mut bounds = BlockBounds::new([first.x, first.y, first.z], [first.x, first.y, first.z]);
        for pos in positions {
            let p = [pos.x, pos.y, pos.z];
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }
}

impl WorldSource for MemoryWorld {
    fn query_block(&self, x: i32, y: i32, z: i32) -> BlockQuery {
        let pos = BlockPosition::new(x, y, z);
        let mut neighbor_air = [false; 6];
        for direction in Direction::ALL {
            neighbor_air[direction.mask_slot()] = self.is_air_pos(pos.neighbor(direction));
        }
        BlockQuery {
            block_id: self.block_id_at(pos),
            neighbor_air,
            fluid_levels: FLUID_SLOT_OFFSETS.map(|offset| self.fluid_level_at(pos.offset(offset))),
        }
    }

    fn block_info(&self, block_id: u32) -> Option<&BlockInfo> {
        self.palette.get(block_id as usize)
    }

    fn sky_exposure(&self, x: i32, y: i32, z: i32) -> i32 {
        let pos = BlockPosition::new(x, y, z);
        let exposed = Direction::ALL.iter().any(|&direction| {
            let neighbor = pos.neighbor(direction);
            self.is_air_pos(neighbor) && self.sees_sky(neighbor)
        });
        if exposed {
            SKY_OPEN
        } else {
            SKY_ENCLOSED
        }
    }

    fn column_entities(&self, column: ColumnPos) -> Option<MeshBuffer> {
        self.entities.get(&column).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stone() -> BlockInfo {
        BlockInfo::new("minecraft:stone")
    }

    #[test]
    fn test_query_isolated_block() {
        let mut world = MemoryWorld::new();
        world.set_block(BlockPosition::new(1, 2, 3), stone());

        let query = world.query_block(1, 2, 3);
        assert_eq!(world.block_info(query.block_id), Some(&stone()));
        assert_eq!(query.neighbor_air, [true; 6]);
        assert_eq!(query.fluid_levels[0], FLUID_SOLID);
        assert!(query.fluid_levels[1..].iter().all(|&l| l == FLUID_AIR));
        assert!(world.is_air_at(0, 0, 0));
    }

    #[test]
    fn test_neighbor_mask_slots() {
        let mut world = MemoryWorld::new();
        world.set_block(BlockPosition::new(0, 0, 0), stone());
        world.set_block(BlockPosition::new(0, -1, 0), stone());
        world.set_block(BlockPosition::new(1, 0, 0), stone());

        let query = world.query_block(0, 0, 0);
        assert!(!query.neighbor_air[Direction::Down.mask_slot()]);
        assert!(!query.neighbor_air[Direction::East.mask_slot()]);
        assert!(query.neighbor_air[Direction::Up.mask_slot()]);
        assert!(query.neighbor_air[Direction::West.mask_slot()]);
    }

    #[test]
    fn test_fluid_levels() {
        let mut world = MemoryWorld::new();
        let water = BlockInfo::new("minecraft:water").with_fluid_level(0);
        world.set_block(BlockPosition::new(0, 0, 0), water.clone());
        world.set_block(BlockPosition::new(0, 0, -1), water.with_fluid_level(3));
        world.set_block(BlockPosition::new(1, 0, 0), stone());

        let levels = world.query_block(0, 0, 0).fluid_levels;
        assert_eq!(levels[0], 0);
        assert_eq!(levels[1], 3); // north
        assert_eq!(levels[4], FLUID_SOLID); // east
        assert_eq!(levels[9], FLUID_AIR); // above
    }

    #[test]
    fn test_sky_exposure() {
        let mut world = MemoryWorld::new();
        // A solid 5x5x5 block of stone with a sealed air pocket in the middle.
        world.fill(BlockBounds::new([0, 0, 0], [4, 4, 4]), stone());
        world.set_block(BlockPosition::new(2, 2, 2), BlockInfo::new("minecraft:air"));

        assert_eq!(world.sky_exposure(2, 4, 2), SKY_OPEN);
        assert_eq!(world.sky_exposure(2, 1, 2), SKY_ENCLOSED);
        assert_eq!(world.sky_exposure(1, 1, 1), SKY_ENCLOSED);
        assert_eq!(world.sky_exposure(0, 0, 0), SKY_OPEN);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "palette": [
                {"name": "minecraft:stone"},
                {"name": "minecraft:water", "fluid_level": 0}
            ],
            "blocks": [
                {"pos": [0, 0, 0], "id": 0},
                {"pos": [0, 1, 0], "id": 1}
            ]
        }"#;
        let world = MemoryWorld::from_json_str(json).unwrap();
        assert_eq!(world.block_count(), 2);
        assert_eq!(world.palette().len(), 3);
        assert_eq!(world.query_block(0, 1, 0).fluid_levels[0], 0);
        assert_eq!(world.bounds(), Some(BlockBounds::new([0, 0, 0], [0, 1, 0])));
    }

    #[test]
    fn test_from_json_rejects_bad_palette_id() {
        let json = r#"{"palette": [{"name": "minecraft:stone"}], "blocks": [{"pos": [0, 0, 0], "id": 5}]}"#;
        assert!(matches!(
            MemoryWorld::from_json_str(json),
            Err(MesherError::InvalidWorld(_))
        ));
    }

    #[test]
    fn test_entities_by_column() {
        let mut world = MemoryWorld::new();
        let mut mesh = MeshBuffer::new();
        mesh.add_vertex([1.0, 2.0, 3.0]);
        world.add_entities(ColumnPos::new(0, 0), mesh.clone());
        assert_eq!(world.column_entities(ColumnPos::new(0, 0)), Some(mesh));
        assert_eq!(world.column_entities(ColumnPos::new(1, 0)), None);
    }
}
