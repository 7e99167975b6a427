//! Shared types used throughout the library.

mod direction;

pub use direction::{Axis, Direction, FaceDirection};

use crate::error::Result;
use crate::mesher::geometry::MeshBuffer;
use serde::{Deserialize, Serialize};

/// Horizontal edge length of a column, in blocks.
pub const COLUMN_SIZE: i32 = 16;

/// Height of one vertical section of a column, in blocks.
pub const SECTION_HEIGHT: i32 = 16;

/// Fluid level reported for a position holding no fluid and no solid block.
pub const FLUID_AIR: i8 = -1;

/// Fluid level reported for a position holding a non-fluid block.
pub const FLUID_SOLID: i8 = -2;

/// Sky exposure value meaning the position is fully enclosed.
pub const SKY_ENCLOSED: i32 = -1;

/// Offsets of the ten slots of [`BlockQuery::fluid_levels`]:
/// self, north, south, west, east, north-west, north-east, south-west,
/// south-east, above.
pub const FLUID_SLOT_OFFSETS: [(i32, i32, i32); 10] = [
    (0, 0, 0),
    (0, 0, -1),
    (0, 0, 1),
    (-1, 0, 0),
    (1, 0, 0),
    (-1, 0, -1),
    (1, 0, -1),
    (-1, 0, 1),
    (1, 0, 1),
    (0, 1, 0),
];

/// A block position in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the neighboring position in the given direction.
    pub fn neighbor(&self, direction: Direction) -> Self {
        self.offset(direction.offset())
    }

    /// Get the position shifted by `(dx, dy, dz)`.
    pub fn offset(&self, (dx, dy, dz): (i32, i32, i32)) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// The column containing this position.
    pub fn column(&self) -> ColumnPos {
        ColumnPos::new(
            self.x.div_euclid(COLUMN_SIZE),
            self.z.div_euclid(COLUMN_SIZE),
        )
    }

    /// The vertical section index containing this position.
    pub fn section(&self) -> i32 {
        self.y.div_euclid(SECTION_HEIGHT)
    }
}

/// Horizontal coordinates of a column, in column units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnPos {
    pub x: i32,
    pub z: i32,
}

impl ColumnPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World x of the column's first block.
    pub fn min_block_x(&self) -> i32 {
        self.x * COLUMN_SIZE
    }

    /// World z of the column's first block.
    pub fn min_block_z(&self) -> i32 {
        self.z * COLUMN_SIZE
    }
}

/// An integer axis-aligned box of blocks, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBounds {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl BlockBounds {
    pub fn new(min: [i32; 3], max: [i32; 3]) -> Self {
        Self { min, max }
    }

    /// Whether the box contains at least one block.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= self.min[0]
            && x <= self.max[0]
            && y >= self.min[1]
            && y <= self.max[1]
            && z >= self.min[2]
            && z <= self.max[2]
    }

    /// Inclusive range of column x coordinates touched by the box.
    pub fn column_range_x(&self) -> std::ops::RangeInclusive<i32> {
        self.min[0].div_euclid(COLUMN_SIZE)..=self.max[0].div_euclid(COLUMN_SIZE)
    }

    /// Inclusive range of column z coordinates touched by the box.
    pub fn column_range_z(&self) -> std::ops::RangeInclusive<i32> {
        self.min[2].div_euclid(COLUMN_SIZE)..=self.max[2].div_euclid(COLUMN_SIZE)
    }

    /// Inclusive range of section indices touched by the box.
    pub fn section_range(&self) -> std::ops::RangeInclusive<i32> {
        self.min[1].div_euclid(SECTION_HEIGHT)..=self.max[1].div_euclid(SECTION_HEIGHT)
    }

    /// Widen the box on x and z to whole-column boundaries.
    pub fn aligned_to_columns(&self) -> Self {
        let align_min = |v: i32| v.div_euclid(COLUMN_SIZE) * COLUMN_SIZE;
        let align_max = |v: i32| v.div_euclid(COLUMN_SIZE) * COLUMN_SIZE + COLUMN_SIZE - 1;
        Self {
            min: [align_min(self.min[0]), self.min[1], align_min(self.min[2])],
            max: [align_max(self.max[0]), self.max[1], align_max(self.max[2])],
        }
    }

    /// Intersection of the box with one (column, section) unit, if non-empty.
    pub fn clip_to_section(&self, column: ColumnPos, section_y: i32) -> Option<BlockBounds> {
        let unit_min = [
            column.min_block_x(),
            section_y * SECTION_HEIGHT,
            column.min_block_z(),
        ];
        let clipped = BlockBounds {
            min: [
                self.min[0].max(unit_min[0]),
                self.min[1].max(unit_min[1]),
                self.min[2].max(unit_min[2]),
            ],
            max: [
                self.max[0].min(unit_min[0] + COLUMN_SIZE - 1),
                self.max[1].min(unit_min[1] + SECTION_HEIGHT - 1),
                self.max[2].min(unit_min[2] + COLUMN_SIZE - 1),
            ],
        };
        clipped.is_valid().then_some(clipped)
    }
}

/// Static description of a block id from the world palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Namespaced block name, e.g. "minecraft:stone".
    pub name: String,
    /// Discrete fluid level when the block carries one (0 = source).
    #[serde(default)]
    pub fluid_level: Option<u8>,
}

impl BlockInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fluid_level: None,
        }
    }

    pub fn with_fluid_level(mut self, level: u8) -> Self {
        self.fluid_level = Some(level);
        self
    }

    /// Get the namespace (e.g., "minecraft").
    pub fn namespace(&self) -> &str {
        match self.name.split_once(':') {
            Some((namespace, _)) => namespace,
            None => "minecraft",
        }
    }

    /// Get the block ID without namespace (e.g., "stone").
    pub fn block_id(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, id)) => id,
            None => &self.name,
        }
    }

    /// Block id without namespace or state suffix, lowercased.
    pub fn normalized_id(&self) -> String {
        let id = self.block_id();
        let id = id.split('[').next().unwrap_or(id);
        id.trim().to_lowercase()
    }

    /// Check if this is an air block.
    pub fn is_air(&self) -> bool {
        matches!(
            self.normalized_id().as_str(),
            "air" | "cave_air" | "void_air"
        )
    }

    /// Check if this block carries a fluid level.
    pub fn is_fluid(&self) -> bool {
        self.fluid_level.is_some()
    }
}

/// Result of a single-block world query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockQuery {
    /// Palette id of the block.
    pub block_id: u32,
    /// Whether each neighbor is air, indexed by [`Direction::mask_slot`].
    pub neighbor_air: [bool; 6],
    /// Fluid levels at the positions listed in [`FLUID_SLOT_OFFSETS`].
    pub fluid_levels: [i8; 10],
}

/// Read access to a voxel world.
///
/// Implementations must be safe to query from many mesh workers at once.
pub trait WorldSource: Sync {
    /// Query the block at a position together with its neighborhood.
    fn query_block(&self, x: i32, y: i32, z: i32) -> BlockQuery;

    /// Describe a palette id. Unknown ids are treated as air.
    fn block_info(&self, block_id: u32) -> Option<&BlockInfo>;

    /// Sky exposure at a position; [`SKY_ENCLOSED`] means fully enclosed.
    fn sky_exposure(&self, x: i32, y: i32, z: i32) -> i32;

    /// Prepare the read-only caches for one column.
    ///
    /// Called once per column during the load phase, before any meshing.
    fn load_column(&self, _column: ColumnPos) -> Result<()> {
        Ok(())
    }

    /// World-positioned decorative entity geometry attached to a column.
    fn column_entities(&self, _column: ColumnPos) -> Option<MeshBuffer> {
        None
    }

    /// Whether the block at a position is air (or unknown).
    fn is_air_at(&self, x: i32, y: i32, z: i32) -> bool {
        let query = self.query_block(x, y, z);
        self.block_info(query.block_id)
            .map(|info| info.is_air())
            .unwrap_or(true)
    }
}
