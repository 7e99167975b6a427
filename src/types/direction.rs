//! Direction and axis types for face tagging and neighbor lookups.

use serde::{Deserialize, Serialize};

/// The six cardinal directions / face directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// All six directions, in neighbor-mask slot order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Get the offset for this direction.
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    /// Get the normal vector for this direction.
    pub fn normal(&self) -> [f32; 3] {
        let (x, y, z) = self.offset();
        [x as f32, y as f32, z as f32]
    }

    /// Get the axis this direction is on.
    pub fn axis(&self) -> Axis {
        match self {
            Direction::Down | Direction::Up => Axis::Y,
            Direction::North | Direction::South => Axis::Z,
            Direction::West | Direction::East => Axis::X,
        }
    }

    /// Slot of this direction in a [`BlockQuery::neighbor_air`](crate::types::BlockQuery) mask.
    pub fn mask_slot(&self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Up => 1,
            Direction::North => 2,
            Direction::South => 3,
            Direction::West => 4,
            Direction::East => 5,
        }
    }
}

/// Culling tag carried by every quad of a mesh.
///
/// The six axis tags map onto [`Direction`]; `DoNotCull` faces survive any
/// neighbor, and `Unknown` faces have no neighbor to test against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceDirection {
    Up,
    Down,
    North,
    South,
    West,
    East,
    DoNotCull,
    Unknown,
}

impl FaceDirection {
    /// The axis direction of this tag, if it has one.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            FaceDirection::Up => Some(Direction::Up),
            FaceDirection::Down => Some(Direction::Down),
            FaceDirection::North => Some(Direction::North),
            FaceDirection::South => Some(Direction::South),
            FaceDirection::West => Some(Direction::West),
            FaceDirection::East => Some(Direction::East),
            FaceDirection::DoNotCull | FaceDirection::Unknown => None,
        }
    }
}

impl From<Direction> for FaceDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Down => FaceDirection::Down,
            Direction::Up => FaceDirection::Up,
            Direction::North => FaceDirection::North,
            Direction::South => FaceDirection::South,
            Direction::West => FaceDirection::West,
            Direction::East => FaceDirection::East,
        }
    }
}

/// The three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Index of this axis into an `[x, y, z]` array.
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two in-plane axes `(u, v)` for a face lying across this axis.
    pub fn plane_axes(&self) -> (Axis, Axis) {
        match self {
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
            Axis::X => (Axis::Z, Axis::Y),
        }
    }
}
