//! Fluid surface synthesis.
//!
//! Fluids have no block model of their own. Their geometry is generated from
//! the discrete fluid levels of the cell and its eight horizontal neighbors:
//! each top corner blends the heights of the four cells sharing it, the sides
//! run from the cell floor up to those corners, and the top texture is
//! rotated to follow the flow.

use crate::mesher::geometry::{box_face_positions, Material, MeshBuffer};
use crate::types::{Direction, FaceDirection, FLUID_AIR};
use glam::{Vec2, Vec3};
use std::f32::consts::FRAC_PI_8;

/// Material slot of the still texture in a synthesized surface.
pub const STILL_SLOT: u32 = 0;

/// Material slot of the flowing texture in a synthesized surface.
pub const FLOW_SLOT: u32 = 1;

const STILL_PLACEHOLDER: &str = "fluid_still";
const FLOW_PLACEHOLDER: &str = "fluid_flow";

/// Heights at or above this weigh [`FULL_WEIGHT`] when blending corners.
const FULL_HEIGHT_THRESHOLD: f32 = 0.8;
const FULL_WEIGHT: f32 = 10.0;
const FLOWING_WEIGHT: f32 = 1.0;
const AIR_WEIGHT: f32 = 0.5;

/// Slots of the level vector: self, N, S, W, E, NW, NE, SW, SE, above.
const SELF: usize = 0;
const ABOVE: usize = 9;

/// Cells sharing each top corner, keyed by the corner's (x, z) in the unit
/// cell: NW, NE, SE, SW.
const CORNER_CELLS: [((u8, u8), [usize; 4]); 4] = [
    ((0, 0), [SELF, 1, 3, 5]),
    ((1, 0), [SELF, 1, 4, 6]),
    ((1, 1), [SELF, 2, 4, 8]),
    ((0, 1), [SELF, 2, 3, 7]),
];

/// Height and blending weight of a discrete level.
///
/// Returns `None` for solid cells, which take no part in blending.
pub fn level_height(level: i8) -> Option<(f32, f32)> {
    let height = match level {
        FLUID_AIR => return Some((0.0, AIR_WEIGHT)),
        l if l < 0 => return None,
        0 => 8.0 / 9.0,
        l @ 1..=7 => (8 - l) as f32 / 9.0,
        _ => 1.0,
    };
    let weight = if height >= FULL_HEIGHT_THRESHOLD {
        FULL_WEIGHT
    } else {
        FLOWING_WEIGHT
    };
    Some((height, weight))
}

fn is_falling(level: i8) -> bool {
    level >= 8
}

/// The four top corner heights, in [`CORNER_CELLS`] order.
pub fn corner_heights(levels: &[i8; 10]) -> [f32; 4] {
    if levels[ABOVE] >= 0 {
        return [1.0; 4];
    }
    let own = level_height(levels[SELF]).map(|(h, _)| h).unwrap_or(8.0 / 9.0);

    CORNER_CELLS.map(|(_, cells)| {
        let mut total_height = 0.0;
        let mut total_weight = 0.0;
        for slot in cells {
            if slot != SELF && is_falling(levels[slot]) {
                return 1.0;
            }
            if let Some((height, weight)) = level_height(levels[slot]) {
                total_height += height * weight;
                total_weight += weight;
            }
        }
        if total_weight > 0.0 {
            total_height / total_weight
        } else {
            own
        }
    })
}

/// Flow angle in radians from the corner heights, quantized to 22.5 degree
/// steps, or `None` when the surface is flat.
pub fn flow_angle(heights: &[f32; 4]) -> Option<f32> {
    let [nw, ne, se, sw] = *heights;
    // Fluid runs downhill: from the higher edge toward the lower one.
    let flow = Vec2::new((nw + sw) - (ne + se), (nw + ne) - (sw + se));
    if flow.length() < 1e-4 {
        return None;
    }
    let angle = flow.y.atan2(flow.x);
    Some((angle / FRAC_PI_8).round() * FRAC_PI_8)
}

fn corner_height_at(heights: &[f32; 4], x: f32, z: f32) -> f32 {
    let key = (x.round() as u8, z.round() as u8);
    CORNER_CELLS
        .iter()
        .position(|(corner, _)| *corner == key)
        .map(|i| heights[i])
        .unwrap_or(1.0)
}

/// Texture coordinates of a top corner, rotated by the flow angle.
///
/// Flowing textures are sampled over their middle half so that rotated
/// corners stay inside the texture.
fn flow_uv(corner: [f32; 3], angle: f32) -> [f32; 2] {
    let offset = Vec2::new(corner[0] - 0.5, corner[2] - 0.5);
    let rotated = Vec2::from_angle(angle).rotate(offset) * 0.5;
    [0.5 + rotated.x, 0.5 + rotated.y]
}

/// Build the surface of one fluid cell in local block coordinates.
///
/// The mesh carries placeholder materials at [`STILL_SLOT`] and
/// [`FLOW_SLOT`]; see [`assign_fluid_materials`]. A cell whose own level is
/// not a fluid yields an empty mesh.
pub fn synthesize_fluid_surface(levels: &[i8; 10]) -> MeshBuffer {
    let mut mesh = MeshBuffer::new();
    if levels[SELF] < 0 {
        return mesh;
    }
    mesh.add_material(Material::new(STILL_PLACEHOLDER, STILL_PLACEHOLDER));
    mesh.add_material(Material::new(FLOW_PLACEHOLDER, FLOW_PLACEHOLDER));

    let heights = corner_heights(levels);
    let fluid_above = levels[ABOVE] >= 0;

    for direction in Direction::ALL {
        let mut positions = box_face_positions(direction, Vec3::ZERO, Vec3::ONE);
        if direction != Direction::Down {
            for position in &mut positions {
                if position[1] > 0.5 {
                    position[1] = corner_height_at(&heights, position[0], position[2]);
                }
            }
        }

        match direction {
            Direction::Up => {
                if fluid_above {
                    continue;
                }
                let flush = heights.iter().all(|&h| h >= 1.0);
                let tag = if flush {
                    FaceDirection::Up
                } else {
                    FaceDirection::DoNotCull
                };
                match flow_angle(&heights) {
                    Some(angle) => {
                        let uvs = positions.map(|p| flow_uv(p, angle));
                        mesh.push_quad(positions, uvs, FLOW_SLOT, tag);
                    }
                    None => {
                        let uvs = positions.map(|p| [p[0], p[2]]);
                        mesh.push_quad(positions, uvs, STILL_SLOT, tag);
                    }
                }
            }
            Direction::Down => {
                let uvs = positions.map(|p| [p[0], p[2]]);
                mesh.push_quad(positions, uvs, STILL_SLOT, FaceDirection::Down);
            }
            side => {
                // Bottom corners come first in every side face.
                let uvs = [
                    [0.0, positions[0][1]],
                    [1.0, positions[1][1]],
                    [1.0, positions[2][1]],
                    [0.0, positions[3][1]],
                ];
                mesh.push_quad(positions, uvs, FLOW_SLOT, side.into());
            }
        }
    }
    mesh
}

/// Replace the placeholder materials of a synthesized surface with the
/// block's own still and flowing textures.
pub fn assign_fluid_materials(mesh: &mut MeshBuffer, block_name: &str) {
    let id = block_name.split_once(':').map(|(_, id)| id).unwrap_or(block_name);
    let id = id.split('[').next().unwrap_or(id);
    for material in &mut mesh.materials {
        let suffix = match material.name.as_str() {
            STILL_PLACEHOLDER => "still",
            FLOW_PLACEHOLDER => "flow",
            _ => continue,
        };
        *material = Material::new(format!("{}_{}", id, suffix), format!("block/{}_{}", id, suffix))
            .animated();
    }
}
