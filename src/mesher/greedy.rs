//! Greedy meshing algorithm for merging adjacent coplanar faces.
//!
//! Merges adjacent faces with the same material, orientation and texture
//! frame into larger quads, dramatically reducing face count for large flat
//! surfaces. Faces that cannot take part (custom UVs, animated materials,
//! `DoNotCull`/`Unknown` tags, non-rectangular shapes) pass through unchanged.

use crate::error::Result;
use crate::mesher::dedup::{quantize, MeshWelder, SPATIAL_QUANTUM};
use crate::mesher::geometry::{MeshBuffer, Quad};
use crate::types::{Axis, Direction, FaceDirection};
use std::collections::{BTreeMap, HashMap};

/// Groups whose bounding box is wider or taller than this many cells are
/// not merged.
pub const MAX_GROUP_EXTENT: i64 = 1000;

/// Tolerance for matching texture coordinates against the unit corners.
const UV_EPSILON: f32 = 1e-4;

/// Tolerance for a face lying on its own cell grid.
const ALIGN_EPSILON: f64 = 1e-3;

/// A corner of a face's rectangle in plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Corner {
    MinMin,
    MaxMin,
    MaxMax,
    MinMax,
}

impl Corner {
    /// Corners in counter-clockwise order of the (u, v) plane.
    const CYCLE: [Corner; 4] = [Corner::MinMin, Corner::MaxMin, Corner::MaxMax, Corner::MinMax];

    fn from_flags(u_max: bool, v_max: bool) -> Self {
        match (u_max, v_max) {
            (false, false) => Corner::MinMin,
            (true, false) => Corner::MaxMin,
            (true, true) => Corner::MaxMax,
            (false, true) => Corner::MinMax,
        }
    }

    /// Offset of this corner from the rectangle minimum, in rectangle units.
    fn offset(self) -> [i64; 2] {
        match self {
            Corner::MinMin => [0, 0],
            Corner::MaxMin => [1, 0],
            Corner::MaxMax => [1, 1],
            Corner::MinMax => [0, 1],
        }
    }
}

/// Cyclic order of a quad's corners: which vertex slot sits on the minimum
/// corner, and whether the next slot steps along u or along v.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindingClass {
    min_slot: u8,
    u_first: bool,
}

impl WindingClass {
    fn classify(corners: [Corner; 4]) -> Option<Self> {
        let min_slot = corners.iter().position(|&c| c == Corner::MinMin)?;
        let u_first = match corners[(min_slot + 1) % 4] {
            Corner::MaxMin => true,
            Corner::MinMax => false,
            _ => return None,
        };
        let class = Self {
            min_slot: min_slot as u8,
            u_first,
        };
        (class.layout() == corners).then_some(class)
    }

    /// The corner occupied by each vertex slot.
    fn layout(&self) -> [Corner; 4] {
        let mut corners = [Corner::MinMin; 4];
        for step in 0..4 {
            let cycle = if self.u_first { step } else { (4 - step) % 4 };
            corners[(self.min_slot as usize + step) % 4] = Corner::CYCLE[cycle];
        }
        corners
    }
}

/// Orientation of the texture on the face plane: the plane directions the
/// texture's s and t axes run along. Each is a signed unit step along u or v.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureFrame {
    s: [i64; 2],
    t: [i64; 2],
}

impl TextureFrame {
    fn from_steps(s: [i64; 2], t: [i64; 2]) -> Option<Self> {
        let unit = |d: [i64; 2]| d[0].abs() + d[1].abs() == 1;
        let orthogonal = s[0] * t[0] + s[1] * t[1] == 0;
        (unit(s) && unit(t) && orthogonal).then_some(Self { s, t })
    }

    /// Texture coordinates of a plane offset, before translation to the origin.
    fn project(&self, offset: [i64; 2]) -> [i64; 2] {
        [
            offset[0] * self.s[0] + offset[1] * self.s[1],
            offset[0] * self.t[0] + offset[1] * self.t[1],
        ]
    }
}

/// Faces sharing a key can be merged with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct GroupKey {
    direction: FaceDirection,
    material: u32,
    plane: i64,
    winding: WindingClass,
    frame: TextureFrame,
    cell: [i64; 2],
}

/// An eligible face mapped onto its plane grid.
struct ProjectedFace {
    key: GroupKey,
    axis: Axis,
    plane: f32,
    cell_size: [f32; 2],
    cell: (i64, i64),
}

/// A rectangle of grid cells, in cell units relative to the group origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub u: usize,
    pub v: usize,
    pub width: usize,
    pub height: usize,
}

impl GridRect {
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Faces of one merge group, keyed by absolute grid cell.
struct FaceGroup {
    axis: Axis,
    plane: f32,
    cell_size: [f32; 2],
    cells: HashMap<(i64, i64), usize>,
    order: Vec<(i64, i64)>,
}

impl FaceGroup {
    fn new(face: &ProjectedFace) -> Self {
        Self {
            axis: face.axis,
            plane: face.plane,
            cell_size: face.cell_size,
            cells: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a face; returns false when its cell is already taken.
    fn insert(&mut self, cell: (i64, i64), face_index: usize) -> bool {
        if self.cells.contains_key(&cell) {
            return false;
        }
        self.cells.insert(cell, face_index);
        self.order.push(cell);
        true
    }
}

/// Map a face onto its plane grid, or `None` if it cannot be merged.
fn project_face(mesh: &MeshBuffer, face: &Quad) -> Option<ProjectedFace> {
    let direction: Direction = face.direction.direction()?;
    if mesh.materials.get(face.material as usize)?.animated {
        return None;
    }

    let axis = direction.axis();
    let (u_axis, v_axis) = axis.plane_axes();
    let positions = mesh.face_positions(face);

    let plane = positions[0][axis.index()];
    let plane_key = quantize(plane, SPATIAL_QUANTUM);
    if positions
        .iter()
        .any(|p| quantize(p[axis.index()], SPATIAL_QUANTUM) != plane_key)
    {
        return None;
    }

    let us = positions.map(|p| p[u_axis.index()]);
    let vs = positions.map(|p| p[v_axis.index()]);
    let (u_min, u_max) = min_max(&us);
    let (v_min, v_max) = min_max(&vs);
    let width = u_max - u_min;
    let height = v_max - v_min;
    let width_key = quantize(width, SPATIAL_QUANTUM);
    let height_key = quantize(height, SPATIAL_QUANTUM);
    if width_key <= 0 || height_key <= 0 {
        return None;
    }

    // Each vertex must sit on a distinct corner of the bounding rectangle.
    let mut corners = [Corner::MinMin; 4];
    for slot in 0..4 {
        let u_max_side = snap_side(us[slot], u_min, u_max)?;
        let v_max_side = snap_side(vs[slot], v_min, v_max)?;
        corners[slot] = Corner::from_flags(u_max_side, v_max_side);
    }
    let winding = WindingClass::classify(corners)?;

    // Derive the texture frame from where the unit UV corners landed.
    let uvs = face.uvs.map(|i| mesh.uvs[i as usize]);
    let slot_with = |target: [f32; 2]| {
        uvs.iter().position(|uv| {
            (uv[0] - target[0]).abs() < UV_EPSILON && (uv[1] - target[1]).abs() < UV_EPSILON
        })
    };
    let origin = corners[slot_with([0.0, 0.0])?].offset();
    let s_end = corners[slot_with([1.0, 0.0])?].offset();
    let t_end = corners[slot_with([0.0, 1.0])?].offset();
    let frame = TextureFrame::from_steps(
        [s_end[0] - origin[0], s_end[1] - origin[1]],
        [t_end[0] - origin[0], t_end[1] - origin[1]],
    )?;
    for slot in 0..4 {
        let offset = corners[slot].offset();
        let st = frame.project([offset[0] - origin[0], offset[1] - origin[1]]);
        if (uvs[slot][0] - st[0] as f32).abs() > UV_EPSILON
            || (uvs[slot][1] - st[1] as f32).abs() > UV_EPSILON
        {
            return None;
        }
    }

    let cell = (grid_index(u_min, width)?, grid_index(v_min, height)?);

    Some(ProjectedFace {
        key: GroupKey {
            direction: face.direction,
            material: face.material,
            plane: plane_key,
            winding,
            frame,
            cell: [width_key, height_key],
        },
        axis,
        plane,
        cell_size: [width, height],
        cell,
    })
}

fn min_max(values: &[f32; 4]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Which side of `[min, max]` a coordinate sits on: `Some(false)` for min,
/// `Some(true)` for max, `None` when it is on neither.
fn snap_side(value: f32, min: f32, max: f32) -> Option<bool> {
    let key = quantize(value, SPATIAL_QUANTUM);
    if key == quantize(min, SPATIAL_QUANTUM) {
        Some(false)
    } else if key == quantize(max, SPATIAL_QUANTUM) {
        Some(true)
    } else {
        None
    }
}

/// Index of the cell starting at `start` on a grid of pitch `size`.
fn grid_index(start: f32, size: f32) -> Option<i64> {
    let cells = start as f64 / size as f64;
    let rounded = cells.round();
    ((cells - rounded).abs() < ALIGN_EPSILON).then_some(rounded as i64)
}

/// Cover the occupied cells of a `width x height` grid with rectangles.
///
/// Each round picks the largest rectangle reachable by taking the rightward
/// run of free cells at a start cell and extending downward while the run
/// shrinks or holds; ties keep the first rectangle found in row-major scan
/// order. Returns the chosen rectangles in selection order.
///
/// A round scans the whole grid, so fragmented groups cost up to one scan
/// per rectangle. Once the best rectangle is a single cell every remaining
/// cell is isolated and they are emitted in one pass.
pub fn greedy_rectangles(occupied: &[bool], width: usize, height: usize) -> Vec<GridRect> {
    let mut free = occupied.to_vec();
    let mut runs = vec![0usize; width * height];
    for v in 0..height {
        recompute_row(&free, &mut runs, width, v);
    }

    let mut rects = Vec::new();
    loop {
        let mut best: Option<GridRect> = None;
        let mut best_area = 0;

        for v in 0..height {
            if width * (height - v) <= best_area {
                break;
            }
            for u in 0..width {
                let first_run = runs[v * width + u];
                if first_run == 0 || first_run * (height - v) <= best_area {
                    continue;
                }
                let mut run = first_run;
                for (rows, row) in (v..height).enumerate() {
                    let row_run = runs[row * width + u];
                    if row_run == 0 {
                        break;
                    }
                    run = run.min(row_run);
                    let area = run * (rows + 1);
                    if area > best_area {
                        best_area = area;
                        best = Some(GridRect { u, v, width: run, height: rows + 1 });
                    }
                    if run * (height - v) <= best_area {
                        break;
                    }
                }
            }
        }

        let Some(rect) = best else { break };
        if best_area == 1 {
            rects.extend(
                (0..height)
                    .flat_map(|v| (0..width).map(move |u| (u, v)))
                    .filter(|&(u, v)| free[v * width + u])
                    .map(|(u, v)| GridRect { u, v, width: 1, height: 1 }),
            );
            break;
        }
        for row in rect.v..rect.v + rect.height {
            for u in rect.u..rect.u + rect.width {
                free[row * width + u] = false;
            }
            recompute_row(&free, &mut runs, width, row);
        }
        rects.push(rect);
    }
    rects
}

fn recompute_row(free: &[bool], runs: &mut [usize], width: usize, v: usize) {
    let mut run = 0;
    for u in (0..width).rev() {
        run = if free[v * width + u] { run + 1 } else { 0 };
        runs[v * width + u] = run;
    }
}

/// Merge coplanar quads of a deduplicated mesh.
///
/// The output is rebuilt with unique vertices and UVs. Merged quads carry
/// UVs spanning `[0, width] x [0, height]` in cell units so that repeating
/// textures tile exactly as on the original faces.
pub fn greedy_mesh(mesh: &MeshBuffer) -> Result<MeshBuffer> {
    mesh.validate()?;

    let mut special = Vec::new();
    let mut groups: BTreeMap<GroupKey, FaceGroup> = BTreeMap::new();
    for (index, face) in mesh.faces.iter().enumerate() {
        match project_face(mesh, face) {
            Some(projected) => {
                let group = groups
                    .entry(projected.key)
                    .or_insert_with(|| FaceGroup::new(&projected));
                if !group.insert(projected.cell, index) {
                    special.push(index);
                }
            }
            None => special.push(index),
        }
    }

    let mut welder = MeshWelder::new(mesh.materials.clone());
    for &index in &special {
        welder.push_face_from(mesh, &mesh.faces[index]);
    }

    let mut merged = 0usize;
    for (key, group) in &groups {
        if group.cells.len() == 1 {
            for index in group.cells.values() {
                welder.push_face_from(mesh, &mesh.faces[*index]);
            }
            continue;
        }
        merged += merge_group(mesh, key, group, &mut welder);
    }

    let output = welder.finish();
    log::debug!(
        "greedy mesh: {} faces in, {} out ({} groups, {} merged quads)",
        mesh.face_count(),
        output.face_count(),
        groups.len(),
        merged
    );
    Ok(output)
}

/// Emit one group into `welder`; returns the number of merged quads emitted.
fn merge_group(mesh: &MeshBuffer, key: &GroupKey, group: &FaceGroup, welder: &mut MeshWelder) -> usize {
    let (mut u_lo, mut v_lo) = (i64::MAX, i64::MAX);
    let (mut u_hi, mut v_hi) = (i64::MIN, i64::MIN);
    for &(u, v) in group.cells.keys() {
        u_lo = u_lo.min(u);
        u_hi = u_hi.max(u);
        v_lo = v_lo.min(v);
        v_hi = v_hi.max(v);
    }
    let grid_width = u_hi - u_lo + 1;
    let grid_height = v_hi - v_lo + 1;

    if grid_width > MAX_GROUP_EXTENT || grid_height > MAX_GROUP_EXTENT {
        log::debug!(
            "greedy mesh: group {}x{} exceeds cap, passing {} faces through",
            grid_width,
            grid_height,
            group.cells.len()
        );
        for cell in &group.order {
            welder.push_face_from(mesh, &mesh.faces[group.cells[cell]]);
        }
        return 0;
    }

    let (width, height) = (grid_width as usize, grid_height as usize);
    let mut occupied = vec![false; width * height];
    for &(u, v) in group.cells.keys() {
        occupied[(v - v_lo) as usize * width + (u - u_lo) as usize] = true;
    }

    let mut merged = 0;
    for rect in greedy_rectangles(&occupied, width, height) {
        if rect.area() == 1 {
            let cell = (u_lo + rect.u as i64, v_lo + rect.v as i64);
            welder.push_face_from(mesh, &mesh.faces[group.cells[&cell]]);
            continue;
        }
        let (positions, uvs) = rect_geometry(key, group, u_lo + rect.u as i64, v_lo + rect.v as i64, rect);
        welder.push_quad(positions, uvs, key.material, key.direction);
        merged += 1;
    }
    merged
}

/// World corners and texture coordinates of a merged rectangle.
fn rect_geometry(
    key: &GroupKey,
    group: &FaceGroup,
    cell_u: i64,
    cell_v: i64,
    rect: GridRect,
) -> ([[f32; 3]; 4], [[f32; 2]; 4]) {
    let (u_axis, v_axis) = group.axis.plane_axes();
    let extent = [rect.width as i64, rect.height as i64];

    let mut positions = [[0.0f32; 3]; 4];
    let mut raw_uvs = [[0i64; 2]; 4];
    for (slot, corner) in key.winding.layout().iter().enumerate() {
        let offset = corner.offset();
        let cells = [offset[0] * extent[0], offset[1] * extent[1]];

        let mut position = [0.0f32; 3];
        position[group.axis.index()] = group.plane;
        position[u_axis.index()] = ((cell_u + cells[0]) as f64 * group.cell_size[0] as f64) as f32;
        position[v_axis.index()] = ((cell_v + cells[1]) as f64 * group.cell_size[1] as f64) as f32;
        positions[slot] = position;
        raw_uvs[slot] = key.frame.project(cells);
    }

    let s_min = raw_uvs.iter().map(|st| st[0]).min().unwrap_or(0);
    let t_min = raw_uvs.iter().map(|st| st[1]).min().unwrap_or(0);
    let uvs = raw_uvs.map(|st| [(st[0] - s_min) as f32, (st[1] - t_min) as f32]);
    (positions, uvs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesher::dedup::MeshDeduplicator;
    use crate::mesher::geometry::{box_mesh, Material, UNIT_UVS};
    use crate::mesher::merge::merge_all;
    use glam::Vec3;
    use proptest::prelude::*;

    fn stone() -> Material {
        Material::new("stone", "block/stone")
    }

    fn cube(at: [i32; 3]) -> MeshBuffer {
        let from = Vec3::new(at[0] as f32, at[1] as f32, at[2] as f32);
        box_mesh(from, from + Vec3::ONE, Direction::ALL, vec![stone()], |_| 0)
    }

    /// A mesh of unit top faces at the given (x, z) cells on plane y = 1.
    fn top_faces(cells: &[(i32, i32)], materials: &[&str]) -> MeshBuffer {
        let mut mesh = MeshBuffer::new();
        for (i, &(x, z)) in cells.iter().enumerate() {
            let name = materials[i % materials.len()];
            let material = mesh.add_material(Material::new(name, format!("block/{}", name)));
            let from = Vec3::new(x as f32, 0.0, z as f32);
            mesh.push_quad(
                crate::mesher::geometry::box_face_positions(Direction::Up, from, from + Vec3::ONE),
                UNIT_UVS,
                material,
                FaceDirection::Up,
            );
        }
        mesh
    }

    fn optimized(mesh: &MeshBuffer) -> MeshBuffer {
        let deduped = MeshDeduplicator::default().dedup(mesh).unwrap();
        greedy_mesh(&deduped).unwrap()
    }

    #[test]
    fn test_winding_classes_are_distinct() {
        let mut layouts = Vec::new();
        for min_slot in 0..4 {
            for u_first in [true, false] {
                let class = WindingClass { min_slot, u_first };
                let layout = class.layout();
                assert_eq!(WindingClass::classify(layout), Some(class));
                layouts.push(layout);
            }
        }
        layouts.sort();
        layouts.dedup();
        assert_eq!(layouts.len(), 8);
    }

    #[test]
    fn test_rectangles_single_cell() {
        let rects = greedy_rectangles(&[true], 1, 1);
        assert_eq!(rects, vec![GridRect { u: 0, v: 0, width: 1, height: 1 }]);
    }

    #[test]
    fn test_rectangles_full_grid() {
        let rects = greedy_rectangles(&[true; 12], 4, 3);
        assert_eq!(rects, vec![GridRect { u: 0, v: 0, width: 4, height: 3 }]);
    }

    #[test]
    fn test_rectangles_l_shape() {
        // xxx
        // x..
        let occupied = [true, true, true, true, false, false];
        let rects = greedy_rectangles(&occupied, 3, 2);
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0], GridRect { u: 0, v: 0, width: 3, height: 1 });
        assert_eq!(rects.iter().map(GridRect::area).sum::<usize>(), 4);
    }

    #[test]
    fn test_rectangles_prefers_largest() {
        // x...
        // xxxx
        // xxxx
        let occupied = [
            true, false, false, false,
            true, true, true, true,
            true, true, true, true,
        ];
        let rects = greedy_rectangles(&occupied, 4, 3);
        assert_eq!(rects[0], GridRect { u: 0, v: 1, width: 4, height: 2 });
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn test_rectangles_checkerboard() {
        let size = 300;
        let occupied: Vec<bool> = (0..size * size).map(|i| (i / size + i % size) % 2 == 0).collect();
        let rects = greedy_rectangles(&occupied, size, size);
        assert_eq!(rects.len(), size * size / 2);
        assert!(rects.iter().all(|r| r.area() == 1));
        assert_eq!(rects[0], GridRect { u: 0, v: 0, width: 1, height: 1 });
        assert_eq!(rects[1], GridRect { u: 2, v: 0, width: 1, height: 1 });
        assert_eq!(rects.last(), Some(&GridRect { u: size - 1, v: size - 1, width: 1, height: 1 }));
    }

    #[test]
    fn test_rectangles_isolated_leftovers_in_scan_order() {
        // xx.x
        // ....
        // x..x
        let occupied = [
            true, true, false, true,
            false, false, false, false,
            true, false, false, true,
        ];
        let rects = greedy_rectangles(&occupied, 4, 3);
        assert_eq!(
            rects,
            vec![
                GridRect { u: 0, v: 0, width: 2, height: 1 },
                GridRect { u: 3, v: 0, width: 1, height: 1 },
                GridRect { u: 0, v: 2, width: 1, height: 1 },
                GridRect { u: 3, v: 2, width: 1, height: 1 },
            ]
        );
    }

    #[test]
    fn test_single_face_passes_through() {
        let mesh = top_faces(&[(0, 0)], &["stone"]);
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 1);
        assert_eq!(out.faces[0].direction, FaceDirection::Up);
    }

    #[test]
    fn test_merge_row() {
        let mesh = top_faces(&[(0, 0), (1, 0), (2, 0), (3, 0)], &["stone"]);
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 1);
        assert_eq!(out.vertex_count(), 4);
        assert!((out.surface_area() - 4.0).abs() < 1e-5);

        let uvs: Vec<[f32; 2]> = out.faces[0].uvs.iter().map(|&i| out.uvs[i as usize]).collect();
        let max_u = uvs.iter().map(|t| t[0]).fold(0.0, f32::max);
        let max_v = uvs.iter().map(|t| t[1]).fold(0.0, f32::max);
        // The texture repeats once per merged cell.
        assert_eq!((max_u.max(max_v), max_u.min(max_v)), (4.0, 1.0));
    }

    #[test]
    fn test_no_merge_different_materials() {
        let mesh = top_faces(&[(0, 0), (1, 0)], &["stone", "dirt"]);
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 2);
    }

    #[test]
    fn test_no_merge_across_planes() {
        let mut mesh = top_faces(&[(0, 0), (1, 0)], &["stone"]);
        let raised = {
            let mut m = top_faces(&[(0, 0), (1, 0)], &["stone"]);
            m.translate([0.0, 1.0, 0.0]);
            m
        };
        crate::mesher::merge::merge_into(&mut mesh, &raised).unwrap();
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 2);
        assert!((out.surface_area() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_animated_material_excluded() {
        let mut mesh = top_faces(&[(0, 0), (1, 0), (2, 0)], &["water_still"]);
        mesh.materials[0].animated = true;
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 3);
    }

    #[test]
    fn test_custom_uvs_excluded() {
        let mut mesh = top_faces(&[(0, 0), (1, 0)], &["stone"]);
        let half = mesh.add_uv([0.5, 0.5]);
        mesh.faces[0].uvs[2] = half;
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 2);
    }

    #[test]
    fn test_do_not_cull_excluded() {
        let mut mesh = top_faces(&[(0, 0), (1, 0)], &["stone"]);
        for face in &mut mesh.faces {
            face.direction = FaceDirection::DoNotCull;
        }
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 2);
    }

    #[test]
    fn test_oversized_group_passes_through() {
        let mesh = top_faces(&[(0, 0), (1, 0), (1500, 0)], &["stone"]);
        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 3);
    }

    #[test]
    fn test_two_adjacent_cubes() {
        let merged = merge_all(vec![cube([0, 0, 0]), cube([1, 0, 0])]).unwrap();
        let deduped = MeshDeduplicator::default().dedup(&merged).unwrap();
        assert_eq!(deduped.face_count(), 10);

        let greedy = greedy_mesh(&deduped).unwrap();
        assert_eq!(greedy.face_count(), 6);
        assert!((greedy.surface_area() - deduped.surface_area()).abs() < 1e-4);
        assert_eq!(greedy.vertex_count(), 8);
    }

    #[test]
    fn test_texture_orientation_is_preserved() {
        // Unit faces whose texture runs along -z (rotated 90 degrees).
        let mut mesh = MeshBuffer::new();
        let material = mesh.add_material(stone());
        for x in 0..3 {
            let from = Vec3::new(x as f32, 0.0, 0.0);
            let positions =
                crate::mesher::geometry::box_face_positions(Direction::Up, from, from + Vec3::ONE);
            // Rotate UVs by one slot relative to the default mapping.
            let uvs = [UNIT_UVS[1], UNIT_UVS[2], UNIT_UVS[3], UNIT_UVS[0]];
            mesh.push_quad(positions, uvs, material, FaceDirection::Up);
        }
        let source_frame = project_face(&mesh, &mesh.faces[0]).unwrap().key.frame;

        let out = optimized(&mesh);
        assert_eq!(out.face_count(), 1);
        // Every cell of the merged face maps to the same texture frame as the
        // source faces, so a 1x1 slice of it would reproduce them exactly.
        let merged = project_face_frame_of(&out);
        assert_eq!(merged, source_frame);
    }

    /// Frame of a merged face, derived from its UV gradients.
    fn project_face_frame_of(mesh: &MeshBuffer) -> TextureFrame {
        let face = &mesh.faces[0];
        let positions = mesh.face_positions(face);
        let uvs = face.uvs.map(|i| mesh.uvs[i as usize]);
        // For an Up face, u = x and v = z.
        let (du_x, dv_x) = gradient(&positions, &uvs, 0);
        let (du_z, dv_z) = gradient(&positions, &uvs, 2);
        let s = [sign(du_x), sign(du_z)];
        let t = [sign(dv_x), sign(dv_z)];
        TextureFrame::from_steps(s, t).unwrap()
    }

    fn sign(value: f32) -> i64 {
        if value.abs() < 1e-6 {
            0
        } else {
            value.signum() as i64
        }
    }

    /// Change of (s, t) between slot 0 and the slot differing only on `axis`.
    fn gradient(positions: &[[f32; 3]; 4], uvs: &[[f32; 2]; 4], axis: usize) -> (f32, f32) {
        let other = if axis == 0 { 2 } else { 0 };
        let j = (1..4)
            .find(|&j| {
                positions[j][axis] != positions[0][axis] && positions[j][other] == positions[0][other]
            })
            .unwrap();
        let delta = positions[j][axis] - positions[0][axis];
        (
            (uvs[j][0] - uvs[0][0]) / delta,
            (uvs[j][1] - uvs[0][1]) / delta,
        )
    }

    proptest! {
        #[test]
        fn prop_greedy_preserves_area(
            cells in prop::collection::hash_set((0i32..12, 0i32..12), 1..60),
        ) {
            let cells: Vec<(i32, i32)> = cells.into_iter().collect();
            let mesh = top_faces(&cells, &["stone"]);
            let out = optimized(&mesh);
            prop_assert!((out.surface_area() - cells.len() as f32).abs() < 1e-3);
            prop_assert!(out.face_count() <= cells.len());
        }
    }
}
