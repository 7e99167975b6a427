//! Work partitioning and the parallel meshing run.
//!
//! The requested region is cut into square groups of columns. Workers pull
//! whole groups through a shared atomic index, mesh every task of a group
//! in order and either fold the result into one shared accumulator or emit
//! it as a standalone deduplicated unit.

use crate::error::{MesherError, Result};
use crate::mesh_output::{ExportOutput, ExportStats, MeshUnit};
use crate::mesher::chunk::ChunkMeshBuilder;
use crate::mesher::geometry::MeshBuffer;
use crate::mesher::lod::LodApproximator;
use crate::mesher::merge::merge_owned;
use crate::mesher::tint::TintProvider;
use crate::mesher::{LodConfig, MeshDeduplicator, MesherConfig};
use crate::registry::Registries;
use crate::resolver::ModelResolver;
use crate::types::{BlockBounds, ColumnPos, WorldSource};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// One section of one column, meshed at one level of detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Task {
    pub column_x: i32,
    pub column_z: i32,
    pub section_y: i32,
    /// 0 for full resolution, otherwise the super-voxel edge (1, 2, 4 or 8).
    pub lod_level: u32,
}

impl Task {
    pub fn column(&self) -> ColumnPos {
        ColumnPos::new(self.column_x, self.column_z)
    }
}

/// A square block of columns processed by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub origin_x: i32,
    pub origin_z: i32,
    pub tasks: Vec<Task>,
}

impl Group {
    pub fn origin(&self) -> ColumnPos {
        ColumnPos::new(self.origin_x, self.origin_z)
    }
}

/// Level of detail for a column from its distance to the configured center.
pub fn lod_level_for(column: ColumnPos, lod: &LodConfig) -> u32 {
    if !lod.enabled {
        return 0;
    }
    let dx = (column.x - lod.center[0]) as i64;
    let dz = (column.z - lod.center[1]) as i64;
    let distance_sq = dx * dx + dz * dz;
    let threshold_sq = |i: usize| (lod.thresholds[i] as i64).pow(2);

    if distance_sq < threshold_sq(0) {
        0
    } else if distance_sq < threshold_sq(1) {
        1
    } else if distance_sq < threshold_sq(2) {
        2
    } else if distance_sq < threshold_sq(3) {
        4
    } else {
        8
    }
}

/// Split the columns and sections touched by `bounds` into groups.
///
/// Groups are aligned to multiples of `partition_size` columns and returned
/// sorted by origin; tasks inside a group are sorted by column, then section.
pub fn partition(bounds: &BlockBounds, config: &MesherConfig) -> Vec<Group> {
    let size = config.partition_size.max(1) as i32;
    let mut groups: BTreeMap<(i32, i32), Vec<Task>> = BTreeMap::new();

    for column_x in bounds.column_range_x() {
        for column_z in bounds.column_range_z() {
            let column = ColumnPos::new(column_x, column_z);
            let lod_level = lod_level_for(column, &config.lod);
            let origin = (
                column_x.div_euclid(size) * size,
                column_z.div_euclid(size) * size,
            );
            let tasks = groups.entry(origin).or_default();
            for section_y in bounds.section_range() {
                tasks.push(Task {
                    column_x,
                    column_z,
                    section_y,
                    lod_level,
                });
            }
        }
    }

    groups
        .into_iter()
        .map(|((origin_x, origin_z), mut tasks)| {
            tasks.sort();
            Group {
                origin_x,
                origin_z,
                tasks,
            }
        })
        .collect()
}

/// Level of detail of every scheduled (column, section).
#[derive(Debug, Clone, Default)]
pub struct LodMap {
    levels: HashMap<(ColumnPos, i32), u32>,
}

impl LodMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: &[Group]) -> Self {
        let mut map = Self::new();
        for task in groups.iter().flat_map(|g| &g.tasks) {
            map.insert(task.column(), task.section_y, task.lod_level);
        }
        map
    }

    pub fn insert(&mut self, column: ColumnPos, section_y: i32, level: u32) {
        self.levels.insert((column, section_y), level);
    }

    /// Level of a unit; units that were never scheduled count as full
    /// resolution.
    pub fn level_at(&self, column: ColumnPos, section_y: i32) -> u32 {
        match self.levels.get(&(column, section_y)) {
            Some(&level) => level,
            None => {
                log::warn!(
                    "no level of detail for column ({}, {}) section {}, using full resolution",
                    column.x,
                    column.z,
                    section_y
                );
                0
            }
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// A configured meshing run over one world.
pub struct WorldMesher<'a> {
    world: &'a dyn WorldSource,
    resolver: &'a dyn ModelResolver,
    config: MesherConfig,
    bounds: BlockBounds,
    groups: Vec<Group>,
    lod_map: LodMap,
    tint: TintProvider,
    registries: Registries,
    accumulator: Mutex<MeshBuffer>,
}

impl<'a> WorldMesher<'a> {
    /// Validate the configuration and plan the run.
    ///
    /// The configuration must carry bounds.
    pub fn new(
        world: &'a dyn WorldSource,
        resolver: &'a dyn ModelResolver,
        config: MesherConfig,
    ) -> Result<Self> {
        config.validate()?;
        let bounds = config.effective_bounds(None).ok_or_else(|| {
            MesherError::InvalidConfig("no bounds to mesh".to_string())
        })?;
        let groups = partition(&bounds, &config);
        let lod_map = LodMap::from_groups(&groups);
        let tint = TintProvider::from_biome(config.biome.as_deref());

        Ok(Self {
            world,
            resolver,
            config,
            bounds,
            groups,
            lod_map,
            tint,
            registries: Registries::new(),
            accumulator: Mutex::new(MeshBuffer::new()),
        })
    }

    pub fn config(&self) -> &MesherConfig {
        &self.config
    }

    /// The bounds actually meshed, after column alignment.
    pub fn bounds(&self) -> &BlockBounds {
        &self.bounds
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    fn deduplicator(&self) -> MeshDeduplicator {
        MeshDeduplicator::new(self.config.strict_dedup)
    }

    /// Mesh a single task in world coordinates.
    pub fn mesh_task(&self, task: &Task) -> Result<MeshBuffer> {
        if task.lod_level == 0 {
            ChunkMeshBuilder::new(self.world, self.resolver, &self.registries, &self.config).build(
                task.column(),
                task.section_y,
                &self.bounds,
            )
        } else {
            LodApproximator::new(self.world, self.resolver, self.bounds, self.config.keep_boundary)
                .with_tint(self.tint.clone())
                .with_lod_map(&self.lod_map)
                .build(task.column(), task.section_y, task.lod_level)
        }
    }

    /// Mesh every task of a group into one buffer.
    pub fn mesh_group(&self, group: &Group) -> Result<MeshBuffer> {
        let mut mesh = MeshBuffer::new();
        for task in &group.tasks {
            merge_owned(&mut mesh, self.mesh_task(task)?)?;
        }
        Ok(mesh)
    }

    /// Run the load phase, then mesh every group.
    ///
    /// Column claims and recorded materials are cleared first, so repeated
    /// exports of one mesher produce the same output.
    pub fn export(&self) -> Result<ExportOutput> {
        self.registries.begin_run();
        *self.accumulator.lock() = MeshBuffer::new();
        let columns: Vec<ColumnPos> = self
            .groups
            .iter()
            .flat_map(|g| g.tasks.iter().map(Task::column))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let workers = self.config.worker_count();
        log::info!(
            "meshing {} columns in {} groups with {} workers",
            columns.len(),
            self.groups.len(),
            workers
        );

        let load_failures = self.load_columns(&columns, workers)?;
        let mut units = self.mesh_groups(workers)?;

        if self.config.partitioned {
            units.sort_by_key(|u| u.origin);
        } else {
            let merged = self
                .deduplicator()
                .optimize(&self.take_accumulator(), self.config.greedy_mesh)?;
            self.registries.materials.record(&merged.materials);
            units = vec![MeshUnit {
                origin: None,
                mesh: merged,
            }];
        }

        let stats = ExportStats {
            columns: columns.len(),
            groups: self.groups.len(),
            tasks: self.groups.iter().map(|g| g.tasks.len()).sum(),
            lod_tasks: self
                .groups
                .iter()
                .flat_map(|g| &g.tasks)
                .filter(|t| t.lod_level > 0)
                .count(),
            load_failures,
            faces: units.iter().map(|u| u.mesh.face_count()).sum(),
            vertices: units.iter().map(|u| u.mesh.vertex_count()).sum(),
            materials: self.registries.materials.len(),
        };
        log::info!(
            "export finished: {} units, {} faces, {} vertices, {} materials",
            units.len(),
            stats.faces,
            stats.vertices,
            stats.materials
        );

        Ok(ExportOutput {
            units,
            materials: self.registries.materials.snapshot(),
            stats,
        })
    }

    /// Call the world's load hook once per column; returns the failure count.
    fn load_columns(&self, columns: &[ColumnPos], workers: usize) -> Result<usize> {
        let next = &AtomicUsize::new(0);
        let failures = &AtomicUsize::new(0);

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers.min(columns.len()).max(1))
                .map(|_| {
                    scope.spawn(move || loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(&column) = columns.get(index) else {
                            break;
                        };
                        if let Err(err) = self.world.load_column(column) {
                            log::warn!("failed to load column ({}, {}): {}", column.x, column.z, err);
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();
            join_all(handles).map(|_| ())
        })?;

        Ok(failures.load(Ordering::Relaxed))
    }

    /// Mesh all groups on `workers` threads.
    ///
    /// Partitioned runs return one unit per group; otherwise the groups are
    /// folded into the shared accumulator and no units are returned.
    fn mesh_groups(&self, workers: usize) -> Result<Vec<MeshUnit>> {
        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let first_error: Mutex<Option<MesherError>> = Mutex::new(None);
        let (next_ref, abort_ref, error_ref) = (&next, &abort, &first_error);

        let units = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers.min(self.groups.len()).max(1))
                .map(|_| {
                    scope.spawn(move || {
                        let mut local = Vec::new();
                        while !abort_ref.load(Ordering::Relaxed) {
                            let index = next_ref.fetch_add(1, Ordering::Relaxed);
                            let Some(group) = self.groups.get(index) else {
                                break;
                            };
                            match self.process_group(group) {
                                Ok(Some(unit)) => local.push(unit),
                                Ok(None) => {}
                                Err(err) => {
                                    log::warn!(
                                        "group ({}, {}) failed: {}",
                                        group.origin_x,
                                        group.origin_z,
                                        err
                                    );
                                    abort_ref.store(true, Ordering::Relaxed);
                                    error_ref.lock().get_or_insert(err);
                                    break;
                                }
                            }
                        }
                        local
                    })
                })
                .collect();
            join_all(handles)
        })?;

        if let Some(err) = first_error.into_inner() {
            return Err(err);
        }
        Ok(units.into_iter().flatten().collect())
    }

    fn process_group(&self, group: &Group) -> Result<Option<MeshUnit>> {
        let mesh = self.mesh_group(group)?;
        if !self.config.partitioned {
            merge_owned(&mut self.accumulator.lock(), mesh)?;
            return Ok(None);
        }

        let mesh = self.deduplicator().optimize(&mesh, self.config.greedy_mesh)?;
        let added = self.registries.materials.record(&mesh.materials);
        log::debug!(
            "group ({}, {}): {} faces, {} new materials",
            group.origin_x,
            group.origin_z,
            mesh.face_count(),
            added
        );
        Ok(Some(MeshUnit {
            origin: Some(group.origin()),
            mesh,
        }))
    }

    fn take_accumulator(&self) -> MeshBuffer {
        std::mem::take(&mut *self.accumulator.lock())
    }
}

/// Join every worker, turning a panic into an error.
fn join_all<T>(handles: Vec<thread::ScopedJoinHandle<'_, T>>) -> Result<Vec<T>> {
    let mut results = Vec::with_capacity(handles.len());
    let mut panicked = false;
    for handle in handles {
        match handle.join() {
            Ok(result) => results.push(result),
            Err(_) => panicked = true,
        }
    }
    if panicked {
        return Err(MesherError::WorkerPanicked);
    }
    Ok(results)
}
