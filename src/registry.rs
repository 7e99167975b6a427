//! Run-scoped shared state.
//!
//! Everything mesh workers share lives here, behind its own lock, and is
//! owned by the run that created it.

use crate::mesher::geometry::{Material, MeshBuffer};
use crate::resolver::ModelResolver;
use crate::types::{BlockInfo, ColumnPos};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Resolved block geometry, keyed by namespaced block name.
#[derive(Debug, Default)]
pub struct GeometryCache {
    models: RwLock<HashMap<String, Arc<MeshBuffer>>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached geometry for a block, resolving it on first use.
    pub fn get_or_resolve(&self, info: &BlockInfo, resolver: &dyn ModelResolver) -> Arc<MeshBuffer> {
        if let Some(mesh) = self.models.read().get(&info.name) {
            return Arc::clone(mesh);
        }
        // Resolve outside the lock; a racing worker may resolve the same
        // block, and the first insert wins.
        let resolved = Arc::new(resolver.resolve_model(info.namespace(), info.block_id()));
        let mut models = self.models.write();
        Arc::clone(models.entry(info.name.clone()).or_insert(resolved))
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Columns whose decorative entities have already been emitted.
#[derive(Debug, Default)]
pub struct ProcessedColumns {
    claimed: Mutex<HashSet<ColumnPos>>,
}

impl ProcessedColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a column; true for exactly one caller per column.
    pub fn claim(&self, column: ColumnPos) -> bool {
        self.claimed.lock().insert(column)
    }

    pub fn clear(&self) {
        self.claimed.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Materials seen across all emitted units, by name.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    materials: Mutex<BTreeMap<String, Material>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the materials of a mesh; returns how many were new.
    pub fn record(&self, materials: &[Material]) -> usize {
        let mut known = self.materials.lock();
        let mut added = 0;
        for material in materials {
            if !known.contains_key(&material.name) {
                known.insert(material.name.clone(), material.clone());
                added += 1;
            }
        }
        added
    }

    /// All recorded materials, sorted by name.
    pub fn snapshot(&self) -> Vec<Material> {
        self.materials.lock().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.materials.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.materials.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The registries of one meshing run.
#[derive(Debug, Default)]
pub struct Registries {
    pub geometry: GeometryCache,
    pub processed_columns: ProcessedColumns,
    pub materials: MaterialRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the per-run state. Resolved geometry only depends on the
    /// resolver and is kept.
    pub fn begin_run(&self) {
        self.processed_columns.clear();
        self.materials.clear();
    }
}
