//! Error types for the world mesher.

use thiserror::Error;

/// Result type alias using MesherError.
pub type Result<T> = std::result::Result<T, MesherError>;

/// Main error type for world meshing operations.
#[derive(Error, Debug)]
pub enum MesherError {
    /// I/O error while reading configuration or world files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration values that cannot produce a valid run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A quad references an index outside its buffer.
    ///
    /// This is an invariant violation: the task that produced the geometry
    /// is aborted rather than emitting a corrupt mesh.
    #[error("Index {index} out of range for {buffer} buffer of length {len}")]
    IndexOutOfRange {
        /// Which buffer was indexed ("vertex", "uv" or "material").
        buffer: &'static str,
        index: usize,
        len: usize,
    },

    /// World data that references missing palette entries.
    #[error("Invalid world: {0}")]
    InvalidWorld(String),

    /// A world source failed to load a column.
    #[error("Column load error: {0}")]
    ColumnLoad(String),

    /// A worker thread panicked while meshing.
    #[error("Mesh worker panicked")]
    WorkerPanicked,
}
