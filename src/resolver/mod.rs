//! Block model resolution.
//!
//! Deciding which geometry represents a block type (blockstates, model
//! inheritance, texture lookup) is delegated to a [`ModelResolver`]. The
//! mesher only ever asks for a finished [`MeshBuffer`] in local block
//! coordinates `[0, 1]^3`.

pub mod model_resolver;

pub use model_resolver::CubeModelResolver;

use crate::mesher::geometry::MeshBuffer;
use crate::mesher::liquid;
use crate::types::Direction;

/// Source of block geometry and texture colors.
///
/// Implementations are shared by every mesh worker.
pub trait ModelResolver: Sync {
    /// Geometry of a block in local coordinates. An unknown block resolves to
    /// an empty mesh.
    fn resolve_model(&self, namespace: &str, name: &str) -> MeshBuffer;

    /// Surface of a fluid cell from its ten neighborhood levels.
    fn synthesize_fluid_surface(&self, levels: &[i8; 10]) -> MeshBuffer {
        liquid::synthesize_fluid_surface(levels)
    }

    /// Bind the materials of a synthesized fluid surface to a block.
    fn assign_fluid_materials(&self, mesh: &mut MeshBuffer, block_name: &str) {
        liquid::assign_fluid_materials(mesh, block_name)
    }

    /// Averaged sRGB texture color of one face of a block.
    fn average_color(&self, _namespace: &str, _name: &str, _face: Direction) -> Option<[f32; 3]> {
        None
    }
}
