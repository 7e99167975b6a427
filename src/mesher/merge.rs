//! Low-level mesh concatenation.
//!
//! Appends one [`MeshBuffer`] onto another, remapping vertex, UV and material
//! indices. Materials are unified by name; nothing else is deduplicated.

use crate::error::Result;
use crate::mesher::geometry::MeshBuffer;

/// Append `src` onto `dst`.
///
/// `src` is validated first so that a corrupt buffer never leaks into an
/// accumulator.
pub fn merge_into(dst: &mut MeshBuffer, src: &MeshBuffer) -> Result<()> {
    src.validate()?;
    append(dst, src);
    Ok(())
}

/// Append `src` onto `dst`, taking ownership of its storage when `dst` is empty.
pub fn merge_owned(dst: &mut MeshBuffer, src: MeshBuffer) -> Result<()> {
    src.validate()?;
    let untouched = dst.vertices.is_empty()
        && dst.uvs.is_empty()
        && dst.faces.is_empty()
        && dst.materials.is_empty();
    if untouched {
        *dst = src;
    } else {
        append(dst, &src);
    }
    Ok(())
}

/// Concatenate many meshes into one.
pub fn merge_all(meshes: impl IntoIterator<Item = MeshBuffer>) -> Result<MeshBuffer> {
    let mut merged = MeshBuffer::new();
    for mesh in meshes {
        merge_owned(&mut merged, mesh)?;
    }
    Ok(merged)
}

fn append(dst: &mut MeshBuffer, src: &MeshBuffer) {
    let vertex_offset = dst.vertices.len() as u32;
    let uv_offset = dst.uvs.len() as u32;

    let material_map: Vec<u32> = src
        .materials
        .iter()
        .map(|material| dst.add_material(material.clone()))
        .collect();

    dst.vertices.extend_from_slice(&src.vertices);
    dst.uvs.extend_from_slice(&src.uvs);
    dst.faces.reserve(src.faces.len());

    for face in &src.faces {
        let mut face = *face;
        face.vertices = face.vertices.map(|i| i + vertex_offset);
        face.uvs = face.uvs.map(|i| i + uv_offset);
        face.material = material_map[face.material as usize];
        dst.faces.push(face);
    }
}
