//! CPU-side triangle list unpacked from parsed OBJ data.

use corelib::{FormatError, FormatResult};

use crate::obj::ObjData;

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Triangle list: three vertices per face, indices `0..vertices.len()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Dereference every face corner of `obj` (1-based indices). Missing UVs
    /// and normals become zero.
    pub fn from_obj(obj: &ObjData) -> FormatResult<Self> {
        let mut vertices = Vec::with_capacity(obj.faces().len() * 3);

        for (face_idx, face) in obj.faces().iter().enumerate() {
            for corner in &face.corners {
                let Some(vertex) = corner.vertex else {
                    return Err(FormatError::DanglingIndex {
                        face: face_idx,
                        attribute: "vertex",
                        index: 0,
                        len: obj.vertices().len(),
                    });
                };
                let p = lookup(obj.vertices(), face_idx, "vertex", vertex)?;
                let position = [p.x, p.y, p.z];

                let uv = match corner.uv {
                    Some(i) => {
                        let t = lookup(obj.uvs(), face_idx, "uv", i)?;
                        [t.x, t.y]
                    }
                    None => [0.0, 0.0],
                };

                let normal = match corner.normal {
                    Some(i) => {
                        let n = lookup(obj.normals(), face_idx, "normal", i)?;
                        [n.x, n.y, n.z]
                    }
                    None => [0.0, 0.0, 0.0],
                };

                vertices.push(MeshVertex::new(position, normal, uv));
            }
        }

        let count = u32::try_from(vertices.len()).map_err(|_| FormatError::UnsupportedFormat {
            reason: format!("too many vertices in mesh (>{})", u32::MAX),
        })?;
        Ok(Self::new(vertices, (0..count).collect()))
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn lookup<T: Copy>(
    items: &[T],
    face: usize,
    attribute: &'static str,
    index: u32,
) -> FormatResult<T> {
    (index as usize)
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .copied()
        .ok_or(FormatError::DanglingIndex {
            face,
            attribute,
            index,
            len: items.len(),
        })
}
