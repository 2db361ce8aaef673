//! Asset formats: TGA images and Wavefront OBJ meshes.
//! `tga` and `obj` are independent codecs; `mesh` and `texture` turn their
//! output into upload-ready buffers.

pub mod mesh;
pub mod obj;
pub mod tga;
pub mod texture;

pub use corelib::{FormatError, FormatResult};
