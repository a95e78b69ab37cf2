/// Mesh ingestion: PLY element streams into render-ready packed buffers.
///
/// A mesh is read from a loose file or an archive entry, vertex and face
/// attributes are auto-detected from the header and the first elements,
/// and the result is a flat per-face-corner interleaved buffer plus the
/// bounds and unit scale an external renderer needs to normalize it.
pub mod archive;
pub mod elements;
pub mod error;
pub mod header;
pub mod mesh;

pub use error::{MeshError, Result};
pub use header::{ElementDecl, Format, Header, Property, PropertyKind, ScalarType};
pub use mesh::{MeshBuffers, PackedLayout};
