/// Parsing of PhotoScan project documents (.psx/.psz) into an entity graph.
///
/// A project is a multi-file XML document: the primary file references
/// sibling files and archive entries through `path` attributes, which are
/// followed transparently while building one logical tree of chunks,
/// sensors, cameras, images and model references. Phase progress ranks are
/// derived from the built tree for display by an external UI.
pub mod builder;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod props;
pub mod source;
pub mod status;

pub use builder::ParseContext;
pub use error::{Error, Result};
pub use model::{
    Camera, Chunk, Image, ModelRef, ProjectDocument, Sensor,
};
pub use status::ChunkStatus;
