/// Opening meshes from loose files and from archive entries
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffers;

/// Load a mesh, dispatching on the file extension: archive extensions are
/// opened as zip files holding the default mesh entry, anything else is
/// read as a loose PLY file
pub fn load_mesh(path: &Path) -> Result<MeshBuffers> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if constants::ARCHIVE_EXTENSIONS.contains(&extension.as_str()) {
        load_from_archive(path, constants::DEFAULT_MESH_ENTRY)
    } else {
        debug!("reading loose mesh {}", path.display());
        MeshBuffers::from_file(path)
    }
}

/// Load a named mesh entry out of a zip archive
pub fn load_from_archive(archive_path: &Path, entry: &str) -> Result<MeshBuffers> {
    debug!("reading mesh entry '{entry}' from {}", archive_path.display());
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(MeshError::MissingEntry {
                archive: archive_path.to_path_buf(),
                entry: entry.to_string(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    MeshBuffers::from_reader(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const TINY_PLY: &str = "ply\n\
        format ascii 1.0\n\
        element vertex 3\n\
        property float x\n\
        property float y\n\
        property float z\n\
        element face 1\n\
        property list uchar int vertex_index\n\
        end_header\n\
        0 0 0\n1 0 0\n0 1 0\n\
        3 0 1 2\n";

    #[test]
    fn loads_loose_ply_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ply");
        std::fs::write(&path, TINY_PLY).unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count, 3);
        assert_eq!(mesh.face_count, 1);
    }

    #[test]
    fn loads_default_entry_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.zip");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file(constants::DEFAULT_MESH_ENTRY, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(TINY_PLY.as_bytes()).unwrap();
        zip.finish().unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count, 3);
    }

    #[test]
    fn missing_entry_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.zip");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("other.ply", SimpleFileOptions::default()).unwrap();
        zip.write_all(TINY_PLY.as_bytes()).unwrap();
        zip.finish().unwrap();

        let result = load_from_archive(&path, "model0.ply");
        assert!(matches!(
            result,
            Err(MeshError::MissingEntry { entry, .. }) if entry == "model0.ply"
        ));
    }
}
