//! End-to-end ingestion: files on disk and archived entries through to the
//! packed per-face-corner buffer.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use mesh_loader::{MeshBuffers, archive};
use zip::write::SimpleFileOptions;

fn textured_quad_ply() -> String {
    // two textured triangles over four colored vertices
    "ply\n\
     format ascii 1.0\n\
     element vertex 4\n\
     property float x\nproperty float y\nproperty float z\n\
     property float nx\nproperty float ny\nproperty float nz\n\
     property uchar red\nproperty uchar green\nproperty uchar blue\n\
     element face 2\n\
     property list uchar int vertex_index\n\
     property list uchar float texcoord\n\
     property int texnumber\n\
     end_header\n\
     0 0 0 0 0 1 255 255 255 \n\
     2 0 0 0 0 1 255 0 0\n\
     2 2 0 0 0 1 0 255 0\n\
     0 2 0 0 0 1 0 0 255\n\
     3 0 1 2 6 0 0 1 0 1 1 1\n\
     3 0 2 3 6 0 0 1 1 0 1 0\n"
        .to_string()
}

fn write_archive(path: &PathBuf, entry: &str, body: &str) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file(entry, SimpleFileOptions::default()).unwrap();
    zip.write_all(body.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[test]
fn loose_file_packs_every_face_corner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quad.ply");
    std::fs::write(&path, textured_quad_ply()).unwrap();

    let mesh = archive::load_mesh(&path).unwrap();

    assert_eq!(mesh.vertex_count, 4);
    assert_eq!(mesh.face_count, 2);
    assert!(mesh.has_normals && mesh.has_colors && mesh.has_tex_coords);
    assert!(mesh.has_multi_tex);
    assert!(!mesh.is_missing_data());

    // 3 pos + 3 normal + 3 color + 2 uv + 1 texture index per corner
    let stride = mesh.stride_floats();
    assert_eq!(stride, 12);
    assert_eq!(mesh.packed.len(), mesh.face_count * 3 * stride);

    let layout = mesh.layout();
    assert_eq!(layout.position_offset, 0);
    assert_eq!(layout.normal_offset, Some(3));
    assert_eq!(layout.color_offset, Some(6));
    assert_eq!(layout.tex_offset, Some(9));

    // second corner of the first face is vertex 1 with its color and uv
    let corner = &mesh.packed[stride..2 * stride];
    assert_eq!(&corner[0..3], &[2.0, 0.0, 0.0]);
    assert_eq!(&corner[6..9], &[1.0, 0.0, 0.0]);
    assert_eq!(&corner[9..11], &[1.0, 0.0]);
    assert_eq!(corner[11], 1.0);

    // face 2 switches to texture 0 for all three corners
    assert_eq!(mesh.packed[4 * stride - 1], 0.0);
    assert_eq!(mesh.packed[6 * stride - 1], 0.0);

    assert_eq!(mesh.extent, [2.0, 2.0, 0.0]);
    assert_eq!(mesh.unit_scale, 0.5);
    assert_eq!(mesh.packed_bytes().len(), mesh.packed.len() * 4);
}

#[test]
fn archived_default_entry_matches_loose_ingestion() {
    let dir = tempfile::tempdir().unwrap();

    let loose = dir.path().join("quad.ply");
    std::fs::write(&loose, textured_quad_ply()).unwrap();
    let from_file = archive::load_mesh(&loose).unwrap();

    let archived = dir.path().join("quad.zip");
    write_archive(&archived, "model0.ply", &textured_quad_ply());
    let from_zip = archive::load_mesh(&archived).unwrap();

    assert_eq!(from_file.packed, from_zip.packed);
    assert_eq!(from_file.vertex_data, from_zip.vertex_data);
}

#[test]
fn binary_mesh_with_partial_attributes_narrows_the_stride() {
    let header = "ply\n\
        format binary_little_endian 1.0\n\
        element vertex 3\n\
        property float x\nproperty float y\nproperty float z\n\
        property uchar red\nproperty uchar green\nproperty uchar blue\n\
        element face 1\n\
        property list uchar int vertex_index\n\
        end_header\n";
    let mut bytes = header.as_bytes().to_vec();
    let positions = [[0.0f32, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 3.0, 0.0]];
    let colors = [[255u8, 0, 0], [0, 255, 0], [0, 0, 255]];
    for (pos, rgb) in positions.iter().zip(colors) {
        for v in pos {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&rgb);
    }
    bytes.push(3);
    for idx in [0i32, 1, 2] {
        bytes.extend_from_slice(&idx.to_le_bytes());
    }

    let mesh = MeshBuffers::from_reader(std::io::Cursor::new(bytes)).unwrap();
    assert!(!mesh.has_normals);
    assert!(mesh.has_colors);
    // no texcoord property declared, so UVs drop on the first face
    assert!(!mesh.has_tex_coords);
    assert!(mesh.is_missing_data());
    assert_eq!(mesh.stride_floats(), 6);
    assert_eq!(mesh.packed.len(), 1 * 3 * 6);
    assert_eq!(&mesh.packed[3..6], &[1.0, 0.0, 0.0]);
}
