/// Vertex/face ingestion and per-face-corner buffer packing
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use crate::elements::{Row, read_row, row_value};
use crate::error::{MeshError, Result};
use crate::header::{ElementDecl, Format, Header};

/// Float offsets of each attribute inside one packed corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedLayout {
    pub stride_floats: usize,
    pub position_offset: usize,
    pub normal_offset: Option<usize>,
    pub color_offset: Option<usize>,
    pub tex_offset: Option<usize>,
}

/// Validated, render-ready mesh buffers.
///
/// `vertex_data` interleaves position plus whichever optional attributes
/// survived ingestion; `packed` duplicates vertices per face corner with UV
/// and texture index appended. Optional attributes are all-or-nothing: the
/// first vertex or face that fails to provide one disables it for the whole
/// mesh, and data already collected for it is dropped.
#[derive(Debug, Clone)]
pub struct MeshBuffers {
    pub vertex_count: usize,
    pub face_count: usize,
    pub vertex_data: Vec<f32>,
    pub faces: Vec<u32>,
    pub face_uv: Vec<f32>,
    pub face_tex: Vec<u32>,
    pub packed: Vec<f32>,
    pub has_normals: bool,
    pub has_colors: bool,
    pub has_tex_coords: bool,
    pub has_multi_tex: bool,
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub extent: [f32; 3],
    pub center: [f32; 3],
    pub unit_scale: f32,
    coord_names: [String; 3],
    index_name: String,
}

impl MeshBuffers {
    fn new() -> MeshBuffers {
        MeshBuffers {
            vertex_count: 0,
            face_count: 0,
            vertex_data: Vec::new(),
            faces: Vec::new(),
            face_uv: Vec::new(),
            face_tex: Vec::new(),
            packed: Vec::new(),
            has_normals: true,
            has_colors: true,
            has_tex_coords: true,
            has_multi_tex: true,
            min: [0.0; 3],
            max: [0.0; 3],
            extent: [0.0; 3],
            center: [0.0; 3],
            unit_scale: 1.0,
            coord_names: ["x".to_string(), "y".to_string(), "z".to_string()],
            index_name: "vertex_index".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<MeshBuffers> {
        MeshBuffers::from_reader(BufReader::new(File::open(path)?))
    }

    /// Ingest a PLY stream: header, element rows in stream order, then the
    /// packed buffer
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<MeshBuffers> {
        let header = Header::parse(&mut reader)?;
        let mut mesh = MeshBuffers::new();

        for decl in &header.elements {
            match decl.name.as_str() {
                "vertex" => mesh.read_vertices(&mut reader, header.format, decl)?,
                "face" => mesh.read_faces(&mut reader, header.format, decl)?,
                other => {
                    debug!("skipping {} '{other}' elements", decl.count);
                    for _ in 0..decl.count {
                        read_row(&mut reader, header.format, decl)?;
                    }
                }
            }
        }

        mesh.build_packed();
        Ok(mesh)
    }

    /// Interleaved floats per vertex in `vertex_data`
    pub fn vertex_stride(&self) -> usize {
        3 + if self.has_normals { 3 } else { 0 } + if self.has_colors { 3 } else { 0 }
    }

    /// Floats per packed corner
    pub fn stride_floats(&self) -> usize {
        self.vertex_stride() + if self.has_tex_coords { 3 } else { 0 }
    }

    pub fn layout(&self) -> PackedLayout {
        let mut offset = 3;
        let normal_offset = self.has_normals.then(|| {
            let o = offset;
            offset += 3;
            o
        });
        let color_offset = self.has_colors.then(|| {
            let o = offset;
            offset += 3;
            o
        });
        let tex_offset = self.has_tex_coords.then_some(offset);
        PackedLayout {
            stride_floats: self.stride_floats(),
            position_offset: 0,
            normal_offset,
            color_offset,
            tex_offset,
        }
    }

    /// Packed buffer as raw bytes for upload by an external renderer
    pub fn packed_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.packed)
    }

    pub fn is_missing_data(&self) -> bool {
        !self.has_normals || !self.has_colors || !self.has_tex_coords
    }

    /// Non-fatal structural warnings: non-standard property names
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.coord_names != ["x", "y", "z"] {
            warnings.push(format!(
                "file uses non-standard name for one or more vertex coordinate \
                 properties [{}, {}, {}]",
                self.coord_names[0], self.coord_names[1], self.coord_names[2]
            ));
        }
        if self.index_name != "vertex_index" && self.index_name != "vertex_indices" {
            warnings.push(format!(
                "file uses non-standard name for face vertex index [{}]",
                self.index_name
            ));
        }
        warnings
    }

    fn read_vertices<R: BufRead>(
        &mut self,
        reader: &mut R,
        format: Format,
        decl: &ElementDecl,
    ) -> Result<()> {
        self.vertex_count = decl.count;
        if decl.count == 0 {
            return Ok(());
        }
        if decl.properties.len() < 3 {
            return Err(MeshError::Data(
                "vertex element declares fewer than three properties".to_string(),
            ));
        }

        // The first three property names are taken as X, Y and Z whatever
        // they are actually called
        for (slot, property) in self.coord_names.iter_mut().zip(&decl.properties) {
            *slot = property.name.clone();
        }

        self.min = [f32::MAX; 3];
        self.max = [f32::MIN; 3];
        self.vertex_data.reserve(decl.count * 9);

        for i in 0..decl.count {
            let row = read_row(reader, format, decl)?;

            let mut pos = [0f32; 3];
            for (axis, name) in self.coord_names.iter().enumerate() {
                let value = row_value(decl, &row, name)
                    .and_then(|v| v.as_scalar())
                    .ok_or_else(|| {
                        MeshError::Data(format!("vertex {i} is missing coordinate '{name}'"))
                    })?;
                pos[axis] = value as f32;
            }
            for axis in 0..3 {
                if pos[axis] < self.min[axis] {
                    self.min[axis] = pos[axis];
                }
                if pos[axis] > self.max[axis] {
                    self.max[axis] = pos[axis];
                }
            }
            self.vertex_data.extend_from_slice(&pos);

            if self.has_normals {
                match scalar_triple(decl, &row, ["nx", "ny", "nz"]) {
                    Some(normal) => self.vertex_data.extend_from_slice(&normal),
                    None => {
                        warn!("vertex {i} has no normal, dropping normals for all vertices");
                        let old_width = 6 + if self.has_colors { 3 } else { 0 };
                        self.has_normals = false;
                        strip_triple(&mut self.vertex_data, i, old_width, 3);
                    }
                }
            }

            if self.has_colors {
                match scalar_triple(decl, &row, ["red", "green", "blue"]) {
                    Some(rgb) => {
                        // colors are byte-valued in the wild; normalize
                        self.vertex_data
                            .extend(rgb.iter().map(|c| c / 255.0));
                    }
                    None => {
                        warn!("vertex {i} has no color, dropping colors for all vertices");
                        let old_width = 6 + if self.has_normals { 3 } else { 0 };
                        let offset = if self.has_normals { 6 } else { 3 };
                        self.has_colors = false;
                        strip_triple(&mut self.vertex_data, i, old_width, offset);
                    }
                }
            }
        }

        let mut max_dim = f32::MIN;
        for axis in 0..3 {
            self.extent[axis] = self.max[axis] - self.min[axis];
            self.center[axis] = (self.max[axis] + self.min[axis]) / 2.0;
            if self.extent[axis] > max_dim {
                max_dim = self.extent[axis];
            }
        }
        if max_dim > 0.0 {
            self.unit_scale = 1.0 / max_dim;
        }
        Ok(())
    }

    fn read_faces<R: BufRead>(
        &mut self,
        reader: &mut R,
        format: Format,
        decl: &ElementDecl,
    ) -> Result<()> {
        self.face_count = decl.count;
        if decl.count == 0 {
            return Ok(());
        }
        let Some(first) = decl.properties.first() else {
            return Err(MeshError::Data(
                "face element declares no properties".to_string(),
            ));
        };
        // The first property is taken as the vertex index list
        self.index_name = first.name.clone();

        self.faces.reserve(decl.count * 3);

        for i in 0..decl.count {
            let row = read_row(reader, format, decl)?;

            match row_value(decl, &row, &self.index_name).and_then(|v| v.as_list()) {
                Some(indices) if indices.len() == 3 => {
                    self.faces.extend(indices.iter().map(|v| *v as u32));
                }
                // A malformed face keeps its slot so per-face arrays stay
                // index-aligned
                _ => {
                    warn!("face {i} is not a triangle, substituting a degenerate face");
                    self.faces.extend_from_slice(&[0, 0, 0]);
                }
            }

            if self.has_tex_coords {
                match row_value(decl, &row, "texcoord").and_then(|v| v.as_list()) {
                    Some(uv) => {
                        for corner in 0..6 {
                            self.face_uv.push(uv.get(corner).copied().unwrap_or(0.0) as f32);
                        }
                    }
                    None => {
                        warn!("face {i} has no texcoord, dropping UVs for all faces");
                        self.has_tex_coords = false;
                        self.face_uv.clear();
                    }
                }
            }

            if self.has_multi_tex {
                match row_value(decl, &row, "texnumber").and_then(|v| v.as_scalar()) {
                    Some(tex) => self.face_tex.push(tex as u32),
                    None => {
                        warn!("face {i} has no texnumber, dropping texture indices");
                        self.has_multi_tex = false;
                        self.face_tex.clear();
                    }
                }
            }
        }
        Ok(())
    }

    /// Emit the flat per-face-corner buffer: each corner carries the full
    /// vertex tuple, then its UV pair and the face's texture index. The
    /// texture index is refreshed only on the first corner of each face.
    fn build_packed(&mut self) {
        let vertex_stride = self.vertex_stride();
        let stride = self.stride_floats();
        self.packed = Vec::with_capacity(self.face_count * 3 * stride);

        let mut cur_tex = 0u32;
        for (corner, index) in self.faces.iter().enumerate() {
            let base = *index as usize * vertex_stride;
            match self.vertex_data.get(base..base + vertex_stride) {
                Some(tuple) => self.packed.extend_from_slice(tuple),
                None => {
                    warn!("face corner references vertex {index} out of range");
                    self.packed.extend(std::iter::repeat_n(0.0, vertex_stride));
                }
            }

            if self.has_tex_coords {
                self.packed.push(self.face_uv[corner * 2]);
                self.packed.push(self.face_uv[corner * 2 + 1]);
                if self.has_multi_tex && corner % 3 == 0 {
                    cur_tex = self.face_tex[corner / 3];
                }
                self.packed.push(cur_tex as f32);
            }
        }
    }
}

/// Probe three named scalars; any one missing fails the whole triple
fn scalar_triple(decl: &ElementDecl, row: &Row, names: [&str; 3]) -> Option<[f32; 3]> {
    let mut triple = [0f32; 3];
    for (slot, name) in triple.iter_mut().zip(names) {
        *slot = row_value(decl, row, name)?.as_scalar()? as f32;
    }
    Some(triple)
}

/// Remove a three-float component from every already-complete vertex,
/// narrowing the interleave width after a mid-file disablement
fn strip_triple(data: &mut Vec<f32>, complete: usize, old_width: usize, offset: usize) {
    if complete == 0 {
        return;
    }
    let mut compact = Vec::with_capacity(data.len() - complete * 3);
    for v in 0..complete {
        let base = v * old_width;
        compact.extend_from_slice(&data[base..base + offset]);
        compact.extend_from_slice(&data[base + offset + 3..base + old_width]);
    }
    // partial tail of the vertex being read right now
    compact.extend_from_slice(&data[complete * old_width..]);
    *data = compact;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ascii_mesh(vertex_props: &str, vertices: &str, face_props: &str, faces: &str) -> String {
        let vertex_count = vertices.trim().lines().count();
        let face_count = faces.trim().lines().count();
        format!(
            "ply\nformat ascii 1.0\n\
             element vertex {vertex_count}\n{vertex_props}\
             element face {face_count}\n{face_props}\
             end_header\n{vertices}{faces}"
        )
    }

    const POS_PROPS: &str = "property float x\nproperty float y\nproperty float z\n";

    #[test]
    fn positions_only_mesh_packs_bare_triples() {
        let text = ascii_mesh(
            POS_PROPS,
            "0 0 0\n1 0 0\n0 2 0\n",
            "property list uchar int vertex_index\n",
            "3 0 1 2\n",
        );
        let mesh = MeshBuffers::from_reader(Cursor::new(text)).unwrap();

        assert!(!mesh.has_normals);
        assert!(!mesh.has_colors);
        assert!(!mesh.has_tex_coords);
        assert_eq!(mesh.vertex_stride(), 3);
        assert_eq!(mesh.stride_floats(), 3);
        assert_eq!(mesh.packed.len(), 1 * 3 * 3);

        assert_eq!(mesh.extent, [1.0, 2.0, 0.0]);
        assert_eq!(mesh.center, [0.5, 1.0, 0.0]);
        assert_eq!(mesh.unit_scale, 0.5);
        assert!(mesh.validate().is_empty());
    }

    #[test]
    fn full_attribute_mesh_keeps_everything() {
        let text = ascii_mesh(
            "property float x\nproperty float y\nproperty float z\n\
             property float nx\nproperty float ny\nproperty float nz\n\
             property uchar red\nproperty uchar green\nproperty uchar blue\n",
            "0 0 0 0 0 1 255 0 0\n1 0 0 0 0 1 0 255 0\n0 1 0 0 0 1 0 0 255\n",
            "property list uchar int vertex_index\n\
             property list uchar float texcoord\n\
             property int texnumber\n",
            "3 0 1 2 6 0 0 1 0 0 1 7\n",
        );
        let mesh = MeshBuffers::from_reader(Cursor::new(text)).unwrap();

        assert!(mesh.has_normals && mesh.has_colors && mesh.has_tex_coords);
        assert!(mesh.has_multi_tex);
        assert_eq!(mesh.stride_floats(), 12);
        assert_eq!(mesh.packed.len(), 3 * 12);

        // first corner: position, normal, color/255, uv, texnumber
        assert_eq!(&mesh.packed[0..3], &[0.0, 0.0, 0.0]);
        assert_eq!(&mesh.packed[3..6], &[0.0, 0.0, 1.0]);
        assert_eq!(&mesh.packed[6..9], &[1.0, 0.0, 0.0]);
        assert_eq!(&mesh.packed[9..11], &[0.0, 0.0]);
        assert_eq!(mesh.packed[11], 7.0);
        // texture index repeats on the remaining corners
        assert_eq!(mesh.packed[23], 7.0);
        assert_eq!(mesh.packed[35], 7.0);
    }

    #[test]
    fn first_vertex_missing_normal_disables_normals_for_all() {
        // nx declared but absent from the first row (short ascii row)
        let text = ascii_mesh(
            "property float x\nproperty float y\nproperty float z\n\
             property float nx\nproperty float ny\nproperty float nz\n",
            "0 0 0\n1 0 0 0 0 1\n0 1 0 0 0 1\n",
            "property list uchar int vertex_index\n",
            "3 0 1 2\n",
        );
        let mesh = MeshBuffers::from_reader(Cursor::new(text)).unwrap();
        assert!(!mesh.has_normals);
        assert_eq!(mesh.vertex_stride(), 3);
        assert_eq!(mesh.vertex_data.len(), 3 * 3);
        assert!(mesh.is_missing_data());
    }

    #[test]
    fn mid_file_disablement_compacts_earlier_vertices() {
        let text = ascii_mesh(
            "property float x\nproperty float y\nproperty float z\n\
             property float nx\nproperty float ny\nproperty float nz\n",
            "0 0 0 9 9 9\n1 0 0 8 8 8\n0 1 0\n",
            "property list uchar int vertex_index\n",
            "3 0 1 2\n",
        );
        let mesh = MeshBuffers::from_reader(Cursor::new(text)).unwrap();
        assert!(!mesh.has_normals);
        // the normals already stored for vertices 0 and 1 are gone
        assert_eq!(
            mesh.vertex_data,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn non_triangular_face_becomes_degenerate_and_stays_aligned() {
        let text = ascii_mesh(
            POS_PROPS,
            "0 0 0\n1 0 0\n0 1 0\n1 1 0\n",
            "property list uchar int vertex_index\nproperty int texnumber\n",
            "4 0 1 2 3 1\n3 1 2 3 2\n",
        );
        let mesh = MeshBuffers::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(mesh.face_count, 2);
        assert_eq!(&mesh.faces[0..3], &[0, 0, 0]);
        assert_eq!(&mesh.faces[3..6], &[1, 2, 3]);
        // the degenerate face still occupies texture slot 0
        assert_eq!(mesh.face_tex, vec![1, 2]);
    }

    #[test]
    fn packing_invariant_holds() {
        let text = ascii_mesh(
            "property float x\nproperty float y\nproperty float z\n\
             property uchar red\nproperty uchar green\nproperty uchar blue\n",
            "0 0 0 1 2 3\n1 0 0 4 5 6\n0 1 0 7 8 9\n1 1 0 10 11 12\n",
            "property list uchar int vertex_index\n\
             property list uchar float texcoord\n",
            "3 0 1 2 6 0 0 1 0 0 1\n3 1 3 2 6 1 0 1 1 0 1\n",
        );
        let mesh = MeshBuffers::from_reader(Cursor::new(text)).unwrap();
        assert!(!mesh.has_normals);
        assert!(mesh.has_colors && mesh.has_tex_coords);
        let stride = 3 + 3 + 3;
        assert_eq!(mesh.stride_floats(), stride);
        assert_eq!(mesh.packed.len(), mesh.face_count * 3 * stride);
        assert_eq!(mesh.packed_bytes().len(), mesh.packed.len() * 4);
    }

    #[test]
    fn non_standard_coordinate_names_warn_but_parse() {
        let text = ascii_mesh(
            "property float posx\nproperty float posy\nproperty float posz\n",
            "0 0 0\n2 0 0\n0 2 0\n",
            "property list uchar int vertex_index\n",
            "3 0 1 2\n",
        );
        let mesh = MeshBuffers::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(mesh.vertex_count, 3);
        assert_eq!(mesh.unit_scale, 0.5);
        let warnings = mesh.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("posx"));
    }

    #[test]
    fn binary_little_endian_round() {
        let header = "ply\nformat binary_little_endian 1.0\n\
            element vertex 3\n\
            property float x\nproperty float y\nproperty float z\n\
            element face 1\n\
            property list uchar int vertex_index\n\
            end_header\n";
        let mut bytes = header.as_bytes().to_vec();
        for v in [
            0.0f32, 0.0, 0.0, //
            4.0, 0.0, 0.0, //
            0.0, 4.0, 0.0,
        ] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.push(3);
        for idx in [0i32, 1, 2] {
            bytes.extend_from_slice(&idx.to_le_bytes());
        }

        let mesh = MeshBuffers::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(mesh.vertex_count, 3);
        assert_eq!(mesh.faces, vec![0, 1, 2]);
        assert_eq!(mesh.unit_scale, 0.25);
        assert_eq!(mesh.packed.len(), 3 * 3);
    }
}
