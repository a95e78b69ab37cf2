/// Report generation for inspected projects.
///
/// Summaries serialize to JSON for downstream tooling and render as
/// indented text for the console.
use std::fmt::Write as _;
use std::path::PathBuf;

use mesh_loader::MeshBuffers;
use project_parser::{Chunk, ProjectDocument};
use serde::Serialize;

/// One inspected project: identity plus a summary per chunk
#[derive(Serialize, Debug)]
pub struct ProjectSummary {
    pub source: PathBuf,
    pub version: String,
    pub chunk_count: usize,
    pub active_chunk: usize,
    pub chunks: Vec<ChunkSummary>,
}

#[derive(Serialize, Debug)]
pub struct ChunkSummary {
    pub id: i64,
    pub label: String,
    pub enabled: bool,
    pub status: String,
    pub status_short: String,
    pub camera_count: usize,
    pub image_count: usize,
    pub sensor_count: i64,
    pub depth_image_count: i64,
    pub alignment: PhaseSummary,
    pub dense_cloud: PhaseSummary,
    pub model_generation: PhaseSummary,
    pub texture_generation: PhaseSummary,
    pub optimize_flags: String,
    pub mesh: Option<MeshRefSummary>,
}

/// One processing phase: quality rank 0 (best) to 4, 5 meaning no data
#[derive(Serialize, Debug)]
pub struct PhaseSummary {
    pub rank: u8,
    pub detail: String,
    pub duration_seconds: f64,
}

/// Mesh metadata as recorded in the project document
#[derive(Serialize, Debug)]
pub struct MeshRefSummary {
    pub mesh_path: String,
    pub archive_file: Option<PathBuf>,
    pub face_count: i64,
    pub vertex_count: i64,
    pub has_vertex_colors: bool,
    pub has_uv: bool,
    pub texture_count: usize,
}

/// Loaded mesh statistics, reported only when mesh loading is requested
#[derive(Serialize, Debug)]
pub struct MeshSummary {
    pub vertex_count: usize,
    pub face_count: usize,
    pub has_normals: bool,
    pub has_colors: bool,
    pub has_tex_coords: bool,
    pub packed_floats: usize,
    pub unit_scale: f32,
    pub warnings: Vec<String>,
}

impl ProjectSummary {
    pub fn from_document(document: &ProjectDocument) -> ProjectSummary {
        ProjectSummary {
            source: document.source.clone(),
            version: document.version.clone(),
            chunk_count: document.chunk_count(),
            active_chunk: document.active_chunk_index(),
            chunks: document.chunks.iter().map(ChunkSummary::from_chunk).collect(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Project: {} (version {})",
            self.source.display(),
            if self.version.is_empty() { "?" } else { &self.version }
        );
        let _ = writeln!(out, "  Chunks: {}", self.chunk_count);
        for chunk in &self.chunks {
            let _ = writeln!(out, "\tChunk ID: {}, Label: {}", chunk.id, chunk.label);
            let _ = writeln!(
                out,
                "\t  Status: {} [{}]",
                chunk.status, chunk.status_short
            );
            let _ = writeln!(
                out,
                "\t  Images: {} ({} cameras, {} sensors, {} depth maps)",
                chunk.image_count,
                chunk.camera_count,
                chunk.sensor_count,
                chunk.depth_image_count
            );
            for (name, phase) in [
                ("Alignment", &chunk.alignment),
                ("Dense Cloud", &chunk.dense_cloud),
                ("Model Generation", &chunk.model_generation),
                ("Texture Generation", &chunk.texture_generation),
            ] {
                let _ = writeln!(
                    out,
                    "\t  {}: {} (rank {}, {:.1}s)",
                    name, phase.detail, phase.rank, phase.duration_seconds
                );
            }
            if !chunk.optimize_flags.is_empty() {
                let _ = writeln!(out, "\t  Optimized: {}", chunk.optimize_flags);
            }
            if let Some(mesh) = &chunk.mesh {
                let _ = writeln!(
                    out,
                    "\t  Mesh: {} ({} faces, {} vertices, {} textures)",
                    mesh.mesh_path, mesh.face_count, mesh.vertex_count, mesh.texture_count
                );
            }
        }
        out
    }
}

impl ChunkSummary {
    pub fn from_chunk(chunk: &Chunk) -> ChunkSummary {
        ChunkSummary {
            id: chunk.id,
            label: chunk.label.clone(),
            enabled: chunk.enabled,
            status: chunk.status.description().to_string(),
            status_short: chunk.status.short_name().to_string(),
            camera_count: chunk.camera_count(),
            image_count: chunk.image_count(),
            sensor_count: chunk.sensor_count,
            depth_image_count: chunk.dense.images_used,
            alignment: PhaseSummary {
                rank: chunk.alignment_rank(),
                detail: chunk.describe_alignment_phase(),
                duration_seconds: chunk.alignment.match_duration + chunk.alignment.align_duration,
            },
            dense_cloud: PhaseSummary {
                rank: chunk.dense_rank(),
                detail: chunk.describe_dense_phase(),
                duration_seconds: chunk.dense.duration(),
            },
            model_generation: PhaseSummary {
                rank: chunk.model_gen_rank(),
                detail: chunk.describe_model_gen_phase(),
                duration_seconds: chunk.model_gen.duration,
            },
            texture_generation: PhaseSummary {
                rank: chunk.texture_gen_rank(),
                detail: chunk.describe_texture_gen_phase(),
                duration_seconds: chunk.texture.blend_duration + chunk.texture.uv_duration,
            },
            optimize_flags: chunk.optimize_string(),
            mesh: chunk.model.as_ref().map(|model| MeshRefSummary {
                mesh_path: model.mesh_path.clone(),
                archive_file: model.archive_file.clone(),
                face_count: model.face_count,
                vertex_count: model.vertex_count,
                has_vertex_colors: model.has_vertex_colors,
                has_uv: model.has_uv,
                texture_count: model.textures.len(),
            }),
        }
    }
}

impl MeshSummary {
    pub fn from_mesh(mesh: &MeshBuffers) -> MeshSummary {
        MeshSummary {
            vertex_count: mesh.vertex_count,
            face_count: mesh.face_count,
            has_normals: mesh.has_normals,
            has_colors: mesh.has_colors,
            has_tex_coords: mesh.has_tex_coords,
            packed_floats: mesh.packed.len(),
            unit_scale: mesh.unit_scale,
            warnings: mesh.validate(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "\t  Loaded mesh: {} vertices, {} faces, {} packed floats (scale {:.4})",
            self.vertex_count, self.face_count, self.packed_floats, self.unit_scale
        );
        let _ = writeln!(
            out,
            "\t  Attributes: normals={}, colors={}, uvs={}",
            self.has_normals, self.has_colors, self.has_tex_coords
        );
        for warning in &self.warnings {
            let _ = writeln!(out, "\t  Warning: {warning}");
        }
        out
    }
}
