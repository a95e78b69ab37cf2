/// Phase progress ranks and the overall chunk lifecycle state
use crate::model::{AlignmentDetail, Chunk, DenseCloudDetail, ProjectDocument};

/// Lifecycle state of a chunk.
///
/// The first block after `Unknown` is derived sequentially from phase
/// completion; the rest are assigned manually (rejection or approval) and
/// stick until explicitly reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ChunkStatus {
    #[default]
    Unknown,
    Unprocessed,
    RawProcessingDone,
    AlignmentDone,
    PointCloudDone,
    ModelGenDone,
    TextureGenDone,
    NeedsExposureRedo,
    NeedsAlignmentRedo,
    NeedsPointCloudRedo,
    NeedsModelGenRedo,
    NeedsTextureGenRedo,
    NeedsGeometryTouchup,
    NeedsTextureTouchup,
    FinalApproval,
}

impl ChunkStatus {
    pub const ALL: [ChunkStatus; 15] = [
        ChunkStatus::Unknown,
        ChunkStatus::Unprocessed,
        ChunkStatus::RawProcessingDone,
        ChunkStatus::AlignmentDone,
        ChunkStatus::PointCloudDone,
        ChunkStatus::ModelGenDone,
        ChunkStatus::TextureGenDone,
        ChunkStatus::NeedsExposureRedo,
        ChunkStatus::NeedsAlignmentRedo,
        ChunkStatus::NeedsPointCloudRedo,
        ChunkStatus::NeedsModelGenRedo,
        ChunkStatus::NeedsTextureGenRedo,
        ChunkStatus::NeedsGeometryTouchup,
        ChunkStatus::NeedsTextureTouchup,
        ChunkStatus::FinalApproval,
    ];

    pub fn short_name(self) -> &'static str {
        match self {
            ChunkStatus::Unknown => "??",
            ChunkStatus::Unprocessed => "virgin",
            ChunkStatus::RawProcessingDone => "photos",
            ChunkStatus::AlignmentDone => "aligned",
            ChunkStatus::PointCloudDone => "cloud",
            ChunkStatus::ModelGenDone => "model",
            ChunkStatus::TextureGenDone => "tex",
            ChunkStatus::NeedsExposureRedo => "RedoExp",
            ChunkStatus::NeedsAlignmentRedo => "RedoAlign",
            ChunkStatus::NeedsPointCloudRedo => "RedoCloud",
            ChunkStatus::NeedsModelGenRedo => "RedoModel",
            ChunkStatus::NeedsTextureGenRedo => "RedoTex",
            ChunkStatus::NeedsGeometryTouchup => "HandFixGeom",
            ChunkStatus::NeedsTextureTouchup => "HandFixTex",
            ChunkStatus::FinalApproval => "Final",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ChunkStatus::Unknown => "Unknown",
            ChunkStatus::Unprocessed => "Unprocessed",
            ChunkStatus::RawProcessingDone => "Images Ready",
            ChunkStatus::AlignmentDone => "Images Aligned",
            ChunkStatus::PointCloudDone => "Dense Cloud Done",
            ChunkStatus::ModelGenDone => "Model Generated",
            ChunkStatus::TextureGenDone => "Complete",
            ChunkStatus::NeedsExposureRedo => "Need to redo Raw Image Exposure",
            ChunkStatus::NeedsAlignmentRedo => "Need to redo Image Alignment",
            ChunkStatus::NeedsPointCloudRedo => "Need to redo Dense Point Cloud",
            ChunkStatus::NeedsModelGenRedo => "Need to redo Model Generation",
            ChunkStatus::NeedsTextureGenRedo => "Need to redo Texture Generation",
            ChunkStatus::NeedsGeometryTouchup => "Needs Geometry Touchup by Modeler",
            ChunkStatus::NeedsTextureTouchup => "Needs Texture Touchup by Modeler",
            ChunkStatus::FinalApproval => "Approved!",
        }
    }

    fn ordinal(self) -> usize {
        ChunkStatus::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn from_ordinal(ordinal: usize) -> Option<ChunkStatus> {
        ChunkStatus::ALL.get(ordinal).copied()
    }
}

impl Chunk {
    /// Rank 0 (best) to 4 from the aligned/total image ratio; 5 when no
    /// image has aligned at all
    pub fn alignment_rank(&self) -> u8 {
        let all_images = self.cameras.len();
        let aligned = self.images.len();
        if aligned == 0 {
            return constants::NO_DATA_RANK;
        }
        constants::ratio_rank(aligned as f64 / all_images as f64)
    }

    /// Rank from the depth-image ratio. Zero depth images means rank 5
    /// when the phase never ran and rank 3 when it ran but produced none.
    pub fn dense_rank(&self) -> u8 {
        let depth_images = self.dense.images_used;
        if depth_images == 0 {
            if self.dense.level == DenseCloudDetail::Unknown {
                return constants::NO_DATA_RANK;
            }
            return 3;
        }
        constants::ratio_rank(depth_images as f64 / self.cameras.len() as f64)
    }

    /// Rank from the fixed face-count ladder; 5 without a mesh
    pub fn model_gen_rank(&self) -> u8 {
        let face_count = self.model_face_count();
        if face_count < 0 {
            return constants::NO_DATA_RANK;
        }
        for (i, rung) in constants::FACE_COUNT_LADDER.iter().enumerate() {
            if face_count < *rung {
                return 4 - i as u8;
            }
        }
        0
    }

    /// Rank from the texture resolution ladder, each dimension checked
    /// independently; 5 when either dimension is zero
    pub fn texture_gen_rank(&self) -> u8 {
        let (w, h) = (self.texture.width, self.texture.height);
        if w == 0 || h == 0 {
            return constants::NO_DATA_RANK;
        }
        for (i, rung) in constants::TEXTURE_SIZE_LADDER.iter().enumerate() {
            if w < *rung || h < *rung {
                return 4 - i as u8;
            }
        }
        0
    }

    /// "High Detail (3 - 40k/4k)" style summary, or "N/A" before alignment
    pub fn describe_alignment_phase(&self) -> String {
        if self.alignment.level == AlignmentDetail::Unknown && self.images.is_empty() {
            return "N/A".to_string();
        }
        format!(
            "{} ({} - {}k/{}k)",
            self.alignment.level.description(),
            self.images.len(),
            self.alignment.feature_limit / 1000,
            self.alignment.tie_point_limit / 1000
        )
    }

    pub fn describe_dense_phase(&self) -> String {
        if self.dense.level == DenseCloudDetail::Unknown && self.dense.images_used == 0 {
            return "N/A".to_string();
        }
        format!(
            "{} ({})",
            self.dense.level.description(),
            self.dense.images_used
        )
    }

    pub fn describe_model_gen_phase(&self) -> String {
        let faces = self.model_face_count();
        if faces < 0 {
            if self.has_mesh() {
                return "?".to_string();
            }
            return "N/A".to_string();
        }
        let thousands = faces as f64 / 1000.0;
        if thousands >= 1000.0 {
            format!("{:.1}M faces", thousands / 1000.0)
        } else {
            format!("{thousands:.1}K faces")
        }
    }

    pub fn describe_texture_gen_phase(&self) -> String {
        if self.texture.count != 0 {
            return format!(
                "{} @ ({} x {})",
                self.texture.count, self.texture.width, self.texture.height
            );
        }
        "N/A".to_string()
    }

    /// Sequential auto status: walk the phases in processing order and stop
    /// at the first one with no data
    pub fn auto_status(&self) -> ChunkStatus {
        if self.cameras.is_empty() {
            ChunkStatus::Unprocessed
        } else if self.alignment_rank() == constants::NO_DATA_RANK {
            ChunkStatus::RawProcessingDone
        } else if self.dense_rank() == constants::NO_DATA_RANK {
            ChunkStatus::AlignmentDone
        } else if self.model_gen_rank() == constants::NO_DATA_RANK {
            ChunkStatus::PointCloudDone
        } else if self.texture_gen_rank() == constants::NO_DATA_RANK {
            ChunkStatus::ModelGenDone
        } else {
            ChunkStatus::TextureGenDone
        }
    }

    /// Assign a manual status as an offset past the sequential range.
    ///
    /// Offsets landing outside (TextureGenDone, FinalApproval] fall back to
    /// the auto status; anything inside sticks until reset this same way.
    pub fn set_custom_status(&mut self, offset: usize) {
        let base = ChunkStatus::TextureGenDone.ordinal();
        let target = base + offset;
        match ChunkStatus::from_ordinal(target) {
            Some(status) if target > base => self.status = status,
            _ => self.status = self.auto_status(),
        }
    }

    pub fn refresh_status(&mut self) {
        self.status = self.auto_status();
    }
}

impl ProjectDocument {
    pub fn alignment_rank(&self) -> u8 {
        self.active_chunk().map_or(0, Chunk::alignment_rank)
    }

    pub fn dense_rank(&self) -> u8 {
        self.active_chunk().map_or(0, Chunk::dense_rank)
    }

    pub fn model_gen_rank(&self) -> u8 {
        self.active_chunk().map_or(0, Chunk::model_gen_rank)
    }

    pub fn texture_gen_rank(&self) -> u8 {
        self.active_chunk().map_or(0, Chunk::texture_gen_rank)
    }

    pub fn describe_alignment_phase(&self) -> String {
        self.active_chunk()
            .map_or_else(|| "N/A".to_string(), Chunk::describe_alignment_phase)
    }

    pub fn describe_dense_phase(&self) -> String {
        self.active_chunk()
            .map_or_else(|| "N/A".to_string(), Chunk::describe_dense_phase)
    }

    pub fn describe_model_gen_phase(&self) -> String {
        self.active_chunk()
            .map_or_else(|| "N/A".to_string(), Chunk::describe_model_gen_phase)
    }

    pub fn describe_texture_gen_phase(&self) -> String {
        self.active_chunk()
            .map_or_else(|| "N/A".to_string(), Chunk::describe_texture_gen_phase)
    }
}
