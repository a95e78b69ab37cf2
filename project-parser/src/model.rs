/// Entity graph built from a project document
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::status::ChunkStatus;

/// Detail level recorded for the image alignment phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentDetail {
    #[default]
    Unknown,
    High,
    Medium,
    Low,
}

impl AlignmentDetail {
    pub fn from_value(value: i64) -> Option<AlignmentDetail> {
        match value {
            0 => Some(AlignmentDetail::Unknown),
            1 => Some(AlignmentDetail::High),
            2 => Some(AlignmentDetail::Medium),
            3 => Some(AlignmentDetail::Low),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AlignmentDetail::Unknown => "Unknown Detail",
            AlignmentDetail::High => "High Detail",
            AlignmentDetail::Medium => "Medium Detail",
            AlignmentDetail::Low => "Low Detail",
        }
    }
}

/// Detail level recorded for the dense cloud phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DenseCloudDetail {
    #[default]
    Unknown,
    UltraHigh,
    High,
    Medium,
    Low,
    Lowest,
}

impl DenseCloudDetail {
    pub fn from_value(value: i64) -> Option<DenseCloudDetail> {
        match value {
            0 => Some(DenseCloudDetail::Unknown),
            1 => Some(DenseCloudDetail::UltraHigh),
            2 => Some(DenseCloudDetail::High),
            3 => Some(DenseCloudDetail::Medium),
            4 => Some(DenseCloudDetail::Low),
            5 => Some(DenseCloudDetail::Lowest),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DenseCloudDetail::Unknown => "Unknown Detail",
            DenseCloudDetail::UltraHigh => "Ultra High Detail",
            DenseCloudDetail::High => "High Detail",
            DenseCloudDetail::Medium => "Medium Detail",
            DenseCloudDetail::Low => "Low Detail",
            DenseCloudDetail::Lowest => "Lowest Detail",
        }
    }
}

/// Depth filtering strength recorded for the dense cloud phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DenseCloudFilter {
    #[default]
    Unknown,
    Disabled,
    Aggressive,
    Moderate,
    Mild,
}

impl DenseCloudFilter {
    pub fn from_value(value: i64) -> Option<DenseCloudFilter> {
        match value {
            0 => Some(DenseCloudFilter::Unknown),
            1 => Some(DenseCloudFilter::Disabled),
            2 => Some(DenseCloudFilter::Aggressive),
            3 => Some(DenseCloudFilter::Moderate),
            4 => Some(DenseCloudFilter::Mild),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DenseCloudFilter::Unknown => "Unknown Filter",
            DenseCloudFilter::Disabled => "Filter Disabled",
            DenseCloudFilter::Aggressive => "Aggressive Filter",
            DenseCloudFilter::Moderate => "Moderate Filter",
            DenseCloudFilter::Mild => "Mild Filter",
        }
    }
}

/// Calibration profile shared by one or more cameras.
///
/// Distortion coefficients default to 1.0 when the calibration block is
/// absent, matching the source tool's export convention.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: i64,
    pub label: String,
    pub sensor_type: String,
    pub width: i64,
    pub height: i64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub focal_length: f64,
    pub fixed: bool,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub b1: f64,
    pub b2: f64,
    pub skew: f64,
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
    pub bands: Vec<String>,
    pub covariance_params: String,
    pub covariance_coeffs: Vec<f64>,
}

impl Sensor {
    pub fn new(id: i64, label: String) -> Sensor {
        Sensor {
            id,
            label,
            sensor_type: String::new(),
            width: 0,
            height: 0,
            pixel_width: 0.0,
            pixel_height: 0.0,
            focal_length: 0.0,
            fixed: false,
            fx: 1.0,
            fy: 1.0,
            cx: 1.0,
            cy: 1.0,
            b1: 1.0,
            b2: 1.0,
            skew: 1.0,
            k1: 1.0,
            k2: 1.0,
            k3: 1.0,
            k4: 1.0,
            p1: 1.0,
            p2: 1.0,
            p3: 1.0,
            p4: 1.0,
            bands: Vec::new(),
            covariance_params: String::new(),
            covariance_coeffs: Vec::new(),
        }
    }
}

/// Camera definition at chunk level.
///
/// `sensor_linked` is captured at insertion time: a camera referencing a
/// sensor ID not yet in the chunk's map stays unlinked even if that sensor
/// appears later. `image_index` points into the chunk's image list once a
/// frame-level pose for this camera has been seen.
#[derive(Debug, Clone)]
pub struct Camera {
    pub id: i64,
    pub label: String,
    pub enabled: bool,
    pub sensor_id: i64,
    pub sensor_linked: bool,
    pub image_index: Option<usize>,
    pub transform: Option<Vec<f64>>,
}

impl Camera {
    pub fn new(id: i64) -> Camera {
        Camera {
            id,
            label: String::new(),
            enabled: false,
            sensor_id: -1,
            sensor_linked: false,
            image_index: None,
            transform: None,
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.image_index.is_some()
    }
}

/// A posed image association found inside a frame
#[derive(Debug, Clone)]
pub struct Image {
    pub camera_id: i64,
    pub camera_linked: bool,
    pub file_path: String,
    pub properties: BTreeMap<String, String>,
}

impl Image {
    pub fn new(camera_id: i64) -> Image {
        Image {
            camera_id,
            camera_linked: false,
            file_path: String::new(),
            properties: BTreeMap::new(),
        }
    }
}

/// Reference to a generated mesh and its texture atlas files
#[derive(Debug, Clone)]
pub struct ModelRef {
    /// Container holding the mesh entry; only set for archive sources
    pub archive_file: Option<PathBuf>,
    pub mesh_path: String,
    pub face_count: i64,
    pub vertex_count: i64,
    pub has_vertex_colors: bool,
    pub has_uv: bool,
    pub textures: BTreeMap<i64, String>,
}

impl ModelRef {
    pub fn new(source: &Path) -> ModelRef {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let archive_file = if constants::ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
            Some(source.to_path_buf())
        } else {
            None
        };
        ModelRef {
            archive_file,
            mesh_path: String::new(),
            face_count: -1,
            vertex_count: -1,
            has_vertex_colors: false,
            has_uv: false,
            textures: BTreeMap::new(),
        }
    }

    /// Textures occasionally omit their ID; they land on slot 0
    pub fn add_texture(&mut self, id: i64, path: String) {
        if self.textures.contains_key(&id) {
            warn!("possible texture ID collision ({id} already exists)");
        }
        self.textures.insert(id, path);
    }
}

/// Image alignment phase metrics
#[derive(Debug, Clone, Default)]
pub struct AlignmentPhase {
    pub match_duration: f64,
    pub align_duration: f64,
    pub level: AlignmentDetail,
    pub masked: bool,
    pub feature_limit: i64,
    pub tie_point_limit: i64,
}

/// Camera optimization fit flags
#[derive(Debug, Clone, Default)]
pub struct OptimizePhase {
    pub duration: f64,
    pub aspect: bool,
    pub f: bool,
    pub cx: bool,
    pub cy: bool,
    pub b1: bool,
    pub b2: bool,
    pub p1: bool,
    pub p2: bool,
    pub p3: bool,
    pub p4: bool,
    pub k1: bool,
    pub k2: bool,
    pub k3: bool,
    pub k4: bool,
    pub skew: bool,
}

/// Dense cloud phase metrics
#[derive(Debug, Clone, Default)]
pub struct DensePhase {
    pub depth_duration: f64,
    pub cloud_duration: f64,
    pub level: DenseCloudDetail,
    pub filter: DenseCloudFilter,
    pub images_used: i64,
}

impl DensePhase {
    pub fn duration(&self) -> f64 {
        self.depth_duration + self.cloud_duration
    }
}

/// Model generation phase metrics
#[derive(Debug, Clone, Default)]
pub struct ModelPhase {
    pub resolution: f64,
    pub duration: f64,
    pub face_count: i64,
    pub dense_source: bool,
    pub interpolation: bool,
}

/// Texture generation phase metrics
#[derive(Debug, Clone, Default)]
pub struct TexturePhase {
    pub blend_duration: f64,
    pub uv_duration: f64,
    pub mapping_mode: i64,
    pub blend_mode: i64,
    pub count: i64,
    pub width: i64,
    pub height: i64,
}

/// One reconstruction unit within a project
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub id: i64,
    pub label: String,
    pub enabled: bool,
    pub sensor_count: i64,
    pub marker_count: i64,
    pub scalebar_count: i64,
    pub sensors: BTreeMap<i64, Sensor>,
    pub cameras: BTreeMap<i64, Camera>,
    pub images: Vec<Image>,
    pub model: Option<ModelRef>,
    pub alignment: AlignmentPhase,
    pub optimize: OptimizePhase,
    pub dense: DensePhase,
    pub model_gen: ModelPhase,
    pub texture: TexturePhase,
    pub status: ChunkStatus,
}

impl Chunk {
    /// Add sensors before cameras and cameras before images; links are
    /// resolved eagerly at insertion and never retroactively
    pub fn add_sensor(&mut self, sensor: Sensor) {
        self.sensor_count += 1;
        self.sensors.insert(sensor.id, sensor);
    }

    pub fn add_camera(&mut self, mut camera: Camera) {
        camera.sensor_linked = self.sensors.contains_key(&camera.sensor_id);
        self.cameras.insert(camera.id, camera);
    }

    pub fn add_image(&mut self, mut image: Image) {
        let index = self.images.len();
        if let Some(camera) = self.cameras.get_mut(&image.camera_id) {
            image.camera_linked = true;
            camera.image_index = Some(index);
        }
        self.images.push(image);
    }

    pub fn add_depth_image(&mut self) {
        self.dense.images_used += 1;
    }

    pub fn has_mesh(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_face_count(&self) -> i64 {
        match &self.model {
            Some(model) => model.face_count,
            None => -1,
        }
    }

    pub fn model_vertex_count(&self) -> i64 {
        match &self.model {
            Some(model) => model.vertex_count,
            None => -1,
        }
    }

    pub fn model_archive_file(&self) -> Option<&Path> {
        self.model
            .as_ref()
            .and_then(|m| m.archive_file.as_deref())
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Comma-separated list of the enabled optimization fit flags
    pub fn optimize_string(&self) -> String {
        let o = &self.optimize;
        let flags: [(&str, bool); 15] = [
            ("aspect", o.aspect),
            ("fv", o.f),
            ("Cx", o.cx),
            ("Cy", o.cy),
            ("B1", o.b1),
            ("B2", o.b2),
            ("P1", o.p1),
            ("P2", o.p2),
            ("P3", o.p3),
            ("P4", o.p4),
            ("k1", o.k1),
            ("k2", o.k2),
            ("k3", o.k3),
            ("k4", o.k4),
            ("skew", o.skew),
        ];
        flags
            .iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A resolved project: version string plus its chunks, with one chunk
/// designated active for status queries
#[derive(Debug, Clone)]
pub struct ProjectDocument {
    pub source: PathBuf,
    pub version: String,
    pub chunks: Vec<Chunk>,
    active_chunk: usize,
}

impl ProjectDocument {
    pub(crate) fn new(source: PathBuf) -> ProjectDocument {
        ProjectDocument {
            source,
            version: String::new(),
            chunks: Vec::new(),
            active_chunk: 0,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn active_chunk_index(&self) -> usize {
        self.active_chunk
    }

    pub fn set_active_chunk(&mut self, index: usize) {
        if index < self.chunks.len() {
            self.active_chunk = index;
        }
    }

    pub fn active_chunk(&self) -> Option<&Chunk> {
        self.chunks.get(self.active_chunk)
    }

    pub fn model_archive_file(&self) -> Option<&Path> {
        self.active_chunk().and_then(|c| c.model_archive_file())
    }
}
