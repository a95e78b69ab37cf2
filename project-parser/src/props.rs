/// Flat key/value property decoding against the owning chunk
use log::warn;

use crate::model::{AlignmentDetail, Chunk, DenseCloudDetail, DenseCloudFilter};

/// Apply one slash-separated property key to the chunk.
///
/// Malformed numeric values silently decode as zero; the assignment still
/// happens. Unknown keys are ignored. Detail-level values outside their
/// enum range are rejected with a warning and the field is left unchanged.
/// Downstream status derivation depends on these exact semantics.
pub fn apply(chunk: &mut Chunk, name: &str, value: &str) {
    let vd = value.parse::<f64>().unwrap_or(0.0);
    let vl = value
        .parse::<i64>()
        .unwrap_or_else(|_| value.parse::<f64>().map(|f| f as i64).unwrap_or(0));

    match name {
        // Texture generation
        "atlas/atlas_blend_mode" => chunk.texture.blend_mode = vl,
        "atlas/atlas_count" => chunk.texture.count = vl,
        "atlas/atlas_height" => chunk.texture.height = vl,
        "atlas/atlas_mapping_mode" => chunk.texture.mapping_mode = vl,
        "atlas/atlas_width" => chunk.texture.width = vl,

        // Model generation
        "model/mesh_face_count" => chunk.model_gen.face_count = vl,
        "model/mesh_interpolation" => chunk.model_gen.interpolation = vl == 1,
        "model/mesh_source_data" => chunk.model_gen.dense_source = vl == 1,
        "model/resolution" => chunk.model_gen.resolution = vd,

        // Dense cloud
        "dense_cloud/depth_downscale" => match DenseCloudDetail::from_value(vl) {
            Some(level) => chunk.dense.level = level,
            None => warn!("dense_cloud/depth_downscale value {vl} out of range"),
        },
        "dense_cloud/depth_filter_mode" => match DenseCloudFilter::from_value(vl) {
            Some(filter) => chunk.dense.filter = filter,
            None => warn!("dense_cloud/depth_filter_mode value {vl} out of range"),
        },

        // Image alignment
        "match/match_downscale" => match AlignmentDetail::from_value(vl) {
            Some(level) => chunk.alignment.level = level,
            None => warn!("match/match_downscale value {vl} out of range"),
        },
        "match/match_filter_mask" => chunk.alignment.masked = vl != 0,
        "match/match_point_limit" => chunk.alignment.feature_limit = vl,
        "match/match_tiepoint_limit" => chunk.alignment.tie_point_limit = vl,

        // Durations
        "match/duration" => chunk.alignment.match_duration = vd,
        "align/duration" => chunk.alignment.align_duration = vd,
        "optimize/duration" => chunk.optimize.duration = vd,
        // Legacy single-duration key lands on the cloud half
        "dense_cloud/duration" => chunk.dense.cloud_duration = vd,
        "dense_cloud/duration_depth" => chunk.dense.depth_duration = vd,
        "dense_cloud/duration_cloud" => chunk.dense.cloud_duration = vd,
        "model/duration" => chunk.model_gen.duration = vd,
        "atlas/duration_blend" => chunk.texture.blend_duration = vd,
        "atlas/duration_uv" => chunk.texture.uv_duration = vd,

        // Fit flag list: space-separated tokens, unknown tokens ignored
        "optimize/fit_flags" => {
            for token in value.split_whitespace() {
                match token {
                    "f" => chunk.optimize.f = true,
                    "cx" => chunk.optimize.cx = true,
                    "cy" => chunk.optimize.cy = true,
                    "b1" => chunk.optimize.b1 = true,
                    "b2" => chunk.optimize.b2 = true,
                    "k1" => chunk.optimize.k1 = true,
                    "k2" => chunk.optimize.k2 = true,
                    "k3" => chunk.optimize.k3 = true,
                    "k4" => chunk.optimize.k4 = true,
                    "p1" => chunk.optimize.p1 = true,
                    "p2" => chunk.optimize.p2 = true,
                    "p3" => chunk.optimize.p3 = true,
                    "p4" => chunk.optimize.p4 = true,
                    _ => {}
                }
            }
        }

        // Compound fit toggles fan one value out to several flags
        "optimize/fit_aspect" => chunk.optimize.aspect = vl != 0,
        "optimize/fit_f" => chunk.optimize.f = vl != 0,
        "optimize/fit_cxcy" => {
            chunk.optimize.cx = vl != 0;
            chunk.optimize.cy = vl != 0;
        }
        "optimize/fit_k1k2k3" => {
            chunk.optimize.k1 = vl != 0;
            chunk.optimize.k2 = vl != 0;
            chunk.optimize.k3 = vl != 0;
        }
        "optimize/fit_p1p2" => {
            chunk.optimize.p1 = vl != 0;
            chunk.optimize.p2 = vl != 0;
        }
        "optimize/fit_skew" => chunk.optimize.skew = vl != 0,
        "optimize/fit_k4" => chunk.optimize.k4 = vl != 0,

        _ => {}
    }
}
