/// Shared configuration for project and mesh ingestion

/// Name of the XML document entry inside a .psz/.zip project archive
pub const DOC_ENTRY_NAME: &str = "doc.xml";

/// Default name of the mesh entry inside a model archive
pub const DEFAULT_MESH_ENTRY: &str = "model0.ply";

/// Placeholder token substituted with the project file's base name
pub const PROJECT_NAME_TOKEN: &str = "{projectname}";

/// Archive-backed project file extensions (XML lives in DOC_ENTRY_NAME)
pub const ARCHIVE_EXTENSIONS: &[&str] = &["psz", "zip"];

/// Plain-file project extensions (XML read directly)
pub const PLAIN_EXTENSIONS: &[&str] = &["psx", "xml"];

/// Rank reserved for phases with no data at all
pub const NO_DATA_RANK: u8 = 5;

/// Ratio thresholds for alignment and dense-cloud ranks.
/// A ratio below thresholds[i] maps to rank 4-i; at or above the last
/// threshold the rank is 0.
pub const RATIO_THRESHOLDS: [f64; 4] = [0.100, 0.3333, 0.6667, 0.950];

/// Face-count ladder for the model generation rank.
/// Below ladder[i] maps to rank 4-i; at or above the last rung the rank is 0.
pub const FACE_COUNT_LADDER: [i64; 4] = [5_000, 10_000, 50_000, 1_000_000];

/// Texture resolution ladder for the texture generation rank.
/// Either dimension below ladder[i] maps to rank 4-i.
pub const TEXTURE_SIZE_LADDER: [i64; 4] = [1024, 2048, 3072, 4096];

/// Map a completion ratio onto the shared 0-4 rank scale (0 is best)
pub fn ratio_rank(ratio: f64) -> u8 {
    for (i, threshold) in RATIO_THRESHOLDS.iter().enumerate() {
        if ratio < *threshold {
            return 4 - i as u8;
        }
    }
    0
}
