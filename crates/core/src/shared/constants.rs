pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Minimum IoU a detection must strictly exceed to continue a track.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// Seconds a track may go unmatched before it is evicted.
pub const DEFAULT_TRACK_TIMEOUT_SECS: f64 = 1.0;

/// Cosine similarity a stored embedding must strictly exceed to match.
pub const MATCH_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Run identity resolution on every Nth processed frame.
pub const DEFAULT_RESOLVE_EVERY: usize = 5;

/// Crops smaller than this on either side are not sent to the embedder.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 16;
