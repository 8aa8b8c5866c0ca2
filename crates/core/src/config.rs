use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_IOU_THRESHOLD, DEFAULT_MIN_FACE_SIZE, DEFAULT_RESOLVE_EVERY,
    DEFAULT_TRACK_TIMEOUT_SECS,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub iou_threshold: f64,
    pub track_timeout_secs: f64,
}

impl TrackerConfig {
    pub fn track_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.track_timeout_secs)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            track_timeout_secs: DEFAULT_TRACK_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Dispatch embeddings every Nth processed frame.
    pub resolve_every: usize,
    pub min_face_size: u32,
    /// Run the embedder on a worker thread instead of the frame loop.
    pub threaded_embedding: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            resolve_every: DEFAULT_RESOLVE_EVERY,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            threaded_embedding: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Frames skipped between processed frames (0 = process all).
    pub frame_skip: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    pub tracker: TrackerConfig,
    pub recognition: RecognitionConfig,
    pub pipeline: PipelineSettings,
}

impl AttendanceConfig {
    /// `<config dir>/Rollcall/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Rollcall").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads from the default location, falling back to defaults when no
    /// file exists there.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let iou = self.tracker.iou_threshold;
        if !(0.0..1.0).contains(&iou) {
            return Err(ConfigError::Invalid(format!(
                "iou_threshold must be in [0, 1), got {iou}"
            )));
        }
        let timeout = self.tracker.track_timeout_secs;
        if Duration::try_from_secs_f64(timeout).is_err() {
            return Err(ConfigError::Invalid(format!(
                "track_timeout_secs must be a non-negative number of seconds, got {timeout}"
            )));
        }
        if self.recognition.resolve_every == 0 {
            return Err(ConfigError::Invalid("resolve_every must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = AttendanceConfig::default();
        assert_eq!(config.tracker.iou_threshold, 0.3);
        assert_eq!(config.tracker.track_timeout(), Duration::from_secs(1));
        assert_eq!(config.recognition.resolve_every, 5);
        assert_eq!(config.recognition.min_face_size, 16);
        assert!(!config.recognition.threaded_embedding);
        assert_eq!(config.pipeline.frame_skip, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "tracker": { "iou_threshold": 0.5 }, "pipeline": { "frame_skip": 2 } }"#)
            .unwrap();

        let config = AttendanceConfig::load(&path).unwrap();
        assert_eq!(config.tracker.iou_threshold, 0.5);
        assert_eq!(config.tracker.track_timeout_secs, 1.0);
        assert_eq!(config.pipeline.frame_skip, 2);
        assert_eq!(config.recognition, RecognitionConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AttendanceConfig::default();
        config.recognition.threaded_embedding = true;

        config.save(&path).unwrap();
        assert_eq!(AttendanceConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AttendanceConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AttendanceConfig::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[rstest]
    #[case(-0.1, 1.0, 5)]
    #[case(1.0, 1.0, 5)]
    #[case(0.3, -1.0, 5)]
    #[case(0.3, f64::NAN, 5)]
    #[case(0.3, 1e300, 5)]
    #[case(0.3, 1.0, 0)]
    fn test_validate_rejects(#[case] iou: f64, #[case] timeout: f64, #[case] resolve_every: usize) {
        let mut config = AttendanceConfig::default();
        config.tracker.iou_threshold = iou;
        config.tracker.track_timeout_secs = timeout;
        config.recognition.resolve_every = resolve_every;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
