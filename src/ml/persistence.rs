use crate::error::{AppError, Result};
use crate::ml::forest::RandomForestClassifier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Bumped whenever the serialized layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// The file written by the trainer and loaded by the service
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub forest: RandomForestClassifier,
}

impl ModelArtifact {
    pub fn new(forest: RandomForestClassifier) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            forest,
        }
    }

    /// Write the artifact, creating parent directories. Returns the file size in bytes.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(fs::File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        let size = fs::metadata(path)?.len();
        info!(path = %path.display(), size_bytes = size, "Saved model artifact");
        Ok(size)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| {
            AppError::ModelUnavailable(format!(
                "Cannot open model artifact {}: {}",
                path.display(),
                e
            ))
        })?;

        let artifact: ModelArtifact = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| {
                AppError::ModelUnavailable(format!(
                    "Cannot decode model artifact {}: {}",
                    path.display(),
                    e
                ))
            })?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(AppError::ModelUnavailable(format!(
                "Model artifact {} has format version {}, expected {}",
                path.display(),
                artifact.format_version,
                ARTIFACT_FORMAT_VERSION
            )));
        }

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::ForestConfig;

    #[test]
    fn test_missing_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelArtifact::load(dir.path().join("missing.bin")).err().unwrap();
        assert_eq!(err.error_code(), "MODEL_UNAVAILABLE");
    }

    #[test]
    fn test_garbage_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        fs::write(&path, b"not a model").unwrap();

        let err = ModelArtifact::load(&path).err().unwrap();
        assert_eq!(err.error_code(), "MODEL_UNAVAILABLE");
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/models/forest.bin");

        let artifact = ModelArtifact::new(RandomForestClassifier::new(ForestConfig::default()));
        let size = artifact.save(&path).unwrap();

        assert!(path.exists());
        assert!(size > 0);
        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.format_version, ARTIFACT_FORMAT_VERSION);
    }
}
