//! Named artifact files under one directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::codec::{self, Artifact};
use crate::curve::CurveId;
use crate::error::{Result, ZkError};

/// A directory of encoded artifacts, addressed by file name.
///
/// Writes replace whole files; there is no locking, so concurrent writers
/// to the same name must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open `root`, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Encode and write `artifact`. Returns the number of bytes written.
    pub fn save<A: Artifact>(&self, name: &str, artifact: &A) -> Result<u64> {
        let path = self.path(name);
        let bytes = codec::to_bytes(artifact)?;
        std::fs::write(&path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), kind = %A::KIND, "artifact written");
        Ok(bytes.len() as u64)
    }

    /// Read and decode an artifact. A missing file is [`ZkError::MissingArtifact`].
    pub fn load<A: Artifact>(&self, curve: CurveId, name: &str) -> Result<A> {
        let path = self.path(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ZkError::MissingArtifact(path))
            }
            Err(e) => return Err(e.into()),
        };
        codec::from_bytes(curve, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::witness::PublicWitness;
    use ark_bn254::{Bn254, Fr};

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("output")).unwrap();
        let public = PublicWitness::<Bn254>::new(vec![Fr::from(221u64)]);

        let written = store.save("layer_0_witness_0", &public).unwrap();
        assert!(written > 0);
        assert!(store.exists("layer_0_witness_0"));

        let loaded: PublicWitness<Bn254> = store.load(CurveId::Bn254, "layer_0_witness_0").unwrap();
        assert_eq!(loaded, public);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let err = store
            .load::<PublicWitness<Bn254>>(CurveId::Bn254, "layer_1_vk")
            .unwrap_err();
        assert!(matches!(err, ZkError::MissingArtifact(_)));
        assert_eq!(err.category(), ErrorCategory::Io);
        assert!(!store.exists("layer_1_vk"));
    }
}
