//! Filesystem-backed artifact store.

use crate::artifact::{
    domain::{ArtifactId, ArtifactLocation},
    ports::{ArtifactStore, ArtifactStoreError, ArtifactStoreResult},
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;

/// File extension used for stored payloads.
const ARTIFACT_EXTENSION: &str = "artifact";

/// Stores each artifact as `<id>.artifact` inside a single directory.
///
/// Locations are file names relative to the store root, so the directory
/// can be moved without invalidating records. Blocking filesystem calls run
/// on the tokio blocking pool.
#[derive(Debug)]
pub struct FilesystemArtifactStore {
    root: Utf8PathBuf,
    dir: Dir,
}

impl FilesystemArtifactStore {
    /// Opens (creating if needed) the store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created or opened.
    pub fn open(root: &Utf8Path) -> io::Result<Self> {
        Dir::create_ambient_dir_all(root, ambient_authority())?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self {
            root: root.to_owned(),
            dir,
        })
    }

    /// Returns the store root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the absolute path backing `location`.
    #[must_use]
    pub fn path_of(&self, location: &ArtifactLocation) -> Utf8PathBuf {
        self.root.join(location.as_str())
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn store(
        &self,
        artifact_id: ArtifactId,
        contents: &[u8],
    ) -> ArtifactStoreResult<ArtifactLocation> {
        let file_name = format!("{artifact_id}.{ARTIFACT_EXTENSION}");
        let location = ArtifactLocation::new(file_name.clone()).map_err(ArtifactStoreError::io)?;
        let dir = self.dir.try_clone().map_err(ArtifactStoreError::io)?;
        let payload = contents.to_vec();

        tokio::task::spawn_blocking(move || dir.write(&file_name, payload))
            .await
            .map_err(ArtifactStoreError::io)?
            .map_err(ArtifactStoreError::io)?;

        Ok(location)
    }

    async fn load(&self, location: &ArtifactLocation) -> ArtifactStoreResult<Vec<u8>> {
        let dir = self.dir.try_clone().map_err(ArtifactStoreError::io)?;
        let file_name = location.as_str().to_owned();

        let read_result = tokio::task::spawn_blocking(move || dir.read(&file_name))
            .await
            .map_err(ArtifactStoreError::io)?;

        match read_result {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(ArtifactStoreError::Missing(location.clone()))
            }
            Err(err) => Err(ArtifactStoreError::io(err)),
        }
    }
}
