/**
 * Disk Blob Storage
 *
 * Stores objects under a base directory using UUID-partitioned relative
 * paths: the uuid's dash-separated segments become nested directories, so
 * no single directory grows unbounded.
 */

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::Storage;

#[derive(Debug, Clone)]
pub struct DiskStorage {
    basepath: PathBuf,
}

impl DiskStorage {
    pub fn new(basepath: impl Into<PathBuf>) -> Self {
        DiskStorage {
            basepath: basepath.into(),
        }
    }

    fn full_path(&self, relative: &str) -> PathBuf {
        self.basepath.join(relative)
    }
}

#[async_trait]
impl Storage for DiskStorage {
    async fn create_object(&self, content: &[u8]) -> io::Result<String> {
        let id = Uuid::new_v4().to_string();
        let relative: PathBuf = id.split('-').collect();
        let relative = relative.to_string_lossy().into_owned();

        let disk_path = self.full_path(&relative);
        if let Some(dir) = disk_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&disk_path, content).await?;

        Ok(relative)
    }

    async fn write_object(&self, path: &str, content: &[u8]) -> io::Result<()> {
        let disk_path = self.full_path(path);
        if !tokio::fs::try_exists(&disk_path).await? {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no object at {path}"),
            ));
        }
        tokio::fs::write(&disk_path, content).await
    }

    async fn read_object(&self, path: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.full_path(path)).await
    }

    async fn delete_object(&self, path: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
