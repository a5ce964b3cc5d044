use super::traits::StorageService;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

/// Writes uploads to a directory that the HTTP layer serves statically.
pub struct LocalStorageService {
    root: PathBuf,
    public_path: String,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>, public_path: &str) -> Self {
        let root = root.into();
        info!("Initializing LocalStorageService at {}", root.display());
        Self {
            root,
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            anyhow::bail!("Refusing to store file under key '{}'", key);
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, &data).await?;
        debug!("Stored {} ({}, {} bytes)", path.display(), content_type, data.len());
        Ok(self.get_url(key))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn get_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_path, key)
    }
}
