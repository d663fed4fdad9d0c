//! 文件存储
//!
//! [`FileStore`] 抽象对象存储：上传、删除、按键取回到本地缓存。
//! 默认实现 [`LocalFileStore`] 直接落在本地磁盘，缓存即存储本身。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::WebError;

/// 文件元信息
#[derive(Debug, Clone)]
pub struct FileStat {
    pub key: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// 文件存储后端
#[async_trait]
pub trait FileStore: Send + Sync {
    /// 文件元信息，不存在时返回错误
    async fn stat(&self, key: &str) -> Result<FileStat, WebError>;

    /// 删除文件
    async fn unlink(&self, key: &str) -> Result<(), WebError>;

    /// 取回文件到本地缓存，返回缓存路径
    async fn get_to_cache(&self, key: &str) -> Result<PathBuf, WebError>;

    /// 上传文件
    async fn upload_file(&self, key: &str, data: Bytes) -> Result<(), WebError>;
}

/// 本地磁盘存储
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 键到路径的映射，拒绝越出存储根目录的键
    fn resolve(&self, key: &str) -> Result<PathBuf, WebError> {
        let key = key.trim_start_matches('/');
        if key.is_empty()
            || Path::new(key)
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(WebError::Internal(format!("invalid file key '{}'", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn stat(&self, key: &str) -> Result<FileStat, WebError> {
        let path = self.resolve(key)?;
        let metadata = tokio::fs::metadata(&path).await?;
        Ok(FileStat {
            key: key.to_string(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn unlink(&self, key: &str) -> Result<(), WebError> {
        let path = self.resolve(key)?;
        tokio::fs::remove_file(&path).await?;
        debug!("Removed file '{}'", key);
        Ok(())
    }

    async fn get_to_cache(&self, key: &str) -> Result<PathBuf, WebError> {
        let path = self.resolve(key)?;
        // 本地存储无需复制，路径本身就是缓存
        tokio::fs::metadata(&path).await?;
        Ok(path)
    }

    async fn upload_file(&self, key: &str, data: Bytes) -> Result<(), WebError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        debug!("Stored file '{}' ({} bytes)", key, data.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_stat_fetch_unlink_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store
            .upload_file("avatars/a.png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        let stat = store.stat("avatars/a.png").await.unwrap();
        assert_eq!(stat.size, 3);

        let path = store.get_to_cache("avatars/a.png").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"png");

        store.unlink("avatars/a.png").await.unwrap();
        assert!(store.stat("avatars/a.png").await.is_err());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(store.get_to_cache("../etc/passwd").await.is_err());
        assert!(store.get_to_cache("a/../../b").await.is_err());
    }
}
