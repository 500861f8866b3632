//! 文件字节存储
//!
//! 存储服务契约：`write` / `delete`，delete 对缺失路径幂等。
//! 缩略图渲染等管线在此之外，字节一律按不透明内容处理。

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{ClassroomError, Result};

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// 写入字节。失败时调用方负责回滚已创建的元数据。
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// 删除字节。路径不存在视为成功。
    async fn delete(&self, path: &str) -> Result<()>;
}

/// 本地磁盘存储
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 按配置的上传目录创建
    pub fn from_config() -> Self {
        Self::new(&AppConfig::get().upload.dir)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClassroomError::storage_failure(format!("创建上传目录失败: {e}")))?;
        }
        std::fs::write(&full, bytes)
            .map_err(|e| ClassroomError::storage_failure(format!("写入文件失败 {path}: {e}")))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match std::fs::remove_file(self.resolve(path)) {
            Ok(()) => Ok(()),
            // 幂等：文件已不在视为删除成功
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClassroomError::storage_failure(format!(
                "删除文件失败 {path}: {e}"
            ))),
        }
    }
}

pub fn create_blob_store() -> Arc<dyn BlobStore> {
    Arc::new(LocalBlobStore::from_config())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalBlobStore {
        let dir = std::env::temp_dir().join(format!("classroom-blob-{}", uuid::Uuid::new_v4()));
        LocalBlobStore::new(dir)
    }

    #[tokio::test]
    async fn test_write_then_delete() {
        let store = temp_store();
        store.write("a/b.bin", b"hello").await.unwrap();
        store.delete("a/b.bin").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = temp_store();
        store.delete("never-existed.bin").await.unwrap();
    }
}
