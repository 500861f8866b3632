//! 文件注册：字节落盘加元数据入库，写失败回滚元数据行

use std::sync::Arc;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::files::entities::File;
use crate::storage::Storage;
use crate::storage::blob::BlobStore;

/// 一次待注册的上传
pub struct NewUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// 渲染好的缩略图字节（渲染管线在系统之外，这里只收结果）
    pub thumbnail: Option<Vec<u8>>,
}

/// 每次注册生成的存储路径互不相同，并发上传不会在路径上冲突
fn new_storage_path() -> String {
    format!("{}-{}.bin", chrono::Utc::now().timestamp(), Uuid::new_v4())
}

/// 注册一个文件（连同可选缩略图），返回尚无归属的文件记录
///
/// 先建元数据行再写字节；任何一步字节写入失败都删掉刚建的行，
/// 不留悬空元数据。缩略图本身也是一条文件记录，主记录通过
/// `thumbnail_id` 指向它。
pub async fn register_file(
    storage: &Arc<dyn Storage>,
    blob: &Arc<dyn BlobStore>,
    uploaded_by: i64,
    upload: &NewUpload,
) -> Result<File> {
    // 缩略图先注册，主记录要引用它的 ID
    let thumbnail_id = match &upload.thumbnail {
        Some(bytes) => {
            let thumb = storage
                .create_file(
                    &format!("{}.thumb", upload.file_name),
                    "image/png",
                    &new_storage_path(),
                    bytes.len() as i64,
                    None,
                    uploaded_by,
                )
                .await?;
            if let Err(e) = blob.write(&thumb.storage_path, bytes).await {
                let _ = storage.delete_file_row(thumb.id).await;
                return Err(e);
            }
            Some(thumb.id)
        }
        None => None,
    };

    let file = match storage
        .create_file(
            &upload.file_name,
            &upload.mime_type,
            &new_storage_path(),
            upload.bytes.len() as i64,
            thumbnail_id,
            uploaded_by,
        )
        .await
    {
        Ok(file) => file,
        Err(e) => {
            // 主记录没建起来，连带清掉已落盘的缩略图
            if let Some(id) = thumbnail_id {
                rollback_thumbnail(storage, blob, id).await;
            }
            return Err(e);
        }
    };

    if let Err(e) = blob.write(&file.storage_path, &upload.bytes).await {
        let _ = storage.delete_file_row(file.id).await;
        if let Some(id) = thumbnail_id {
            rollback_thumbnail(storage, blob, id).await;
        }
        return Err(e);
    }

    Ok(file)
}

/// 丢弃一条已注册的文件记录
///
/// 先尽力删除字节（含缩略图字节），随后删除元数据行。字节删除
/// 失败只记警告，元数据行总是被移除；返回错误仅代表数据库删除
/// 本身失败。
pub(crate) async fn discard_file(
    storage: &Arc<dyn Storage>,
    blob: &Arc<dyn BlobStore>,
    file: &File,
) -> Result<()> {
    if let Err(e) = blob.delete(&file.storage_path).await {
        tracing::warn!("Blob delete failed for file {}: {}", file.id, e);
    }
    if let Some(thumbnail_id) = file.thumbnail_id
        && let Some(thumb) = storage.get_file_by_id(thumbnail_id).await?
    {
        if let Err(e) = blob.delete(&thumb.storage_path).await {
            tracing::warn!("Blob delete failed for thumbnail {}: {}", thumb.id, e);
        }
        storage.delete_file_row(thumb.id).await?;
    }
    storage.delete_file_row(file.id).await?;
    Ok(())
}

async fn rollback_thumbnail(storage: &Arc<dyn Storage>, blob: &Arc<dyn BlobStore>, id: i64) {
    if let Ok(Some(thumb)) = storage.get_file_by_id(id).await {
        let _ = blob.delete(&thumb.storage_path).await;
    }
    let _ = storage.delete_file_row(id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClassroomError;
    use crate::storage::sea_orm_storage::SeaOrmStorage;

    struct FailingBlobStore;

    #[async_trait::async_trait]
    impl BlobStore for FailingBlobStore {
        async fn write(&self, _path: &str, _bytes: &[u8]) -> Result<()> {
            Err(ClassroomError::storage_failure("disk full"))
        }

        async fn delete(&self, _path: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn memory_storage() -> Arc<dyn Storage> {
        Arc::new(
            SeaOrmStorage::new_with_url("sqlite::memory:", 1, 5)
                .await
                .unwrap(),
        )
    }

    fn upload(name: &str) -> NewUpload {
        NewUpload {
            file_name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: b"content".to_vec(),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_register_rolls_back_row_on_write_failure() {
        let storage = memory_storage().await;
        let blob: Arc<dyn BlobStore> = Arc::new(FailingBlobStore);
        let user = storage
            .create_user("teacher", crate::models::users::entities::UserRole::User, None)
            .await
            .unwrap();

        let result = register_file(&storage, &blob, user.id, &upload("essay.pdf")).await;
        assert!(result.is_err());

        // 回滚后没有悬空元数据
        let leftover = storage.get_file_by_id(1).await.unwrap();
        assert!(leftover.is_none());
    }

    #[tokio::test]
    async fn test_register_creates_unowned_row() {
        let storage = memory_storage().await;
        let dir = std::env::temp_dir().join(format!("classroom-reg-{}", Uuid::new_v4()));
        let blob: Arc<dyn BlobStore> =
            Arc::new(crate::storage::blob::LocalBlobStore::new(dir));
        let user = storage
            .create_user("student", crate::models::users::entities::UserRole::User, None)
            .await
            .unwrap();

        let file = register_file(&storage, &blob, user.id, &upload("answer.pdf"))
            .await
            .unwrap();
        assert!(file.owner_kind.is_none());
        assert!(file.owner_id.is_none());
        assert_eq!(file.file_size, 7);
    }
}
