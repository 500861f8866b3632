//! 文件存储操作

use super::SeaOrmStorage;
use crate::entity::files::{ActiveModel, Column, Entity as Files};
use crate::errors::{ClassroomError, Result};
use crate::models::files::entities::{File, FileOwnerKind};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};

impl SeaOrmStorage {
    /// 注册文件记录（尚无归属）
    pub async fn create_file_impl(
        &self,
        file_name: &str,
        mime_type: &str,
        storage_path: &str,
        file_size: i64,
        thumbnail_id: Option<i64>,
        uploaded_by: i64,
    ) -> Result<File> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            owner_kind: Set(None),
            owner_id: Set(None),
            file_name: Set(file_name.to_string()),
            mime_type: Set(mime_type.to_string()),
            storage_path: Set(storage_path.to_string()),
            file_size: Set(file_size),
            thumbnail_id: Set(thumbnail_id),
            uploaded_by: Set(uploaded_by),
            created_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("创建文件记录失败: {e}")))?;

        Ok(result.into_file())
    }

    /// 通过 ID 获取文件
    pub async fn get_file_by_id_impl(&self, file_id: i64) -> Result<Option<File>> {
        let result = Files::find_by_id(file_id)
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询文件失败: {e}")))?;

        Ok(result.map(|m| m.into_file()))
    }

    /// 把已注册的文件挂到归属集合
    pub async fn attach_file_impl(
        &self,
        file_id: i64,
        owner_kind: FileOwnerKind,
        owner_id: i64,
    ) -> Result<Option<File>> {
        let existing = Files::find_by_id(file_id)
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询文件失败: {e}")))?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        // 一个文件同一时刻只属于一个归属集合；重复挂回同一集合幂等
        let kind_str = owner_kind.to_string();
        if existing.owner_kind.is_some()
            && (existing.owner_kind.as_deref() != Some(kind_str.as_str())
                || existing.owner_id != Some(owner_id))
        {
            return Err(ClassroomError::conflict(format!(
                "文件 {file_id} 已挂接到其他归属集合"
            )));
        }

        let mut model = existing.into_active_model();
        model.owner_kind = Set(Some(kind_str));
        model.owner_id = Set(Some(owner_id));

        let result = model
            .update(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("挂接文件失败: {e}")))?;

        Ok(Some(result.into_file()))
    }

    /// 列出归属集合下的文件
    pub async fn list_files_by_owner_impl(
        &self,
        owner_kind: FileOwnerKind,
        owner_id: i64,
    ) -> Result<Vec<File>> {
        let results = Files::find()
            .filter(Column::OwnerKind.eq(owner_kind.to_string()))
            .filter(Column::OwnerId.eq(owner_id))
            .all(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询文件列表失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_file()).collect())
    }

    /// 列出多个归属实体下的文件（级联删除用）
    pub async fn list_files_by_owners_impl(
        &self,
        owner_kinds: &[FileOwnerKind],
        owner_ids: &[i64],
    ) -> Result<Vec<File>> {
        if owner_kinds.is_empty() || owner_ids.is_empty() {
            return Ok(Vec::new());
        }

        let kinds: Vec<String> = owner_kinds.iter().map(|k| k.to_string()).collect();
        let results = Files::find()
            .filter(Column::OwnerKind.is_in(kinds))
            .filter(Column::OwnerId.is_in(owner_ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询文件列表失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_file()).collect())
    }

    /// 删除文件记录
    pub async fn delete_file_row_impl(&self, file_id: i64) -> Result<bool> {
        let result = Files::delete_by_id(file_id)
            .exec(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("删除文件记录失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }
}
