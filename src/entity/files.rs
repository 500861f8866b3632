//! 文件实体
//!
//! 附件与批注共用同一张表，owner_kind 区分归属集合。
//! 刚注册、尚未挂接的文件没有归属；挂接后恰好属于一个归属集合，
//! 不跨归属共享。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_kind: Option<String>,
    pub owner_id: Option<i64>,
    pub file_name: String,
    pub mime_type: String,
    pub storage_path: String,
    pub file_size: i64,
    pub thumbnail_id: Option<i64>,
    pub uploaded_by: i64,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UploadedBy",
        to = "super::users::Column::Id"
    )]
    Uploader,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Uploader.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_file(self) -> crate::models::files::entities::File {
        use crate::models::files::entities::{File, FileOwnerKind};
        use chrono::{DateTime, Utc};
        use std::str::FromStr;

        File {
            id: self.id,
            owner_kind: self
                .owner_kind
                .as_deref()
                .and_then(|s| FileOwnerKind::from_str(s).ok()),
            owner_id: self.owner_id,
            file_name: self.file_name,
            mime_type: self.mime_type,
            storage_path: self.storage_path,
            file_size: self.file_size,
            thumbnail_id: self.thumbnail_id,
            uploaded_by: self.uploaded_by,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
