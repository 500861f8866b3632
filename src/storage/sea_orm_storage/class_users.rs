//! 班级成员存储操作

use super::SeaOrmStorage;
use crate::entity::class_users::{ActiveModel, Column, Entity as ClassUsers};
use crate::errors::{ClassroomError, Result};
use crate::models::class_users::entities::{ClassUser, ClassUserRole};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};

impl SeaOrmStorage {
    /// 加入班级
    pub async fn join_class_impl(
        &self,
        user_id: i64,
        class_id: i64,
        role: ClassUserRole,
    ) -> Result<ClassUser> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            class_id: Set(class_id),
            user_id: Set(user_id),
            role: Set(role.to_string()),
            joined_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("加入班级失败: {e}")))?;

        Ok(result.into_class_user())
    }

    /// 获取用户在班级中的成员关系
    ///
    /// 每次请求重新查询，不做任何缓存：成员关系随时可能变化。
    pub async fn get_class_user_impl(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> Result<Option<ClassUser>> {
        let result = ClassUsers::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ClassId.eq(class_id))
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询班级成员失败: {e}")))?;

        Ok(result.map(|m| m.into_class_user()))
    }

    /// 列出班级当前在册学生的用户 ID
    pub async fn list_class_student_ids_impl(&self, class_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = ClassUsers::find()
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Role.eq(ClassUserRole::Student.to_string()))
            .select_only()
            .column(Column::UserId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询班级学生失败: {e}")))?;

        Ok(ids)
    }
}
