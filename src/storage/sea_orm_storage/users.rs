//! 用户存储操作

use super::SeaOrmStorage;
use crate::entity::users::{ActiveModel, Entity as Users};
use crate::errors::{ClassroomError, Result};
use crate::models::users::entities::{User, UserRole};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

impl SeaOrmStorage {
    /// 创建用户
    pub async fn create_user_impl(
        &self,
        username: &str,
        role: UserRole,
        display_name: Option<&str>,
    ) -> Result<User> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            username: Set(username.to_string()),
            role: Set(role.to_string()),
            display_name: Set(display_name.map(|s| s.to_string())),
            created_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("创建用户失败: {e}")))?;

        Ok(result.into_user())
    }

    /// 通过 ID 获取用户
    pub async fn get_user_by_id_impl(&self, id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }
}
