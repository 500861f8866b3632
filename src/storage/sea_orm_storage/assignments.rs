//! 作业存储操作

use super::SeaOrmStorage;
use crate::entity::assignments::{ActiveModel, Entity as Assignments};
use crate::errors::{ClassroomError, Result};
use crate::models::assignments::{
    entities::Assignment,
    requests::{CreateAssignmentRequest, UpdateAssignmentRequest},
};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

impl SeaOrmStorage {
    /// 创建作业
    pub async fn create_assignment_impl(
        &self,
        class_id: i64,
        teacher_id: i64,
        req: &CreateAssignmentRequest,
    ) -> Result<Assignment> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            class_id: Set(class_id),
            teacher_id: Set(teacher_id),
            section_id: Set(req.section_id),
            title: Set(req.title.clone()),
            instructions: Set(req.instructions.clone()),
            due_date: Set(req.due_date.map(|d| d.timestamp())),
            graded: Set(req.graded.unwrap_or(true)),
            max_grade: Set(req.max_grade.unwrap_or(100.0)),
            weight: Set(req.weight.unwrap_or(1.0)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("创建作业失败: {e}")))?;

        Ok(result.into_assignment())
    }

    /// 通过 ID 获取作业
    pub async fn get_assignment_by_id_impl(
        &self,
        assignment_id: i64,
    ) -> Result<Option<Assignment>> {
        let result = Assignments::find_by_id(assignment_id)
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询作业失败: {e}")))?;

        Ok(result.map(|m| m.into_assignment()))
    }

    /// 更新作业
    pub async fn update_assignment_impl(
        &self,
        assignment_id: i64,
        update: &UpdateAssignmentRequest,
    ) -> Result<Option<Assignment>> {
        let existing = Assignments::find_by_id(assignment_id)
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询作业失败: {e}")))?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut model = existing.into_active_model();

        if let Some(title) = &update.title {
            model.title = Set(title.clone());
        }
        if let Some(instructions) = &update.instructions {
            model.instructions = Set(Some(instructions.clone()));
        }
        if let Some(due_date) = update.due_date {
            model.due_date = Set(Some(due_date.timestamp()));
        }
        if let Some(graded) = update.graded {
            model.graded = Set(graded);
        }
        if let Some(max_grade) = update.max_grade {
            model.max_grade = Set(max_grade);
        }
        if let Some(weight) = update.weight {
            model.weight = Set(weight);
        }
        if let Some(section_id) = update.section_id {
            model.section_id = Set(Some(section_id));
        }
        model.updated_at = Set(chrono::Utc::now().timestamp());

        let result = model
            .update(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("更新作业失败: {e}")))?;

        Ok(Some(result.into_assignment()))
    }

    /// 删除作业数据库行（提交记录经外键级联删除）
    ///
    /// 文件字节必须由调用方先行清理，见生命周期协调逻辑。
    pub async fn delete_assignment_rows_impl(&self, assignment_id: i64) -> Result<bool> {
        let result = Assignments::delete_by_id(assignment_id)
            .exec(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("删除作业失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }
}
