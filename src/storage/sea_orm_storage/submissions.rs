//! 提交存储操作
//!
//! 状态切换与评分都是单条原子 UPDATE，避免并发教师/学生
//! 编辑下的读-改-写丢失更新。

use super::SeaOrmStorage;
use crate::entity::submissions::{ActiveModel, Column, Entity as Submissions};
use crate::errors::{ClassroomError, Result};
use crate::models::submissions::entities::Submission;
use sea_orm::sea_query::{Expr, ExprTrait, Func, SimpleExpr};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

impl SeaOrmStorage {
    /// 为一批学生创建空白提交记录
    ///
    /// 只在作业创建瞬间调用一次；之后的选课变动不会补建记录。
    pub async fn create_submissions_for_students_impl(
        &self,
        assignment_id: i64,
        student_ids: &[i64],
    ) -> Result<u64> {
        if student_ids.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let models = student_ids.iter().map(|&student_id| ActiveModel {
            assignment_id: Set(assignment_id),
            student_id: Set(student_id),
            submitted: Set(false),
            submitted_at: Set(None),
            returned: Set(false),
            grade: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });

        let affected = Submissions::insert_many(models)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("批量创建提交失败: {e}")))?;

        Ok(affected)
    }

    /// 通过 ID 获取提交
    pub async fn get_submission_by_id_impl(
        &self,
        submission_id: i64,
    ) -> Result<Option<Submission>> {
        let result = Submissions::find_by_id(submission_id)
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    /// 幂等获取或创建提交
    pub async fn get_or_create_submission_impl(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Submission> {
        if let Some(existing) = self
            .find_submission_impl(assignment_id, student_id)
            .await?
        {
            return Ok(existing);
        }

        let now = chrono::Utc::now().timestamp();
        let model = ActiveModel {
            assignment_id: Set(assignment_id),
            student_id: Set(student_id),
            submitted: Set(false),
            submitted_at: Set(None),
            returned: Set(false),
            grade: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(m) => Ok(m.into_submission()),
            // 并发的首次访问会撞 (assignment_id, student_id) 唯一索引，
            // 此时重新查询即可得到赢家创建的那一行。
            Err(_) => self
                .find_submission_impl(assignment_id, student_id)
                .await?
                .ok_or_else(|| {
                    ClassroomError::database_operation(format!(
                        "创建提交失败: assignment={assignment_id} student={student_id}"
                    ))
                }),
        }
    }

    /// 按 (作业, 学生) 查找提交
    pub async fn find_submission_impl(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        let result = Submissions::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .filter(Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    /// 列出作业下的全部提交
    pub async fn list_submissions_by_assignment_impl(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<Submission>> {
        let results = Submissions::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .all(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("查询提交列表失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_submission()).collect())
    }

    /// 切换提交状态（单条原子 UPDATE）
    ///
    /// 每次切换都盖章 submitted_at（包括取消提交）。
    /// preserve_first_instant 为 true 时改用 COALESCE 保留首次时间戳。
    /// returned = true 的行不会被更新：退回中的提交对学生只读。
    pub async fn toggle_submitted_impl(
        &self,
        submission_id: i64,
        preserve_first_instant: bool,
    ) -> Result<Option<Submission>> {
        let now = chrono::Utc::now().timestamp();

        let stamp: SimpleExpr = if preserve_first_instant {
            Func::coalesce([Expr::col(Column::SubmittedAt), Expr::val(now)]).into()
        } else {
            Expr::value(now)
        };

        let result = Submissions::update_many()
            .col_expr(Column::Submitted, Expr::col(Column::Submitted).not())
            .col_expr(Column::SubmittedAt, stamp)
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(submission_id))
            .filter(Column::Returned.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("切换提交状态失败: {e}")))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.get_submission_by_id_impl(submission_id).await
    }

    /// 切换退回状态（不触碰 submitted 与 submitted_at）
    pub async fn toggle_returned_impl(&self, submission_id: i64) -> Result<Option<Submission>> {
        let now = chrono::Utc::now().timestamp();

        let result = Submissions::update_many()
            .col_expr(Column::Returned, Expr::col(Column::Returned).not())
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(submission_id))
            .exec(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("切换退回状态失败: {e}")))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.get_submission_by_id_impl(submission_id).await
    }

    /// 写入成绩
    ///
    /// 截断已在协调层按 max_grade 完成，这里只做盲写。
    pub async fn set_grade_impl(&self, submission_id: i64, value: f64) -> Result<Option<Submission>> {
        let now = chrono::Utc::now().timestamp();

        let result = Submissions::update_many()
            .col_expr(Column::Grade, Expr::value(value))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(submission_id))
            .exec(&self.db)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("写入成绩失败: {e}")))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.get_submission_by_id_impl(submission_id).await
    }
}
