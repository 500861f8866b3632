use std::sync::Arc;

use crate::models::{
    assignments::{
        entities::Assignment,
        requests::{CreateAssignmentRequest, UpdateAssignmentRequest},
    },
    class_users::entities::{ClassUser, ClassUserRole},
    classes::entities::Class,
    files::entities::{File, FileOwnerKind},
    submissions::entities::Submission,
    users::entities::{User, UserRole},
};

use crate::errors::Result;

pub mod blob;
pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户方法
    // 创建用户
    async fn create_user(
        &self,
        username: &str,
        role: UserRole,
        display_name: Option<&str>,
    ) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// 班级方法
    // 创建班级
    async fn create_class(&self, class_name: &str, teacher_id: i64) -> Result<Class>;
    // 通过ID获取班级信息
    async fn get_class_by_id(&self, class_id: i64) -> Result<Option<Class>>;

    /// 班级成员方法
    // 加入班级
    async fn join_class(
        &self,
        user_id: i64,
        class_id: i64,
        role: ClassUserRole,
    ) -> Result<ClassUser>;
    // 获取用户在班级中的成员关系（权限门的唯一成员查询入口）
    async fn get_class_user(&self, user_id: i64, class_id: i64) -> Result<Option<ClassUser>>;
    // 列出班级当前在册学生的用户 ID
    async fn list_class_student_ids(&self, class_id: i64) -> Result<Vec<i64>>;

    /// 作业方法
    // 创建作业
    async fn create_assignment(
        &self,
        class_id: i64,
        teacher_id: i64,
        req: &CreateAssignmentRequest,
    ) -> Result<Assignment>;
    // 通过ID获取作业
    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>>;
    // 更新作业
    async fn update_assignment(
        &self,
        assignment_id: i64,
        update: &UpdateAssignmentRequest,
    ) -> Result<Option<Assignment>>;
    // 删除作业及其提交记录（仅数据库行；文件字节由调用方先行清理）
    async fn delete_assignment_rows(&self, assignment_id: i64) -> Result<bool>;

    /// 提交方法
    // 为一批学生创建空白提交记录（作业创建瞬间的在册学生）
    async fn create_submissions_for_students(
        &self,
        assignment_id: i64,
        student_ids: &[i64],
    ) -> Result<u64>;
    // 通过ID获取提交
    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>>;
    // 按 (作业, 学生) 查找提交
    async fn find_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>>;
    // 幂等获取或创建提交（首次访问时创建）
    async fn get_or_create_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Submission>;
    // 列出作业下的全部提交
    async fn list_submissions_by_assignment(&self, assignment_id: i64)
    -> Result<Vec<Submission>>;
    // 切换提交状态并盖章 submitted_at（单条原子 UPDATE）
    async fn toggle_submitted(
        &self,
        submission_id: i64,
        preserve_first_instant: bool,
    ) -> Result<Option<Submission>>;
    // 切换退回状态（不触碰 submitted）
    async fn toggle_returned(&self, submission_id: i64) -> Result<Option<Submission>>;
    // 写入成绩（调用方已按 max_grade 截断）
    async fn set_grade(&self, submission_id: i64, value: f64) -> Result<Option<Submission>>;

    /// 文件方法
    // 注册文件记录（尚无归属）
    async fn create_file(
        &self,
        file_name: &str,
        mime_type: &str,
        storage_path: &str,
        file_size: i64,
        thumbnail_id: Option<i64>,
        uploaded_by: i64,
    ) -> Result<File>;
    // 通过ID获取文件
    async fn get_file_by_id(&self, file_id: i64) -> Result<Option<File>>;
    // 把已注册的文件挂到归属集合
    async fn attach_file(
        &self,
        file_id: i64,
        owner_kind: FileOwnerKind,
        owner_id: i64,
    ) -> Result<Option<File>>;
    // 列出归属集合下的文件
    async fn list_files_by_owner(
        &self,
        owner_kind: FileOwnerKind,
        owner_id: i64,
    ) -> Result<Vec<File>>;
    // 列出多个归属实体下的文件（级联删除用）
    async fn list_files_by_owners(
        &self,
        owner_kinds: &[FileOwnerKind],
        owner_ids: &[i64],
    ) -> Result<Vec<File>>;
    // 删除文件记录（注册回滚与 detach 共用）
    async fn delete_file_row(&self, file_id: i64) -> Result<bool>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
