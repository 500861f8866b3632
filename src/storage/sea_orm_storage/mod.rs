//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assignments;
mod class_users;
mod classes;
mod files;
mod submissions;
mod users;

use crate::config::AppConfig;
use crate::errors::{ClassroomError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        Self::new_with_url(&config.database.url, config.database.pool_size, config.database.timeout)
            .await
    }

    /// 按指定 URL 创建（集成测试直接使用内存 SQLite）
    pub async fn new_with_url(url: &str, pool_size: u32, timeout: u64) -> Result<Self> {
        let db_url = Self::build_database_url(url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, pool_size, timeout).await?
        } else {
            Self::connect_generic(&db_url, pool_size, timeout).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| ClassroomError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, pool_size: u32, timeout: u64) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| ClassroomError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| ClassroomError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(
        url: &str,
        pool_size: u32,
        timeout: u64,
    ) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(timeout))
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| ClassroomError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        // sqlite: 与 sqlite:// 都接受，覆盖 sqlx 的 sqlite::memory: 写法
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(ClassroomError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
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
use crate::storage::Storage;

#[async_trait::async_trait]
impl Storage for SeaOrmStorage {
    async fn create_user(
        &self,
        username: &str,
        role: UserRole,
        display_name: Option<&str>,
    ) -> Result<User> {
        self.create_user_impl(username, role, display_name).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn create_class(&self, class_name: &str, teacher_id: i64) -> Result<Class> {
        self.create_class_impl(class_name, teacher_id).await
    }

    async fn get_class_by_id(&self, class_id: i64) -> Result<Option<Class>> {
        self.get_class_by_id_impl(class_id).await
    }

    async fn join_class(
        &self,
        user_id: i64,
        class_id: i64,
        role: ClassUserRole,
    ) -> Result<ClassUser> {
        self.join_class_impl(user_id, class_id, role).await
    }

    async fn get_class_user(&self, user_id: i64, class_id: i64) -> Result<Option<ClassUser>> {
        self.get_class_user_impl(user_id, class_id).await
    }

    async fn list_class_student_ids(&self, class_id: i64) -> Result<Vec<i64>> {
        self.list_class_student_ids_impl(class_id).await
    }

    async fn create_assignment(
        &self,
        class_id: i64,
        teacher_id: i64,
        req: &CreateAssignmentRequest,
    ) -> Result<Assignment> {
        self.create_assignment_impl(class_id, teacher_id, req).await
    }

    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        self.get_assignment_by_id_impl(assignment_id).await
    }

    async fn update_assignment(
        &self,
        assignment_id: i64,
        update: &UpdateAssignmentRequest,
    ) -> Result<Option<Assignment>> {
        self.update_assignment_impl(assignment_id, update).await
    }

    async fn delete_assignment_rows(&self, assignment_id: i64) -> Result<bool> {
        self.delete_assignment_rows_impl(assignment_id).await
    }

    async fn create_submissions_for_students(
        &self,
        assignment_id: i64,
        student_ids: &[i64],
    ) -> Result<u64> {
        self.create_submissions_for_students_impl(assignment_id, student_ids)
            .await
    }

    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>> {
        self.get_submission_by_id_impl(submission_id).await
    }

    async fn find_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        self.find_submission_impl(assignment_id, student_id).await
    }

    async fn get_or_create_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Submission> {
        self.get_or_create_submission_impl(assignment_id, student_id)
            .await
    }

    async fn list_submissions_by_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<Submission>> {
        self.list_submissions_by_assignment_impl(assignment_id).await
    }

    async fn toggle_submitted(
        &self,
        submission_id: i64,
        preserve_first_instant: bool,
    ) -> Result<Option<Submission>> {
        self.toggle_submitted_impl(submission_id, preserve_first_instant)
            .await
    }

    async fn toggle_returned(&self, submission_id: i64) -> Result<Option<Submission>> {
        self.toggle_returned_impl(submission_id).await
    }

    async fn set_grade(&self, submission_id: i64, value: f64) -> Result<Option<Submission>> {
        self.set_grade_impl(submission_id, value).await
    }

    async fn create_file(
        &self,
        file_name: &str,
        mime_type: &str,
        storage_path: &str,
        file_size: i64,
        thumbnail_id: Option<i64>,
        uploaded_by: i64,
    ) -> Result<File> {
        self.create_file_impl(
            file_name,
            mime_type,
            storage_path,
            file_size,
            thumbnail_id,
            uploaded_by,
        )
        .await
    }

    async fn get_file_by_id(&self, file_id: i64) -> Result<Option<File>> {
        self.get_file_by_id_impl(file_id).await
    }

    async fn attach_file(
        &self,
        file_id: i64,
        owner_kind: FileOwnerKind,
        owner_id: i64,
    ) -> Result<Option<File>> {
        self.attach_file_impl(file_id, owner_kind, owner_id).await
    }

    async fn list_files_by_owner(
        &self,
        owner_kind: FileOwnerKind,
        owner_id: i64,
    ) -> Result<Vec<File>> {
        self.list_files_by_owner_impl(owner_kind, owner_id).await
    }

    async fn list_files_by_owners(
        &self,
        owner_kinds: &[FileOwnerKind],
        owner_ids: &[i64],
    ) -> Result<Vec<File>> {
        self.list_files_by_owners_impl(owner_kinds, owner_ids).await
    }

    async fn delete_file_row(&self, file_id: i64) -> Result<bool> {
        self.delete_file_row_impl(file_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_database_url_accepts_sqlite_schemes() {
        // sqlx 的两种 sqlite 写法都直接放行
        assert_eq!(
            SeaOrmStorage::build_database_url("sqlite::memory:").unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("sqlite://data/app.db?mode=rwc").unwrap(),
            "sqlite://data/app.db?mode=rwc"
        );
    }

    #[test]
    fn test_build_database_url_infers_file_paths() {
        assert_eq!(
            SeaOrmStorage::build_database_url("classroom.db").unwrap(),
            "sqlite://classroom.db?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url(":memory:").unwrap(),
            "sqlite://:memory:?mode=rwc"
        );
    }

    #[test]
    fn test_build_database_url_rejects_unknown() {
        assert!(SeaOrmStorage::build_database_url("mongodb://localhost").is_err());
    }

    #[tokio::test]
    async fn test_new_with_url_memory_sqlite() {
        // 集成测试依赖的内存库写法必须能起库并跑完迁移
        let storage = SeaOrmStorage::new_with_url("sqlite::memory:", 1, 5)
            .await
            .unwrap();
        assert!(storage.get_user_by_id(1).await.unwrap().is_none());
    }
}
