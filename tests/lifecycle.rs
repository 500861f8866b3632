//! 作业/提交生命周期端到端测试
//!
//! 直接驱动业务层（存储 + 权限门 + 房间广播），不经过 HTTP 层。

use std::sync::Arc;

use classroom_live::errors::{ClassroomError, Result};
use classroom_live::models::assignments::requests::CreateAssignmentRequest;
use classroom_live::models::class_users::entities::ClassUserRole;
use classroom_live::models::classes::entities::Class;
use classroom_live::models::files::entities::FileOwnerKind;
use classroom_live::models::submissions::entities::SubmissionState;
use classroom_live::models::submissions::requests::SetGradeRequest;
use classroom_live::models::users::entities::{User, UserRole};
use classroom_live::services::authz::{self, AccessTier};
use classroom_live::services::files::register::NewUpload;
use classroom_live::services::files::{attach, remove};
use classroom_live::services::rooms::{RoomEventKind, RoomRegistry};
use classroom_live::services::{assignments, submissions};
use classroom_live::storage::blob::{BlobStore, LocalBlobStore};
use classroom_live::storage::sea_orm_storage::SeaOrmStorage;
use classroom_live::storage::Storage;

async fn memory_storage() -> Arc<dyn Storage> {
    Arc::new(
        SeaOrmStorage::new_with_url("sqlite::memory:", 1, 5)
            .await
            .unwrap(),
    )
}

fn temp_blob() -> Arc<dyn BlobStore> {
    let dir = std::env::temp_dir().join(format!("classroom-test-{}", uuid::Uuid::new_v4()));
    Arc::new(LocalBlobStore::new(dir))
}

/// delete 永远失败的字节存储，用来验证摘除的尽力语义
struct StickyBlobStore {
    inner: Arc<dyn BlobStore>,
}

#[async_trait::async_trait]
impl BlobStore for StickyBlobStore {
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.inner.write(path, bytes).await
    }

    async fn delete(&self, _path: &str) -> Result<()> {
        Err(ClassroomError::storage_failure("delete rejected"))
    }
}

struct Fixture {
    storage: Arc<dyn Storage>,
    blob: Arc<dyn BlobStore>,
    rooms: Arc<RoomRegistry>,
    teacher: User,
    students: Vec<User>,
    class: Class,
}

async fn classroom_with_students(count: usize) -> Fixture {
    let storage = memory_storage().await;
    let teacher = storage
        .create_user("teacher", UserRole::User, Some("王老师"))
        .await
        .unwrap();
    let class = storage.create_class("高一 3 班", teacher.id).await.unwrap();
    storage
        .join_class(teacher.id, class.id, ClassUserRole::Teacher)
        .await
        .unwrap();

    let mut students = Vec::new();
    for i in 0..count {
        let student = storage
            .create_user(&format!("student{i}"), UserRole::User, None)
            .await
            .unwrap();
        storage
            .join_class(student.id, class.id, ClassUserRole::Student)
            .await
            .unwrap();
        students.push(student);
    }

    Fixture {
        storage,
        blob: temp_blob(),
        rooms: Arc::new(RoomRegistry::new()),
        teacher,
        students,
        class,
    }
}

fn assignment_request(title: &str, max_grade: Option<f64>) -> CreateAssignmentRequest {
    CreateAssignmentRequest {
        title: title.to_string(),
        instructions: None,
        due_date: None,
        graded: Some(true),
        max_grade,
        weight: None,
        section_id: None,
        attachments: None,
    }
}

fn upload(name: &str) -> NewUpload {
    NewUpload {
        file_name: name.to_string(),
        mime_type: "application/pdf".to_string(),
        bytes: b"file content".to_vec(),
        thumbnail: None,
    }
}

#[tokio::test]
async fn test_assignment_creation_spawns_submissions_for_enrolled_students() {
    let fx = classroom_with_students(3).await;
    let mut rx = fx.rooms.join(fx.class.id);

    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("第一章习题", Some(100.0)),
    )
    .await
    .unwrap();

    let subs = fx
        .storage
        .list_submissions_by_assignment(created.assignment.id)
        .await
        .unwrap();
    assert_eq!(subs.len(), 3);
    assert!(subs.iter().all(|s| s.state() == SubmissionState::Draft));

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event, RoomEventKind::AssignmentCreated);
    assert_eq!(event.entity_id, created.assignment.id);
}

#[tokio::test]
async fn test_late_enrollment_does_not_backfill_submissions() {
    let fx = classroom_with_students(2).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("快照作业", None),
    )
    .await
    .unwrap();

    // 创建之后才入班的学生不会被回头补建提交
    let late_student = fx
        .storage
        .create_user("late", UserRole::User, None)
        .await
        .unwrap();
    fx.storage
        .join_class(late_student.id, fx.class.id, ClassUserRole::Student)
        .await
        .unwrap();

    let subs = fx
        .storage
        .list_submissions_by_assignment(created.assignment.id)
        .await
        .unwrap();
    assert_eq!(subs.len(), 2);
}

#[tokio::test]
async fn test_get_or_create_submission_is_idempotent() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];

    let first = submissions::fetch::get_or_create_submission(
        &fx.storage,
        student,
        created.assignment.id,
        student.id,
    )
    .await
    .unwrap();
    let second = submissions::fetch::get_or_create_submission(
        &fx.storage,
        student,
        created.assignment.id,
        student.id,
    )
    .await
    .unwrap();
    assert_eq!(first.submission.id, second.submission.id);
}

#[tokio::test]
async fn test_toggle_submit_stamps_timestamp_on_every_toggle() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    let submitted =
        submissions::submit::toggle_submit(&fx.storage, &fx.rooms, student, sub.id, false)
            .await
            .unwrap();
    assert!(submitted.submission.submitted);
    assert!(submitted.submission.submitted_at.is_some());

    // 取消提交同样盖章，时间戳反映最近一次切换
    let unsubmitted =
        submissions::submit::toggle_submit(&fx.storage, &fx.rooms, student, sub.id, false)
            .await
            .unwrap();
    assert!(!unsubmitted.submission.submitted);
    assert!(unsubmitted.submission.submitted_at.is_some());
    assert!(unsubmitted.submission.submitted_at >= submitted.submission.submitted_at);
}

#[tokio::test]
async fn test_preserve_first_instant_keeps_original_stamp() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    let first = submissions::submit::toggle_submit(&fx.storage, &fx.rooms, student, sub.id, true)
        .await
        .unwrap();
    let second = submissions::submit::toggle_submit(&fx.storage, &fx.rooms, student, sub.id, true)
        .await
        .unwrap();
    assert_eq!(
        first.submission.submitted_at,
        second.submission.submitted_at
    );
}

#[tokio::test]
async fn test_returned_submission_blocks_student_toggle() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    let returned =
        submissions::toggle_return::toggle_return(&fx.storage, &fx.rooms, &fx.teacher, sub.id)
            .await
            .unwrap();
    assert_eq!(returned.state, SubmissionState::Returned);

    let err = submissions::submit::toggle_submit(&fx.storage, &fx.rooms, student, sub.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClassroomError::Conflict(_)));

    // 教师解除退回后学生可以继续切换
    submissions::toggle_return::toggle_return(&fx.storage, &fx.rooms, &fx.teacher, sub.id)
        .await
        .unwrap();
    submissions::submit::toggle_submit(&fx.storage, &fx.rooms, student, sub.id, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_grade_is_clamped_not_rejected() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", Some(100.0)),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    // 教师可以在学生提交之前评分，越界值截断到边界
    let graded = submissions::grade::set_grade(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        sub.id,
        SetGradeRequest { value: 150.0 },
    )
    .await
    .unwrap();
    assert_eq!(graded.submission.grade, Some(100.0));

    let graded = submissions::grade::set_grade(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        sub.id,
        SetGradeRequest { value: -5.0 },
    )
    .await
    .unwrap();
    assert_eq!(graded.submission.grade, Some(0.0));
}

#[tokio::test]
async fn test_student_cannot_grade_or_return() {
    let fx = classroom_with_students(2).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", Some(100.0)),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let other = &fx.students[1];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    // 班级成员但层级不足：权限拒绝，不是 NOT FOUND
    let err = submissions::grade::set_grade(
        &fx.storage,
        &fx.rooms,
        student,
        sub.id,
        SetGradeRequest { value: 60.0 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClassroomError::Authorization(_)));

    // 同班同学也不能替别人切换提交
    let err = submissions::submit::toggle_submit(&fx.storage, &fx.rooms, other, sub.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClassroomError::Authorization(_)));
}

#[tokio::test]
async fn test_invisible_resources_read_as_not_found() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();

    // 班级之外的用户看不到作业的存在
    let outsider = fx
        .storage
        .create_user("outsider", UserRole::User, None)
        .await
        .unwrap();
    let err = submissions::fetch::get_or_create_submission(
        &fx.storage,
        &outsider,
        created.assignment.id,
        outsider.id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClassroomError::NotFound(_)));
}

#[tokio::test]
async fn test_authorization_monotonicity_for_admin() {
    let fx = classroom_with_students(0).await;
    let admin = fx
        .storage
        .create_user("root", UserRole::Admin, None)
        .await
        .unwrap();

    // 管理员层级放行蕴含所有更低层级放行
    for tier in [
        AccessTier::InstitutionAdmin,
        AccessTier::ClassTeacher,
        AccessTier::ClassMember,
    ] {
        let decision = authz::check(&fx.storage, admin.id, fx.class.id, tier)
            .await
            .unwrap();
        assert!(decision.is_allowed(), "admin denied at {tier:?}");
    }
}

#[tokio::test]
async fn test_attach_and_remove_submission_files() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    let attached = attach::attach_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        student,
        FileOwnerKind::SubmissionAttachment,
        sub.id,
        vec![upload("answer.pdf"), upload("notes.pdf")],
    )
    .await
    .unwrap();
    assert_eq!(attached.attached.len(), 2);
    assert!(attached.failed.is_empty());

    let fetched = submissions::fetch::get_or_create_submission(
        &fx.storage,
        student,
        created.assignment.id,
        student.id,
    )
    .await
    .unwrap();
    assert_eq!(fetched.attachments.len(), 2);

    let file_ids: Vec<i64> = attached.attached.iter().map(|f| f.id).collect();
    remove::remove_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        student,
        FileOwnerKind::SubmissionAttachment,
        sub.id,
        file_ids.clone(),
    )
    .await
    .unwrap();

    for id in file_ids {
        assert!(fx.storage.get_file_by_id(id).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_detach_succeeds_when_blob_delete_fails() {
    let fx = classroom_with_students(1).await;
    let sticky: Arc<dyn BlobStore> = Arc::new(StickyBlobStore {
        inner: fx.blob.clone(),
    });
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    // 教师批注文件，随后在字节删除失败的情况下摘除
    let attached = attach::attach_files(
        &fx.storage,
        &sticky,
        &fx.rooms,
        &fx.teacher,
        FileOwnerKind::SubmissionAnnotation,
        sub.id,
        vec![upload("feedback.pdf")],
    )
    .await
    .unwrap();
    assert_eq!(attached.attached.len(), 1);
    let file_id = attached.attached[0].id;

    remove::remove_files(
        &fx.storage,
        &sticky,
        &fx.rooms,
        &fx.teacher,
        FileOwnerKind::SubmissionAnnotation,
        sub.id,
        vec![file_id],
    )
    .await
    .unwrap();

    // 元数据照常移除，操作对用户来说是成功的
    assert!(fx.storage.get_file_by_id(file_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cross_owner_detach_is_skipped() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    let attached = attach::attach_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        student,
        FileOwnerKind::SubmissionAttachment,
        sub.id,
        vec![upload("mine.pdf")],
    )
    .await
    .unwrap();
    let file_id = attached.attached[0].id;

    // 用错误的归属集合摘除：文件原样保留
    remove::remove_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        &fx.teacher,
        FileOwnerKind::SubmissionAnnotation,
        sub.id,
        vec![file_id],
    )
    .await
    .unwrap();
    assert!(fx.storage.get_file_by_id(file_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_assignment_cascades_to_files_and_submissions() {
    let fx = classroom_with_students(2).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("期末作业", None),
    )
    .await
    .unwrap();
    let assignment_id = created.assignment.id;
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(assignment_id, student.id)
        .await
        .unwrap();

    // 作业附件 + 学生作答 + 教师批注各挂一个文件
    let a = attach::attach_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        &fx.teacher,
        FileOwnerKind::AssignmentAttachment,
        assignment_id,
        vec![upload("题目.pdf")],
    )
    .await
    .unwrap();
    let b = attach::attach_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        student,
        FileOwnerKind::SubmissionAttachment,
        sub.id,
        vec![upload("作答.pdf")],
    )
    .await
    .unwrap();
    let c = attach::attach_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        &fx.teacher,
        FileOwnerKind::SubmissionAnnotation,
        sub.id,
        vec![upload("批注.pdf")],
    )
    .await
    .unwrap();
    let all_ids: Vec<i64> = [&a, &b, &c]
        .iter()
        .flat_map(|r| r.attached.iter().map(|f| f.id))
        .collect();

    assignments::delete::delete_assignment(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        &fx.teacher,
        assignment_id,
    )
    .await
    .unwrap();

    // 没有孤儿文件元数据，子提交一并消失
    for id in all_ids {
        assert!(fx.storage.get_file_by_id(id).await.unwrap().is_none());
    }
    assert!(
        fx.storage
            .get_submission_by_id(sub.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        fx.storage
            .get_assignment_by_id(assignment_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_room_subscriber_sees_submission_update_without_polling() {
    let fx = classroom_with_students(1).await;
    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let student = &fx.students[0];
    let sub = fx
        .storage
        .get_or_create_submission(created.assignment.id, student.id)
        .await
        .unwrap();

    // 另一个会话加入同一班级房间
    let mut rx = fx.rooms.join(fx.class.id);

    submissions::submit::toggle_submit(&fx.storage, &fx.rooms, student, sub.id, false)
        .await
        .unwrap();

    let event = rx.try_recv().unwrap();
    assert_eq!(event.event, RoomEventKind::SubmissionUpdated);
    assert_eq!(event.entity_id, sub.id);
    assert_eq!(event.entity["submitted"], serde_json::json!(true));

    // 恰好一条，不重复投递
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_assignment_attachments_locked_to_owning_teacher() {
    let fx = classroom_with_students(0).await;
    let co_teacher = fx
        .storage
        .create_user("co-teacher", UserRole::User, None)
        .await
        .unwrap();
    fx.storage
        .join_class(co_teacher.id, fx.class.id, ClassUserRole::Teacher)
        .await
        .unwrap();

    let created = assignments::create::create_assignment(
        &fx.storage,
        &fx.rooms,
        &fx.teacher,
        fx.class.id,
        assignment_request("作业", None),
    )
    .await
    .unwrap();
    let assignment_id = created.assignment.id;

    let attached = attach::attach_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        &fx.teacher,
        FileOwnerKind::AssignmentAttachment,
        assignment_id,
        vec![upload("题目.pdf")],
    )
    .await
    .unwrap();
    let file_id = attached.attached[0].id;

    // 同班另一位教师既不能追加也不能摘除作业附件
    let err = attach::attach_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        &co_teacher,
        FileOwnerKind::AssignmentAttachment,
        assignment_id,
        vec![upload("夹带.pdf")],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClassroomError::Authorization(_)));

    let err = remove::remove_files(
        &fx.storage,
        &fx.blob,
        &fx.rooms,
        &co_teacher,
        FileOwnerKind::AssignmentAttachment,
        assignment_id,
        vec![file_id],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClassroomError::Authorization(_)));
    assert!(fx.storage.get_file_by_id(file_id).await.unwrap().is_some());
}
