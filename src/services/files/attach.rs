use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use futures_util::TryStreamExt;
use futures_util::stream::StreamExt;
use std::path::Path;
use std::sync::Arc;

use super::register::{self, NewUpload};
use super::{FileService, OwnerChain, authorize_owner, emit_owner_changed};
use crate::config::AppConfig;
use crate::errors::Result;
use crate::middlewares::RequireJWT;
use crate::models::files::entities::FileOwnerKind;
use crate::models::files::responses::{AttachFilesResponse, FileInfo};
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::rooms::RoomRegistry;
use crate::storage::Storage;
use crate::storage::blob::BlobStore;

/// 批量挂接：逐文件注册并挂到归属集合
///
/// 逐文件独立：一个文件的存储失败不影响同批其余文件。注册成功
/// 但挂接失败的文件会被整体丢弃（字节与元数据一起回滚）。挂接
/// 至少成功一个文件时，向班级房间广播一次归属实体的完整状态。
pub async fn attach_files(
    storage: &Arc<dyn Storage>,
    blob: &Arc<dyn BlobStore>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    owner_kind: FileOwnerKind,
    owner_id: i64,
    uploads: Vec<NewUpload>,
) -> Result<AttachFilesResponse> {
    let chain = authorize_owner(storage, actor, owner_kind, owner_id).await?;

    let results = futures_util::future::join_all(
        uploads
            .iter()
            .map(|upload| attach_one(storage, blob, actor.id, &chain, upload)),
    )
    .await;

    let mut attached = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(info) => attached.push(info),
            Err(msg) => failed.push(msg),
        }
    }

    if !attached.is_empty() {
        emit_owner_changed(storage, rooms, &chain).await?;
    }

    Ok(AttachFilesResponse { attached, failed })
}

async fn attach_one(
    storage: &Arc<dyn Storage>,
    blob: &Arc<dyn BlobStore>,
    actor_id: i64,
    chain: &OwnerChain,
    upload: &NewUpload,
) -> std::result::Result<FileInfo, String> {
    let file = register::register_file(storage, blob, actor_id, upload)
        .await
        .map_err(|e| format!("{}: {}", upload.file_name, e.message()))?;

    match storage.attach_file(file.id, chain.kind, chain.owner_id).await {
        Ok(Some(attached)) => Ok(attached.into()),
        Ok(None) => {
            let _ = register::discard_file(storage, blob, &file).await;
            Err(format!("{}: file row vanished before attach", upload.file_name))
        }
        Err(e) => {
            let _ = register::discard_file(storage, blob, &file).await;
            Err(format!("{}: {}", upload.file_name, e.message()))
        }
    }
}

/// POST /api/v1/files/{owner_kind}/{owner_id}
pub async fn handle_attach(
    service: &FileService,
    request: &HttpRequest,
    owner_kind: FileOwnerKind,
    owner_id: i64,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let actor = match RequireJWT::extract_user_claims(request) {
        Some(user) => user,
        None => {
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
        }
    };

    let config = AppConfig::get();
    let max_size = config.upload.max_size;
    let allowed_types = &config.upload.allowed_types;

    // 逐文件收集；校验失败的文件记入 failed，不拖垮同批其余文件
    let mut uploads: Vec<NewUpload> = Vec::new();
    let mut rejected: Vec<String> = Vec::new();

    while let Ok(Some(mut field)) = payload.try_next().await {
        let content_disposition = field.content_disposition();
        let name = content_disposition
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        if name != "file" {
            continue;
        }

        let file_name = content_disposition
            .and_then(|cd| cd.get_filename())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let extension = Path::new(&file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();
        if !allowed_types.iter().any(|t| t.to_lowercase() == extension) {
            rejected.push(format!("{file_name}: file type not allowed"));
            continue;
        }

        let mime_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_default();

        let mut bytes: Vec<u8> = Vec::new();
        let mut oversized = false;
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if bytes.len() + data.len() > max_size {
                oversized = true;
                break;
            }
            bytes.extend_from_slice(&data);
        }
        if oversized {
            rejected.push(format!("{file_name}: file size exceeds the limit"));
            continue;
        }

        uploads.push(NewUpload {
            file_name,
            mime_type,
            bytes,
            thumbnail: None,
        });
    }

    if uploads.is_empty() && rejected.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::FileNotFound,
            "No file found in upload payload",
        )));
    }

    let storage = service.get_storage(request);
    let blob = service.get_blob(request);
    let rooms = service.get_rooms(request);

    match attach_files(&storage, &blob, &rooms, &actor, owner_kind, owner_id, uploads).await {
        Ok(mut response) => {
            response.failed.extend(rejected);
            Ok(HttpResponse::Ok().json(ApiResponse::success(response, "文件挂接完成")))
        }
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
