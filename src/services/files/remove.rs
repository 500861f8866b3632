use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{FileService, OwnerChain, authorize_owner, emit_owner_changed, register};
use crate::errors::Result;
use crate::middlewares::RequireJWT;
use crate::models::files::entities::FileOwnerKind;
use crate::models::files::requests::RemoveFilesRequest;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::rooms::RoomRegistry;
use crate::storage::Storage;
use crate::storage::blob::BlobStore;

/// 批量摘除：从归属集合移除文件并回收字节
///
/// 摘除是尽力幂等的：字节删除失败（比如文件早已不在）只记警告，
/// 元数据照常移除。对用户来说删除总是成功，不会卡在存储一致性上。
/// 不属于该归属集合的文件 ID 记警告后跳过，不拖垮同批其余文件。
pub async fn remove_files(
    storage: &Arc<dyn Storage>,
    blob: &Arc<dyn BlobStore>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    owner_kind: FileOwnerKind,
    owner_id: i64,
    file_ids: Vec<i64>,
) -> Result<()> {
    let chain = authorize_owner(storage, actor, owner_kind, owner_id).await?;

    let results = futures_util::future::join_all(
        file_ids
            .iter()
            .map(|&file_id| detach_one(storage, blob, &chain, file_id)),
    )
    .await;

    let removed = results.iter().filter(|r| matches!(r, Ok(true))).count();
    for result in results {
        if let Err(e) = result {
            tracing::warn!("Detach failed: {}", e);
        }
    }

    if removed > 0 {
        emit_owner_changed(storage, rooms, &chain).await?;
    }

    Ok(())
}

/// 摘除单个文件，返回是否确实移除了记录
async fn detach_one(
    storage: &Arc<dyn Storage>,
    blob: &Arc<dyn BlobStore>,
    chain: &OwnerChain,
    file_id: i64,
) -> Result<bool> {
    let Some(file) = storage.get_file_by_id(file_id).await? else {
        tracing::warn!("Detach skipped: file {} not found", file_id);
        return Ok(false);
    };

    // 只允许摘除确实挂在该归属集合下的文件
    if file.owner_kind != Some(chain.kind) || file.owner_id != Some(chain.owner_id) {
        tracing::warn!(
            "Detach skipped: file {} does not belong to {} {}",
            file_id,
            chain.kind,
            chain.owner_id
        );
        return Ok(false);
    }

    register::discard_file(storage, blob, &file).await?;
    Ok(true)
}

/// DELETE /api/v1/files/{owner_kind}/{owner_id}
pub async fn handle_remove(
    service: &FileService,
    request: &HttpRequest,
    owner_kind: FileOwnerKind,
    owner_id: i64,
    req: RemoveFilesRequest,
) -> ActixResult<HttpResponse> {
    let actor = match RequireJWT::extract_user_claims(request) {
        Some(user) => user,
        None => {
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
        }
    };

    let storage = service.get_storage(request);
    let blob = service.get_blob(request);
    let rooms = service.get_rooms(request);

    match remove_files(
        &storage,
        &blob,
        &rooms,
        &actor,
        owner_kind,
        owner_id,
        req.file_ids,
    )
    .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("文件已移除"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
