use std::sync::Arc;
use tracing::warn;

use crate::services::rooms::RoomRegistry;
use crate::storage::Storage;
use crate::storage::blob::BlobStore;

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub blob: Arc<dyn BlobStore>,
    pub rooms: Arc<RoomRegistry>,
}

/// 准备服务器启动的上下文
///
/// 房间注册表在这里构造一次，经由 `web::Data` 注入各处理器，
/// 进程内不存在全局单例。
pub async fn prepare_server_startup() -> StartupContext {
    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    let blob = crate::storage::blob::create_blob_store();
    warn!("Blob store initialized");

    let rooms = Arc::new(RoomRegistry::new());

    StartupContext {
        storage,
        blob,
        rooms,
    }
}
