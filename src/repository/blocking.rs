// ==========================================
// 碳排放数据导入系统 - 阻塞查询调度
// ==========================================
// rusqlite 为同步 API，查询在阻塞线程池执行，
// 调用方的 tokio::time::timeout 才能在锁等待/慢查询时生效
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 在阻塞线程池中持锁执行查询
pub(crate) async fn with_connection<T, F>(
    conn: &Arc<Mutex<Connection>>,
    task: F,
) -> RepositoryResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> RepositoryResult<T> + Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        task(&guard)
    })
    .await?
}
