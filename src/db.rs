//! 数据库模块
//!
//! # 设计思路
//!
//! 本地持久化只有一类数据：少量键值对（目前是识别服务的 API Key）。
//! 使用 `rusqlite` 直接操作 SQLite，表结构通过 `PRAGMA user_version` 版本化，
//! 便于以后追加迁移。
//!
//! # 实现思路
//!
//! - `DbState` 以 `Mutex<Connection>` 包装连接，可在线程间共享。
//! - 所有 SQL 集中在 `schema`（DDL/迁移）与 `kv`（读写）两个子模块。
//! - 错误统一映射为 `AppError::Database`。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::AppError;

mod kv;
mod schema;

pub use kv::{kv_delete, kv_get, kv_set};

const DB_FILE_NAME: &str = "ocrlens.db";

/// 数据库连接封装。
pub struct DbState(pub Mutex<Connection>);

impl DbState {
    pub fn new(conn: Connection) -> Self {
        Self(Mutex::new(conn))
    }

    pub(crate) fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let conn = self
            .0
            .lock()
            .map_err(|e| AppError::Database(format!("获取数据库锁失败: {}", e)))?;
        op(&conn)
    }
}

/// 数据目录下的数据库文件路径。
pub fn db_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE_NAME)
}

/// 初始化数据库连接与 Schema。
pub fn init_db(db_path: &Path) -> Result<Connection, AppError> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Database(format!("创建数据库目录失败: {}", e)))?;
    }
    log::info!("数据库路径: {}", db_path.display());

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Database(format!("打开数据库失败: {}", e)))?;

    schema::initialize_schema(&conn)?;

    Ok(conn)
}

/// 内存数据库，用于测试与无持久化场景。
pub fn open_in_memory() -> Result<Connection, AppError> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Database(format!("打开内存数据库失败: {}", e)))?;
    schema::initialize_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn init_db_creates_file_and_parent_dir() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("ocrlens-db-test-{nanos}"));
        let path = db_path_in(&dir.join("nested"));

        let conn = init_db(&path).expect("init db");
        kv_set(&conn, "k", "v").expect("write");
        drop(conn);

        assert!(path.exists());
        let reopened = init_db(&path).expect("reopen db");
        assert_eq!(kv_get(&reopened, "k").expect("read").as_deref(), Some("v"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn with_conn_runs_operation() {
        let state = DbState::new(open_in_memory().expect("memory db"));

        state
            .with_conn(|conn| kv_set(conn, "a", "1"))
            .expect("write through state");
        let value = state.with_conn(|conn| kv_get(conn, "a")).expect("read");

        assert_eq!(value.as_deref(), Some("1"));
    }
}
