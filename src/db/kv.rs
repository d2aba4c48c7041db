//! 键值读写子模块
//!
//! ## 职责
//! - 读取、写入（覆盖）、删除单个键
//!
//! ## 错误语义
//! - SQL 失败统一映射为 `AppError::Database`

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::AppError;

pub fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|e| AppError::Database(format!("读取键 '{}' 失败: {}", key, e)))
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )
    .map_err(|e| AppError::Database(format!("写入键 '{}' 失败: {}", key, e)))?;
    Ok(())
}

/// 删除键，返回是否确实删除了记录。
pub fn kv_delete(conn: &Connection, key: &str) -> Result<bool, AppError> {
    let affected = conn
        .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
        .map_err(|e| AppError::Database(format!("删除键 '{}' 失败: {}", key, e)))?;
    Ok(affected > 0)
}
