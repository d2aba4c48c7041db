//! # 密钥存储
//!
//! ## 设计思路
//!
//! 识别客户端不关心密钥存在哪里，只依赖 `CredentialStore` 的 `get/set/clear`。
//! 生产环境使用 SQLite 键值表（`SqliteCredentialStore`），测试使用内存实现。
//!
//! 取值优先级：已保存的密钥 > 构建时默认值（编译期环境变量 `OCRLENS_API_KEY`）。

use std::sync::{Arc, Mutex};

use crate::db::{self, DbState};

use super::RecognitionError;

/// 键值表中保存密钥使用的键名。
pub const API_KEY_STORAGE_KEY: &str = "ocrlens_apikey";

const NO_KEY_LABEL: &str = "未关联密钥";
const MASK_CHAR: char = '•';

pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<String>, RecognitionError>;
    fn set(&self, key: &str) -> Result<(), RecognitionError>;
    fn clear(&self) -> Result<(), RecognitionError>;
}

/// 内存实现。
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>, RecognitionError> {
        self.key
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| RecognitionError::CredentialStore("密钥锁已中毒".to_string()))
    }

    fn set(&self, key: &str) -> Result<(), RecognitionError> {
        let mut guard = self
            .key
            .lock()
            .map_err(|_| RecognitionError::CredentialStore("密钥锁已中毒".to_string()))?;
        *guard = Some(key.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), RecognitionError> {
        let mut guard = self
            .key
            .lock()
            .map_err(|_| RecognitionError::CredentialStore("密钥锁已中毒".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// SQLite 实现，密钥保存在 `kv_store` 表中。
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db: Arc<DbState>,
}

impl SqliteCredentialStore {
    pub fn new(db: Arc<DbState>) -> Self {
        Self { db }
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn get(&self) -> Result<Option<String>, RecognitionError> {
        self.db
            .with_conn(|conn| db::kv_get(conn, API_KEY_STORAGE_KEY))
            .map(|value| value.filter(|v| !v.is_empty()))
            .map_err(|e| RecognitionError::CredentialStore(e.to_string()))
    }

    fn set(&self, key: &str) -> Result<(), RecognitionError> {
        self.db
            .with_conn(|conn| db::kv_set(conn, API_KEY_STORAGE_KEY, key))
            .map_err(|e| RecognitionError::CredentialStore(e.to_string()))?;
        log::info!("🔑 API Key 已保存");
        Ok(())
    }

    fn clear(&self) -> Result<(), RecognitionError> {
        let removed = self
            .db
            .with_conn(|conn| db::kv_delete(conn, API_KEY_STORAGE_KEY))
            .map_err(|e| RecognitionError::CredentialStore(e.to_string()))?;
        if removed {
            log::info!("🔑 API Key 已清除");
        }
        Ok(())
    }
}

/// 编译期注入的默认密钥。
pub fn build_time_default_key() -> Option<String> {
    option_env!("OCRLENS_API_KEY")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// 界面展示用的脱敏密钥。
///
/// - 空：`未关联密钥`
/// - 不超过 12 个字符：12 个圆点
/// - 其余：前 6 位 + 8 个圆点 + 后 4 位
pub fn mask_api_key(key: Option<&str>) -> String {
    let Some(key) = key.filter(|k| !k.is_empty()) else {
        return NO_KEY_LABEL.to_string();
    };

    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return MASK_CHAR.to_string().repeat(12);
    }

    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, MASK_CHAR.to_string().repeat(8), tail)
}
