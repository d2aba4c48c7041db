//! 用户设置模块
//!
//! # 设计思路
//!
//! 所有可调项集中在一个 JSON 文件 `settings.json` 中，按用途分为三段：
//! - `recognition`：识别语言与翻译开关
//! - `service`：识别服务地址、模型、温度与超时
//! - `network`：图片下载相关的超时、体积与内网访问开关
//!
//! # 实现思路
//!
//! - 每个字段都有 `#[serde(default)]`，旧文件缺字段时自动补默认值。
//! - 文件不存在视为默认设置；文件存在但无法解析时返回 `AppError::Storage`，
//!   不静默覆盖用户文件。
//! - 默认路径由 `storage::config_dir` 解析，可被 `--config` 覆盖。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::storage;

/// 识别语言设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// 源语言代码，`"auto"` 表示自动检测。
    pub source_language: String,
    pub translation_enabled: bool,
    /// 仅在开启翻译时生效。
    pub target_language: String,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            source_language: "auto".to_string(),
            translation_enabled: false,
            target_language: "pt".to_string(),
        }
    }
}

impl RecognitionSettings {
    /// 实际使用的目标语言；未开启翻译时为 `None`。
    pub fn effective_target(&self) -> Option<&str> {
        self.translation_enabled.then_some(self.target_language.as_str())
    }
}

/// 识别服务设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.1,
            request_timeout_secs: 90,
        }
    }
}

/// 图片下载设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub download_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_file_size_mb: u64,
    pub allow_private_network: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            download_timeout_secs: 30,
            connect_timeout_secs: 8,
            max_file_size_mb: 50,
            allow_private_network: false,
        }
    }
}

/// 应用设置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub recognition: RecognitionSettings,
    pub service: ServiceSettings,
    pub network: NetworkSettings,
}

impl AppSettings {
    /// 从指定路径读取设置，文件不存在时返回默认值。
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("设置文件不存在，使用默认设置: {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings = serde_json::from_str::<Self>(&content)
            .map_err(|e| AppError::Storage(format!("解析设置文件失败: {}", e)))?;

        log::info!("⚙️ 已加载设置: {}", path.display());
        Ok(settings)
    }

    /// 写入设置，自动创建父目录。
    pub fn save_to_path(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("创建设置目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Storage(format!("序列化设置失败: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }
}

/// 默认设置文件路径。
pub fn default_settings_path() -> Result<PathBuf, AppError> {
    Ok(storage::config_dir(None)?.join("settings.json"))
}
