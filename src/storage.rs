//! 应用目录管理模块
//!
//! # 设计思路
//!
//! 统一管理配置目录与数据目录，支持命令行自定义目录，
//! 并在目录不存在时自动创建。
//!
//! # 实现思路
//!
//! - 优先使用用户指定的目录。
//! - 未指定时回退到系统目录（`dirs::config_dir` / `dirs::data_dir`）下的 `ocrlens` 子目录。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

const APP_DIR_NAME: &str = "ocrlens";

fn ensure_dir(path: PathBuf, label: &str) -> Result<PathBuf, AppError> {
    if !path.exists() {
        fs::create_dir_all(&path).map_err(|e| {
            AppError::Storage(format!("创建{}目录 '{}' 失败: {}", label, path.display(), e))
        })?;
    }
    Ok(path)
}

fn resolve_dir(
    custom_dir: Option<&Path>,
    system_dir: Option<PathBuf>,
    label: &str,
) -> Result<PathBuf, AppError> {
    // 优先使用用户自定义目录
    if let Some(dir) = custom_dir.filter(|d| !d.as_os_str().is_empty()) {
        return ensure_dir(dir.to_path_buf(), label);
    }

    let base = system_dir
        .ok_or_else(|| AppError::Storage(format!("无法确定系统{}目录", label)))?;
    ensure_dir(base.join(APP_DIR_NAME), label)
}

/// 获取配置目录。
pub fn config_dir(custom_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    resolve_dir(custom_dir, dirs::config_dir(), "配置")
}

/// 获取数据目录（数据库所在位置）。
pub fn data_dir(custom_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    resolve_dir(custom_dir, dirs::data_dir(), "数据")
}

/// 将导出的图片写入磁盘，自动创建父目录。
pub fn write_image(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Storage(format!("创建图片目录失败: {}", e)))?;
    }
    fs::write(path, bytes)?;
    log::info!("💾 已保存图片: {} ({} 字节)", path.display(), bytes.len());
    Ok(())
}
