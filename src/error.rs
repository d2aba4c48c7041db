//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 各层保留各自的类型化错误（`ImageError`、`RecognitionError`），
//! 应用层汇总为 `AppError`，供命令行与会话边界统一处理。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为下层错误提供 `From` 转换，`?` 直接向上传播。
//! - 实现 `Serialize` 将错误序列化为字符串，便于 JSON 输出。

use serde::Serialize;

use crate::image_handler::ImageError;
use crate::recognition::RecognitionError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 图片处理流水线错误（获取 / 解码 / 裁剪）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文字识别错误
    #[error("{0}")]
    Recognition(#[from] RecognitionError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置或数据目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 数据库操作失败
    #[error("数据库错误: {0}")]
    Database(String),

    /// 命令行参数无效
    #[error("参数无效: {0}")]
    InvalidArgument(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
