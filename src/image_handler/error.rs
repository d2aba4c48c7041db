//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图片链路（获取 → 解码 → 裁剪 → 编码）中的所有错误来源，
//! 避免字符串拼接式错误处理。通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 会话层不会把这些细节直接展示给用户：获取失败统一折叠为一条通用提示，
//! 裁剪失败统一折叠为“处理裁剪失败”，详细原因只进入日志。

/// 图片处理统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("剪贴板错误：{0}")]
    Clipboard(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 对象 URL 已被回收或从未登记。
    #[error("图片资源不存在：{0}")]
    MissingResource(String),
}

impl ImageError {
    /// 错误所属阶段，仅用于日志聚合。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Timeout(_) => "download",
            Self::FileSystem(_) | Self::Clipboard(_) | Self::MissingResource(_) => "load",
            Self::InvalidFormat(_) | Self::ResourceLimit(_) => "validate",
            Self::Decode(_) => "decode",
        }
    }
}
