//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载、已校验签名但未解码的字节
//! - `ImageResource` 表示可展示、可上传的图片（对象 URL + Base64 + MIME）

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::object_url::ObjectUrl;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 网络地址来源。
    Url(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(String),
    /// 剪贴板中取出的图片字节（已带 MIME 类型）。
    Pasted { bytes: Vec<u8>, mime_type: String },
}

impl ImageSource {
    /// 来源提示（用于日志与诊断）。
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Base64(_) => "base64",
            Self::FilePath(_) => "file",
            Self::Pasted { .. } => "clipboard",
        }
    }
}

/// 加载阶段输出：原始字节、识别出的 MIME 类型与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 根据文件签名识别出的 MIME 类型。
    pub(crate) mime_type: String,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 一张可展示、可发送给识别服务的图片。
///
/// `base64` 与 `mime_type` 始终描述同一份 `bytes`。
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub object_url: ObjectUrl,
    pub base64: String,
    pub mime_type: String,
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

impl ImageResource {
    pub(crate) fn new(object_url: ObjectUrl, bytes: Bytes, mime_type: String, width: u32, height: u32) -> Self {
        let base64 = general_purpose::STANDARD.encode(&bytes);
        Self {
            object_url,
            base64,
            mime_type,
            bytes,
            width,
            height,
        }
    }

    /// 以 Data URL 形式输出，便于宿主直接渲染。
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}
