//! 请求状态与会话快照。

use serde::Serialize;

use crate::cropper::CropSelection;
use crate::image_handler::{ImageResource, ObjectUrl};

/// 获取失败时展示给用户的唯一提示，具体原因只写日志。
pub const ACQUIRE_FAILED_MESSAGE: &str = "无法加载图片，请检查文件或链接后重试。";
/// 裁剪失败提示。
pub const CROP_FAILED_MESSAGE: &str = "处理裁剪失败。";
/// 识别失败且没有可用消息时的兜底提示。
pub const DEFAULT_ERROR_MESSAGE: &str = "发生未知错误，请重试。";

/// 识别请求生命周期状态，任一时刻只处于其中之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    Cropping,
    Loading,
    Success,
    Error,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Cropping => "cropping",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 当前图片的摘要信息。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSummary {
    pub object_url: ObjectUrl,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
}

impl From<&ImageResource> for ImageSummary {
    fn from(resource: &ImageResource) -> Self {
        Self {
            object_url: resource.object_url.clone(),
            mime_type: resource.mime_type.clone(),
            width: resource.width,
            height: resource.height,
            size_bytes: resource.bytes.len(),
        }
    }
}

/// 供展示层读取的只读视图。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: RequestState,
    pub raw_image: Option<ObjectUrl>,
    pub image: Option<ImageSummary>,
    pub selection: CropSelection,
    pub result: Option<String>,
    pub error: Option<String>,
    pub copied: bool,
    pub settings_open: bool,
    pub zoomed: bool,
    pub masked_key: String,
}
