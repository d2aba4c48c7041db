//! 剪贴板模块
//!
//! # 设计思路
//!
//! 会话层只面对“剪贴板条目列表”：每个条目带一个 MIME 类型和原始字节，
//! 与浏览器粘贴事件里的 `items` 一致。粘贴时取第一个类型包含 `image` 的条目。
//!
//! # 实现思路
//!
//! - `ClipboardAccess` 抽象读写，生产实现 `SystemClipboard` 基于 `arboard`，
//!   `MemoryClipboard` 用于测试与无桌面环境。
//! - `arboard` 读出的是原始 RGBA 像素，这里统一编码为 PNG 条目。
//! - 剪贴板中没有对应内容（`ContentNotAvailable`）不算错误，只是没有条目。

use std::borrow::Cow;

use image::{DynamicImage, RgbaImage};

use crate::error::AppError;
use crate::image_handler::{ImageError, ImageHandler};

const PNG_MIME: &str = "image/png";
const TEXT_MIME: &str = "text/plain";

/// 一个剪贴板条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ClipboardItem {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(TEXT_MIME, text.as_bytes().to_vec())
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.contains("image")
    }
}

/// 第一个图片条目。
pub fn first_image(items: &[ClipboardItem]) -> Option<&ClipboardItem> {
    items.iter().find(|item| item.is_image())
}

pub trait ClipboardAccess: Send {
    fn read_items(&mut self) -> Result<Vec<ClipboardItem>, ImageError>;
    fn write_text(&mut self, text: &str) -> Result<(), AppError>;
}

/// 系统剪贴板。
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<arboard::Clipboard, String> {
        arboard::Clipboard::new().map_err(|e| format!("无法访问剪贴板：{}", e))
    }

    fn encode_rgba(image_data: arboard::ImageData<'_>) -> Result<Vec<u8>, ImageError> {
        let width = image_data.width as u32;
        let height = image_data.height as u32;
        let bytes: Cow<'_, [u8]> = image_data.bytes;
        let image = RgbaImage::from_raw(width, height, bytes.into_owned())
            .ok_or_else(|| ImageError::Clipboard("创建图像缓冲区失败".to_string()))?;
        ImageHandler::encode_png(&DynamicImage::ImageRgba8(image))
    }
}

impl ClipboardAccess for SystemClipboard {
    fn read_items(&mut self) -> Result<Vec<ClipboardItem>, ImageError> {
        let mut clipboard = Self::open().map_err(ImageError::Clipboard)?;
        let mut items = Vec::new();

        match clipboard.get_text() {
            Ok(text) => items.push(ClipboardItem::text(&text)),
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => log::debug!("读取剪贴板文本失败: {}", e),
        }

        match clipboard.get_image() {
            Ok(image_data) => {
                let (w, h) = (image_data.width, image_data.height);
                let png = Self::encode_rgba(image_data)?;
                log::debug!("📋 剪贴板图片 {}x{} -> PNG {}KB", w, h, png.len() / 1024);
                items.push(ClipboardItem::new(PNG_MIME, png));
            }
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => {
                return Err(ImageError::Clipboard(format!("读取剪贴板图片失败：{}", e)));
            }
        }

        Ok(items)
    }

    fn write_text(&mut self, text: &str) -> Result<(), AppError> {
        let mut clipboard = Self::open().map_err(AppError::Clipboard)?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| AppError::Clipboard(format!("写入文本失败: {}", e)))?;
        log::debug!("📋 已写入剪贴板文本 - 字符数: {}", text.chars().count());
        Ok(())
    }
}

/// 内存剪贴板。
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub items: Vec<ClipboardItem>,
    pub written: Vec<String>,
}

impl MemoryClipboard {
    pub fn with_items(items: Vec<ClipboardItem>) -> Self {
        Self {
            items,
            written: Vec::new(),
        }
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn read_items(&mut self) -> Result<Vec<ClipboardItem>, ImageError> {
        Ok(self.items.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), AppError> {
        self.written.push(text.to_string());
        Ok(())
    }
}
