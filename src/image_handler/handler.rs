//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排、配置管理与对象 URL 登记，不直接与会话状态绑定。
//! 获取链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节（含签名校验）
//! 3. 读取图片头尺寸，确认可解码
//! 4. 登记为对象 URL
//!
//! ## 实现思路
//!
//! - 配置在创建时固定，以 `Arc` 共享给克隆出的处理器。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 对象 URL 登记表通过 `Arc<Mutex<_>>` 共享，裁剪与获取共用同一张表。
//! - 记录 `load/inspect/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;

use super::object_url::{ObjectUrl, ObjectUrlRegistry, StoredBlob};
use super::{ImageConfig, ImageError, ImageSource};

/// 图片处理器。
#[derive(Clone)]
pub struct ImageHandler {
    pub(super) config: Arc<ImageConfig>,
    pub(super) object_urls: Arc<Mutex<ObjectUrlRegistry>>,
}

impl ImageHandler {
    /// 根据初始配置创建处理器。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use ocrlens::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// # Ok::<(), ocrlens::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        Ok(Self {
            config: Arc::new(config),
            object_urls: Arc::new(Mutex::new(ObjectUrlRegistry::new())),
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub(super) fn config_snapshot(&self) -> ImageConfig {
        ImageConfig::clone(&self.config)
    }

    /// 获取入口：从任意来源加载原图并登记为对象 URL。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use ocrlens::image_handler::{ImageConfig, ImageHandler, ImageSource};
    ///
    /// # async fn demo() -> Result<(), ocrlens::image_handler::ImageError> {
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// let url = handler
    ///     .acquire(ImageSource::FilePath("/tmp/receipt.png".into()))
    ///     .await?;
    /// println!("{url}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn acquire(&self, source: ImageSource) -> Result<ObjectUrl, ImageError> {
        let config = self.config_snapshot();
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = match source {
            ImageSource::Url(url) => self.load_from_url(&url, &config).await?,
            ImageSource::Base64(data) => self.load_from_base64(&data, &config)?,
            ImageSource::FilePath(path) => self.load_from_file(&path, &config)?,
            ImageSource::Pasted { bytes, mime_type } => {
                self.load_from_pasted(bytes, &mime_type, &config)?
            }
        };
        let load_elapsed = load_start.elapsed();

        let inspect_start = Instant::now();
        let (width, height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        let inspect_elapsed = inspect_start.elapsed();

        let object_url = self.register(Bytes::from(raw.bytes), raw.mime_type.clone())?;

        log::info!(
            "✅ 图片获取完成 - 来源: {} 类型: {} 尺寸: {}x{} load={}ms inspect={}ms total={}ms",
            raw.source_hint,
            raw.mime_type,
            width,
            height,
            load_elapsed.as_millis(),
            inspect_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(object_url)
    }

    /// 登记一份字节，返回新的对象 URL。
    pub fn register(&self, bytes: Bytes, mime_type: impl Into<String>) -> Result<ObjectUrl, ImageError> {
        let mut registry = self
            .object_urls
            .lock()
            .map_err(|_| ImageError::ResourceLimit("对象 URL 登记表锁已中毒".to_string()))?;
        Ok(registry.create(bytes, mime_type))
    }

    /// 解析对象 URL 对应的字节。
    pub fn resolve(&self, url: &ObjectUrl) -> Result<StoredBlob, ImageError> {
        let registry = self
            .object_urls
            .lock()
            .map_err(|_| ImageError::ResourceLimit("对象 URL 登记表锁已中毒".to_string()))?;
        registry
            .resolve(url)
            .ok_or_else(|| ImageError::MissingResource(url.to_string()))
    }

    /// 读取对象 URL 对应图片的原始尺寸（只解析图片头）。
    pub fn dimensions(&self, url: &ObjectUrl) -> Result<(u32, u32), ImageError> {
        let blob = self.resolve(url)?;
        Self::inspect_dimensions_from_memory(&blob.bytes)
    }

    /// 回收对象 URL；锁中毒时只记录日志。
    pub fn revoke(&self, url: &ObjectUrl) {
        match self.object_urls.lock() {
            Ok(mut registry) => {
                if registry.revoke(url) {
                    log::debug!("🧹 已回收对象 URL: {}", url);
                }
            }
            Err(_) => log::warn!("⚠️ 对象 URL 登记表锁已中毒，回收失败: {}", url),
        }
    }

    /// 当前仍存活的对象 URL 数量。
    pub fn live_object_urls(&self) -> usize {
        self.object_urls
            .lock()
            .map(|registry| registry.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::test_support::png_bytes;
    use base64::{Engine as _, engine::general_purpose};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[tokio::test]
    async fn acquire_base64_registers_object_url() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let encoded = general_purpose::STANDARD.encode(png_bytes(32, 16));

        let url = handler
            .acquire(ImageSource::Base64(encoded))
            .await
            .expect("acquire should succeed");

        let blob = handler.resolve(&url).expect("blob should be registered");
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(handler.dimensions(&url).expect("dimensions"), (32, 16));
        assert_eq!(handler.live_object_urls(), 1);

        handler.revoke(&url);
        assert_eq!(handler.live_object_urls(), 0);
    }

    #[tokio::test]
    async fn acquire_file_reads_and_validates_image() {
        let path = std::env::temp_dir().join(format!(
            "ocrlens_acquire_{}_{}.png",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        std::fs::write(&path, png_bytes(8, 8)).expect("write temp png failed");

        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let result = handler
            .acquire(ImageSource::FilePath(path.to_string_lossy().to_string()))
            .await;
        let _ = std::fs::remove_file(&path);

        let url = result.expect("file acquire should succeed");
        assert!(handler.resolve(&url).is_ok());
    }

    #[tokio::test]
    async fn acquire_rejects_non_image_file_contents() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let result = handler
            .acquire(ImageSource::Pasted {
                bytes: b"plain text".to_vec(),
                mime_type: "image/png".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
        assert_eq!(handler.live_object_urls(), 0);
    }

    #[test]
    fn config_snapshot_reflects_construction_config() {
        let mut config = ImageConfig::default();
        config.max_redirects = 1;
        let handler = ImageHandler::new(config).expect("handler init failed");

        assert_eq!(handler.config_snapshot().max_redirects, 1);
        assert_eq!(handler.clone().config_snapshot().max_redirects, 1);
    }
}
