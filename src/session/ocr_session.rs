//! # 识别会话
//!
//! ## 设计思路
//!
//! `OcrSession` 持有一次使用过程中的全部状态（原图、裁剪结果、识别结果、错误、
//! 设置面板等），对外方法与界面上的用户操作一一对应。
//!
//! ```text
//! Idle ──获取成功──▶ Cropping ──确认裁剪──▶ Loading ──▶ Idle（持有裁剪图）
//!  ▲                                                   │
//!  │                                              开始识别
//!  │                                                   ▼
//!  └──────────── reset ◀──── Success / Error ◀──── Loading
//! ```
//!
//! ## 实现思路
//!
//! - 方法均为 `&mut self`，同一会话上的操作天然串行。
//! - 识别拆分为 `begin_extraction` / `complete_extraction`：
//!   `Loading` 时拒绝再次开始；每次请求带序号，reset 之后到达的旧结果直接丢弃。
//! - 被替换的对象 URL 一律回收。
//! - 获取失败、裁剪失败只展示通用提示，详细原因写日志。

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clipboard::{self, ClipboardAccess, ClipboardItem};
use crate::cropper::{Cropper, DisplaySize};
use crate::error::AppError;
use crate::image_handler::{ImageHandler, ImageResource, ImageSource, ObjectUrl};
use crate::recognition::{
    CredentialStore, RecognitionClient, RecognitionError, mask_api_key, validate_source,
    validate_target,
};
use crate::settings::RecognitionSettings;

use super::state::{
    ACQUIRE_FAILED_MESSAGE, CROP_FAILED_MESSAGE, DEFAULT_ERROR_MESSAGE, ImageSummary,
    RequestState, SessionSnapshot,
};

/// “已复制”提示的持续时间。
pub const COPY_ACK_DURATION: Duration = Duration::from_secs(2);

/// 一次已开始的识别请求。
#[derive(Debug, Clone)]
pub struct ExtractionTicket {
    pub seq: u64,
    pub base64: String,
    pub mime_type: String,
    pub source_language: String,
    pub target_language: Option<String>,
}

impl ExtractionTicket {
    /// 用给定客户端执行请求；结果交回 `complete_extraction`。
    pub async fn execute(&self, client: &RecognitionClient) -> Result<String, RecognitionError> {
        client
            .extract(
                &self.base64,
                &self.mime_type,
                &self.source_language,
                self.target_language.as_deref(),
            )
            .await
    }
}

pub struct OcrSession {
    images: ImageHandler,
    recognizer: RecognitionClient,
    clipboard: Box<dyn ClipboardAccess>,
    settings: RecognitionSettings,

    status: RequestState,
    raw_image: Option<ObjectUrl>,
    image: Option<ImageResource>,
    cropper: Cropper,
    result: Option<String>,
    error: Option<String>,
    copied_at: Option<Instant>,
    settings_open: bool,
    zoomed: bool,

    next_seq: u64,
    in_flight: Option<u64>,
}

impl OcrSession {
    pub fn new(
        images: ImageHandler,
        recognizer: RecognitionClient,
        clipboard: Box<dyn ClipboardAccess>,
        settings: RecognitionSettings,
    ) -> Self {
        Self {
            images,
            recognizer,
            clipboard,
            settings,
            status: RequestState::Idle,
            raw_image: None,
            image: None,
            cropper: Cropper::new(),
            result: None,
            error: None,
            copied_at: None,
            settings_open: false,
            zoomed: false,
            next_seq: 0,
            in_flight: None,
        }
    }

    // ---- 只读访问 ----

    pub fn status(&self) -> RequestState {
        self.status
    }

    pub fn image(&self) -> Option<&ImageResource> {
        self.image.as_ref()
    }

    pub fn raw_image(&self) -> Option<&ObjectUrl> {
        self.raw_image.as_ref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cropper(&self) -> &Cropper {
        &self.cropper
    }

    /// 拖拽交互只改动选区，不改变请求状态。
    pub fn cropper_mut(&mut self) -> &mut Cropper {
        &mut self.cropper
    }

    pub fn images(&self) -> &ImageHandler {
        &self.images
    }

    pub fn recognizer(&self) -> &RecognitionClient {
        &self.recognizer
    }

    pub fn recognition_settings(&self) -> &RecognitionSettings {
        &self.settings
    }

    pub fn is_settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            raw_image: self.raw_image.clone(),
            image: self.image.as_ref().map(ImageSummary::from),
            selection: self.cropper.selection(),
            result: self.result.clone(),
            error: self.error.clone(),
            copied: self.is_copied(),
            settings_open: self.settings_open,
            zoomed: self.zoomed,
            masked_key: self.masked_key(),
        }
    }

    // ---- 图片获取 ----

    /// 从任意来源获取原图，成功后进入 `Cropping`。
    ///
    /// 网络来源在下载期间处于 `Loading`；失败时回到 `Idle` 并给出通用提示。
    pub async fn acquire(&mut self, source: ImageSource) -> bool {
        if self.status == RequestState::Loading {
            log::debug!("⏭️ 正在处理中，忽略新的图片获取");
            return false;
        }

        let hint = source.hint();
        if matches!(source, ImageSource::Url(_)) {
            self.status = RequestState::Loading;
        }

        match self.images.acquire(source).await {
            Ok(raw) => {
                self.start_cropping(raw);
                true
            }
            Err(e) => {
                log::warn!("⚠️ 图片获取失败 - 来源: {} 阶段: {} 原因: {}", hint, e.stage(), e);
                self.error = Some(ACQUIRE_FAILED_MESSAGE.to_string());
                self.status = RequestState::Idle;
                false
            }
        }
    }

    /// 从系统剪贴板粘贴。
    pub async fn paste(&mut self) -> bool {
        if self.paste_blocked() {
            return false;
        }
        match self.clipboard.read_items() {
            Ok(items) => self.paste_items(items).await,
            Err(e) => {
                log::debug!("读取剪贴板失败，忽略粘贴: {}", e);
                false
            }
        }
    }

    /// 处理粘贴事件中的条目：第一个图片条目生效，没有图片时什么都不做。
    pub async fn paste_items(&mut self, items: Vec<ClipboardItem>) -> bool {
        if self.paste_blocked() {
            return false;
        }
        let Some(item) = clipboard::first_image(&items).cloned() else {
            log::debug!("📋 粘贴内容不含图片，忽略");
            return false;
        };
        self.acquire(ImageSource::Pasted {
            bytes: item.bytes,
            mime_type: item.mime_type,
        })
        .await
    }

    fn paste_blocked(&self) -> bool {
        if self.status == RequestState::Cropping || self.settings_open {
            log::debug!(
                "⏭️ 忽略粘贴 - 状态: {} 设置面板: {}",
                self.status,
                self.settings_open
            );
            return true;
        }
        false
    }

    fn start_cropping(&mut self, raw: ObjectUrl) {
        self.error = None;
        self.result = None;
        self.copied_at = None;
        self.zoomed = false;
        self.release_images();
        self.raw_image = Some(raw);
        self.cropper.clear();
        self.status = RequestState::Cropping;
    }

    // ---- 裁剪 ----

    /// 图片在界面上渲染完成，播种初始选区。
    pub fn on_image_displayed(&mut self, display: DisplaySize) {
        if self.status != RequestState::Cropping {
            return;
        }
        self.cropper.on_image_displayed(display);
    }

    /// 确认裁剪；仅在 `Cropping` 下且已有原图与已提交选区时生效，否则不做任何事。
    pub async fn confirm_crop(&mut self) -> bool {
        if self.status != RequestState::Cropping {
            log::debug!("⏭️ 当前状态 {} 不在裁剪中，忽略裁剪确认", self.status);
            return false;
        }
        let (Some(raw), Some(crop)) = (self.raw_image.clone(), self.cropper.committed()) else {
            log::debug!("⏭️ 没有原图或已提交选区，忽略裁剪确认");
            return false;
        };

        self.status = RequestState::Loading;
        match self.images.rasterize(&raw, crop, self.cropper.display()).await {
            Ok(cropped) => {
                if let Some(previous) = self.image.replace(cropped) {
                    self.images.revoke(&previous.object_url);
                }
                self.status = RequestState::Idle;
                true
            }
            Err(e) => {
                log::warn!("⚠️ 裁剪失败 - 阶段: {} 原因: {}", e.stage(), e);
                self.error = Some(CROP_FAILED_MESSAGE.to_string());
                self.status = RequestState::Idle;
                false
            }
        }
    }

    /// 取消裁剪即重置。
    pub fn cancel_crop(&mut self) {
        self.reset();
    }

    /// 基于已有原图重新裁剪。
    pub fn recrop(&mut self) -> bool {
        if self.raw_image.is_none() || self.status == RequestState::Loading {
            return false;
        }
        self.zoomed = false;
        self.status = RequestState::Cropping;
        true
    }

    // ---- 识别 ----

    /// 开始识别；仅允许从 `Idle`/`Success`/`Error` 发起，没有图片或已有请求在途时返回 `None`。
    pub fn begin_extraction(&mut self) -> Option<ExtractionTicket> {
        let image = self.image.as_ref()?;
        if self.in_flight.is_some() {
            log::debug!("⏭️ 已有识别请求在途，忽略");
            return None;
        }
        if !matches!(
            self.status,
            RequestState::Idle | RequestState::Success | RequestState::Error
        ) {
            log::debug!("⏭️ 当前状态 {} 不允许发起识别", self.status);
            return None;
        }

        self.next_seq += 1;
        let ticket = ExtractionTicket {
            seq: self.next_seq,
            base64: image.base64.clone(),
            mime_type: image.mime_type.clone(),
            source_language: self.settings.source_language.clone(),
            target_language: self.settings.effective_target().map(str::to_string),
        };

        self.in_flight = Some(ticket.seq);
        self.status = RequestState::Loading;
        self.error = None;
        Some(ticket)
    }

    /// 交回识别结果；序号不匹配（已被 reset）时丢弃并返回 `false`。
    pub fn complete_extraction(
        &mut self,
        seq: u64,
        outcome: Result<String, RecognitionError>,
    ) -> bool {
        if self.in_flight != Some(seq) {
            log::debug!("🗑️ 丢弃过期的识别结果 - seq: {}", seq);
            return false;
        }
        self.in_flight = None;

        match outcome {
            Ok(text) => {
                self.result = Some(text);
                self.status = RequestState::Success;
            }
            Err(e) => {
                let message = e.to_string();
                self.error = Some(if message.trim().is_empty() {
                    DEFAULT_ERROR_MESSAGE.to_string()
                } else {
                    message
                });
                self.status = RequestState::Error;
            }
        }
        true
    }

    /// 开始 → 执行 → 完成 的便捷组合。
    pub async fn extract(&mut self) -> bool {
        let Some(ticket) = self.begin_extraction() else {
            return false;
        };
        let outcome = ticket.execute(&self.recognizer).await;
        self.complete_extraction(ticket.seq, outcome)
    }

    // ---- 重置 ----

    /// 回到 `Idle`，清空图片、原图、结果、错误与选区。
    pub fn reset(&mut self) {
        self.release_images();
        self.cropper.clear();
        self.result = None;
        self.error = None;
        self.copied_at = None;
        self.zoomed = false;
        self.in_flight = None;
        self.status = RequestState::Idle;
        log::debug!("🔄 会话已重置");
    }

    fn release_images(&mut self) {
        if let Some(raw) = self.raw_image.take() {
            self.images.revoke(&raw);
        }
        if let Some(image) = self.image.take() {
            self.images.revoke(&image.object_url);
        }
    }

    // ---- 结果复制 ----

    /// 将结果写入剪贴板，并开始 2 秒的“已复制”提示。
    pub fn copy_result(&mut self) -> Result<bool, AppError> {
        let Some(text) = self.result.as_deref() else {
            return Ok(false);
        };
        self.clipboard.write_text(text)?;
        self.copied_at = Some(Instant::now());
        Ok(true)
    }

    pub fn is_copied(&self) -> bool {
        self.is_copied_at(Instant::now())
    }

    pub fn is_copied_at(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.saturating_duration_since(at) < COPY_ACK_DURATION)
    }

    // ---- 设置 ----

    pub fn open_settings(&mut self) {
        self.settings_open = true;
    }

    pub fn close_settings(&mut self) {
        self.settings_open = false;
    }

    /// 保存密钥：去除首尾空白，空输入忽略；成功后关闭设置面板。
    pub fn save_api_key(&mut self, input: &str) -> Result<bool, RecognitionError> {
        let key = input.trim();
        if key.is_empty() {
            return Ok(false);
        }
        self.credential_store().set(key)?;
        self.settings_open = false;
        Ok(true)
    }

    pub fn clear_api_key(&mut self) -> Result<(), RecognitionError> {
        self.credential_store().clear()
    }

    /// 当前保存的密钥（脱敏）。
    pub fn masked_key(&self) -> String {
        let stored = match self.credential_store().get() {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("⚠️ 读取已保存的密钥失败，按未关联显示: {}", e);
                None
            }
        };
        mask_api_key(stored.as_deref())
    }

    fn credential_store(&self) -> &Arc<dyn CredentialStore> {
        self.recognizer.store()
    }

    /// 更新识别语言设置；语言代码不在支持列表中时拒绝。
    pub fn set_recognition_settings(
        &mut self,
        settings: RecognitionSettings,
    ) -> Result<(), RecognitionError> {
        validate_source(&settings.source_language)?;
        if settings.translation_enabled {
            validate_target(&settings.target_language)?;
        }
        self.settings = settings;
        Ok(())
    }

    // ---- 放大预览 ----

    /// 切换放大预览，仅在有图片时生效。
    pub fn toggle_zoom(&mut self) -> bool {
        if self.image.is_none() {
            self.zoomed = false;
            return false;
        }
        self.zoomed = !self.zoomed;
        self.zoomed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::image_handler::ImageConfig;
    use crate::recognition::{MemoryCredentialStore, RecognitionRequest, RecognitionService};
    use async_trait::async_trait;

    struct EchoService;

    #[async_trait]
    impl RecognitionService for EchoService {
        async fn generate(&self, _request: RecognitionRequest) -> Result<String, RecognitionError> {
            Ok("ok".to_string())
        }

        fn provider_name(&self) -> &str {
            "echo"
        }
    }

    fn session() -> OcrSession {
        let images = ImageHandler::new(ImageConfig::default()).expect("handler");
        let recognizer = RecognitionClient::new(
            Arc::new(MemoryCredentialStore::with_key("key")),
            Arc::new(EchoService),
        );
        OcrSession::new(
            images,
            recognizer,
            Box::new(MemoryClipboard::default()),
            RecognitionSettings::default(),
        )
    }

    #[test]
    fn copied_flag_expires_after_two_seconds() {
        let mut session = session();
        session.result = Some("text".to_string());

        assert!(session.copy_result().expect("copy"));
        let at = session.copied_at.expect("copied timestamp");

        assert!(session.is_copied_at(at + Duration::from_millis(1999)));
        assert!(!session.is_copied_at(at + Duration::from_secs(2)));
    }

    #[test]
    fn copy_without_result_does_nothing() {
        let mut session = session();

        assert!(!session.copy_result().expect("copy"));
        assert!(!session.is_copied());
    }

    #[test]
    fn stale_completion_after_reset_is_discarded() {
        let mut session = session();
        session.image = Some(ImageResource::new(
            session.images.register(bytes::Bytes::from_static(b"x"), "image/png").expect("register"),
            bytes::Bytes::from_static(b"x"),
            "image/png".to_string(),
            1,
            1,
        ));

        let ticket = session.begin_extraction().expect("ticket");
        session.reset();

        assert!(!session.complete_extraction(ticket.seq, Ok("late".to_string())));
        assert_eq!(session.status(), RequestState::Idle);
        assert!(session.result().is_none());
    }

    #[test]
    fn empty_error_message_falls_back_to_default() {
        let mut session = session();
        session.in_flight = Some(7);
        session.status = RequestState::Loading;

        session.complete_extraction(7, Err(RecognitionError::Service(String::new())));

        assert_eq!(session.error(), Some(DEFAULT_ERROR_MESSAGE));
        assert_eq!(session.status(), RequestState::Error);
    }

    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn get(&self) -> Result<Option<String>, RecognitionError> {
            Err(RecognitionError::CredentialStore("database is locked".to_string()))
        }

        fn set(&self, _key: &str) -> Result<(), RecognitionError> {
            Err(RecognitionError::CredentialStore("database is locked".to_string()))
        }

        fn clear(&self) -> Result<(), RecognitionError> {
            Err(RecognitionError::CredentialStore("database is locked".to_string()))
        }
    }

    #[test]
    fn masked_key_falls_back_when_store_fails() {
        let images = ImageHandler::new(ImageConfig::default()).expect("handler");
        let recognizer = RecognitionClient::new(Arc::new(BrokenStore), Arc::new(EchoService));
        let mut session = OcrSession::new(
            images,
            recognizer,
            Box::new(MemoryClipboard::default()),
            RecognitionSettings::default(),
        );

        assert_eq!(session.masked_key(), mask_api_key(None));
        assert!(session.save_api_key("some-key").is_err());
        assert!(session.clear_api_key().is_err());
    }

    #[test]
    fn zoom_requires_image() {
        let mut session = session();

        assert!(!session.toggle_zoom());
        assert!(!session.is_zoomed());
    }

    #[test]
    fn invalid_language_settings_are_rejected() {
        let mut session = session();
        let settings = RecognitionSettings {
            translation_enabled: true,
            target_language: "auto".to_string(),
            ..RecognitionSettings::default()
        };

        assert!(session.set_recognition_settings(settings).is_err());
        assert!(!session.recognition_settings().translation_enabled);
    }
}
