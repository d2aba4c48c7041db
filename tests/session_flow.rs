//! 会话状态机的端到端行为：获取 → 裁剪 → 识别 → 重置。

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

use ocrlens::clipboard::{ClipboardItem, MemoryClipboard};
use ocrlens::cropper::{DisplaySize, DragHandle, PixelCrop, Point};
use ocrlens::image_handler::{ImageConfig, ImageHandler, ImageSource};
use ocrlens::recognition::{
    CredentialStore, MemoryCredentialStore, RecognitionClient, RecognitionError,
    RecognitionRequest, RecognitionService,
};
use ocrlens::session::{
    ACQUIRE_FAILED_MESSAGE, CROP_FAILED_MESSAGE, OcrSession, RequestState,
};
use ocrlens::settings::RecognitionSettings;

#[derive(Default)]
struct FakeService {
    calls: AtomicUsize,
    last_instruction: std::sync::Mutex<Option<String>>,
    fail_with: Option<&'static str>,
}

#[async_trait]
impl RecognitionService for FakeService {
    async fn generate(&self, request: RecognitionRequest) -> Result<String, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_instruction.lock() {
            *last = Some(request.system_instruction.clone());
        }
        match self.fail_with {
            Some(message) => Err(RecognitionError::Service(message.to_string())),
            None => Ok(format!("recognized {}", request.mime_type)),
        }
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 128, 255]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

struct Harness {
    session: OcrSession,
    service: Arc<FakeService>,
    store: Arc<MemoryCredentialStore>,
    images: ImageHandler,
}

fn harness_with(service: FakeService, store: MemoryCredentialStore, clipboard: MemoryClipboard) -> Harness {
    let service = Arc::new(service);
    let store = Arc::new(store);
    let images = ImageHandler::new(ImageConfig::default()).expect("image handler");
    let recognizer = RecognitionClient::new(store.clone(), service.clone()).with_default_key(None);
    let session = OcrSession::new(
        images.clone(),
        recognizer,
        Box::new(clipboard),
        RecognitionSettings::default(),
    );
    Harness { session, service, store, images }
}

fn harness() -> Harness {
    harness_with(
        FakeService::default(),
        MemoryCredentialStore::with_key("test-key"),
        MemoryClipboard::default(),
    )
}

fn base64_png(width: u32, height: u32) -> ImageSource {
    ImageSource::Base64(general_purpose::STANDARD.encode(png_bytes(width, height)))
}

/// 获取 + 播种选区 + 拖拽提交 + 确认裁剪，停在持有裁剪图的 Idle。
async fn cropped(h: &mut Harness) {
    assert!(h.session.acquire(base64_png(200, 100)).await);
    h.session.on_image_displayed(DisplaySize::new(100.0, 50.0));

    let cropper = h.session.cropper_mut();
    assert!(cropper.begin_drag(DragHandle::Move, Point::new(50.0, 25.0)));
    cropper.drag_to(Point::new(50.0, 25.0));
    assert!(cropper.end_drag().is_some());

    assert!(h.session.confirm_crop().await);
}

#[tokio::test]
async fn full_flow_reaches_success() {
    let mut h = harness();

    cropped(&mut h).await;
    assert_eq!(h.session.status(), RequestState::Idle);

    // 初始选区 50x50（显示 100x50 下 1:1），原图缩放系数 2
    let image = h.session.image().expect("cropped image");
    assert_eq!((image.width, image.height), (100, 100));
    assert_eq!(image.mime_type, "image/png");

    assert!(h.session.extract().await);
    assert_eq!(h.session.status(), RequestState::Success);
    assert_eq!(h.session.result(), Some("recognized image/png"));
    assert_eq!(h.service.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn acquisition_enters_cropping_and_clears_previous_result() {
    let mut h = harness();
    cropped(&mut h).await;
    h.session.extract().await;

    assert!(h.session.acquire(base64_png(10, 10)).await);

    assert_eq!(h.session.status(), RequestState::Cropping);
    assert!(h.session.result().is_none());
    assert!(h.session.error().is_none());
    assert!(h.session.image().is_none());
}

#[tokio::test]
async fn failed_acquisition_shows_generic_message() {
    let mut h = harness();

    let ok = h
        .session
        .acquire(ImageSource::FilePath("/definitely/not/here.png".to_string()))
        .await;

    assert!(!ok);
    assert_eq!(h.session.status(), RequestState::Idle);
    assert_eq!(h.session.error(), Some(ACQUIRE_FAILED_MESSAGE));
}

#[tokio::test]
async fn url_acquisition_failure_returns_to_idle() {
    let mut h = harness();

    let ok = h
        .session
        .acquire(ImageSource::Url("http://127.0.0.1:9/image.png".to_string()))
        .await;

    assert!(!ok);
    assert_eq!(h.session.status(), RequestState::Idle);
    assert_eq!(h.session.error(), Some(ACQUIRE_FAILED_MESSAGE));
}

#[tokio::test]
async fn confirm_without_committed_selection_is_noop() {
    let mut h = harness();
    assert!(h.session.acquire(base64_png(40, 40)).await);
    h.session.on_image_displayed(DisplaySize::new(40.0, 40.0));

    assert!(!h.session.confirm_crop().await);

    assert_eq!(h.session.status(), RequestState::Cropping);
    assert!(h.session.image().is_none());
}

#[tokio::test]
async fn empty_selection_reports_crop_failure_and_idles() {
    let mut h = harness();
    assert!(h.session.acquire(base64_png(40, 40)).await);
    h.session.on_image_displayed(DisplaySize::new(40.0, 40.0));
    h.session.cropper_mut().commit(PixelCrop { x: 5.0, y: 5.0, width: 0.0, height: 10.0 });

    assert!(!h.session.confirm_crop().await);

    assert_eq!(h.session.status(), RequestState::Idle);
    assert_eq!(h.session.error(), Some(CROP_FAILED_MESSAGE));
}

#[tokio::test]
async fn missing_credential_fails_without_calling_service() {
    let mut h = harness_with(
        FakeService::default(),
        MemoryCredentialStore::new(),
        MemoryClipboard::default(),
    );
    cropped(&mut h).await;

    assert!(h.session.extract().await);

    assert_eq!(h.session.status(), RequestState::Error);
    assert_eq!(h.service.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.session.error(),
        Some(RecognitionError::MissingCredential.to_string().as_str())
    );
}

#[tokio::test]
async fn service_error_message_is_shown_verbatim() {
    let mut h = harness_with(
        FakeService {
            fail_with: Some("quota exceeded"),
            ..FakeService::default()
        },
        MemoryCredentialStore::with_key("k"),
        MemoryClipboard::default(),
    );
    cropped(&mut h).await;

    h.session.extract().await;

    assert_eq!(h.session.status(), RequestState::Error);
    assert_eq!(h.session.error(), Some("quota exceeded"));

    // Error 状态下可以重新识别
    assert!(h.session.begin_extraction().is_some());
}

#[tokio::test]
async fn second_extraction_while_loading_is_rejected() {
    let mut h = harness();
    cropped(&mut h).await;

    let first = h.session.begin_extraction().expect("first ticket");
    assert_eq!(h.session.status(), RequestState::Loading);
    assert!(h.session.begin_extraction().is_none());

    let outcome = first.execute(h.session.recognizer()).await;
    assert!(h.session.complete_extraction(first.seq, outcome));

    assert_eq!(h.service.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.session.status(), RequestState::Success);
}

#[tokio::test]
async fn confirm_crop_outside_cropping_is_ignored() {
    let mut h = harness();
    cropped(&mut h).await;
    h.session.extract().await;
    assert_eq!(h.session.status(), RequestState::Success);
    let crop_url = h.session.image().expect("crop").object_url.clone();

    // 原图与已提交选区仍在，但不在裁剪中
    assert!(!h.session.confirm_crop().await);

    assert_eq!(h.session.status(), RequestState::Success);
    assert_eq!(h.session.result(), Some("recognized image/png"));
    assert_eq!(h.session.image().map(|i| i.object_url.clone()), Some(crop_url));
    assert_eq!(h.images.live_object_urls(), 2);
}

#[tokio::test]
async fn confirm_crop_from_error_is_ignored() {
    let mut h = harness_with(
        FakeService {
            fail_with: Some("boom"),
            ..FakeService::default()
        },
        MemoryCredentialStore::with_key("k"),
        MemoryClipboard::default(),
    );
    cropped(&mut h).await;
    h.session.extract().await;
    assert_eq!(h.session.status(), RequestState::Error);

    assert!(!h.session.confirm_crop().await);

    assert_eq!(h.session.status(), RequestState::Error);
    assert_eq!(h.session.error(), Some("boom"));
}

#[tokio::test]
async fn extraction_while_cropping_is_rejected() {
    let mut h = harness();
    cropped(&mut h).await;
    assert!(h.session.recrop());
    assert_eq!(h.session.status(), RequestState::Cropping);

    assert!(h.session.begin_extraction().is_none());
    assert!(!h.session.extract().await);

    assert_eq!(h.session.status(), RequestState::Cropping);
    assert_eq!(h.service.calls.load(Ordering::SeqCst), 0);
    assert!(h.session.result().is_none());
}

#[tokio::test]
async fn extraction_without_image_does_nothing() {
    let mut h = harness();

    assert!(!h.session.extract().await);

    assert_eq!(h.session.status(), RequestState::Idle);
    assert_eq!(h.service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn translation_setting_reaches_instruction() {
    let mut h = harness();
    h.session
        .set_recognition_settings(RecognitionSettings {
            source_language: "auto".to_string(),
            translation_enabled: true,
            target_language: "es".to_string(),
        })
        .expect("valid settings");
    cropped(&mut h).await;

    h.session.extract().await;

    let instruction = h
        .service
        .last_instruction
        .lock()
        .expect("lock")
        .clone()
        .expect("instruction sent");
    assert!(instruction.contains("Spanish"));
    assert!(instruction.contains("Return ONLY the translated text."));
}

#[tokio::test]
async fn reset_clears_everything_from_any_state() {
    // Success
    let mut h = harness();
    cropped(&mut h).await;
    h.session.extract().await;
    h.session.reset();
    assert_reset(&h);

    // Error
    let mut h = harness_with(
        FakeService {
            fail_with: Some("boom"),
            ..FakeService::default()
        },
        MemoryCredentialStore::with_key("k"),
        MemoryClipboard::default(),
    );
    cropped(&mut h).await;
    h.session.extract().await;
    assert_eq!(h.session.status(), RequestState::Error);
    h.session.reset();
    assert_reset(&h);

    // Cropping（取消即重置）
    let mut h = harness();
    assert!(h.session.acquire(base64_png(20, 20)).await);
    h.session.on_image_displayed(DisplaySize::new(20.0, 20.0));
    h.session.cropper_mut().commit(PixelCrop { x: 0.0, y: 0.0, width: 10.0, height: 10.0 });
    h.session.cancel_crop();
    assert_reset(&h);
}

fn assert_reset(h: &Harness) {
    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.status, RequestState::Idle);
    assert!(snapshot.raw_image.is_none());
    assert!(snapshot.image.is_none());
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_none());
    assert!(snapshot.selection.committed.is_none());
    assert_eq!(h.images.live_object_urls(), 0);
}

#[tokio::test]
async fn superseded_object_urls_are_revoked() {
    let mut h = harness();
    cropped(&mut h).await;
    let first_crop = h.session.image().expect("crop").object_url.clone();
    assert_eq!(h.images.live_object_urls(), 2);

    // 重新裁剪替换旧裁剪图
    assert!(h.session.recrop());
    h.session.on_image_displayed(DisplaySize::new(100.0, 50.0));
    h.session.cropper_mut().commit(PixelCrop { x: 0.0, y: 0.0, width: 20.0, height: 20.0 });
    assert!(h.session.confirm_crop().await);

    assert!(h.images.resolve(&first_crop).is_err());
    assert_eq!(h.images.live_object_urls(), 2);

    // 新的获取替换原图与裁剪图
    assert!(h.session.acquire(base64_png(8, 8)).await);
    assert_eq!(h.images.live_object_urls(), 1);
}

#[tokio::test]
async fn non_image_paste_changes_nothing() {
    let mut h = harness();

    let pasted = h
        .session
        .paste_items(vec![ClipboardItem::text("just text")])
        .await;

    assert!(!pasted);
    assert_eq!(h.session.status(), RequestState::Idle);
    assert!(h.session.error().is_none());
}

#[tokio::test]
async fn image_paste_uses_first_image_item() {
    let mut h = harness_with(
        FakeService::default(),
        MemoryCredentialStore::with_key("k"),
        MemoryClipboard::with_items(vec![
            ClipboardItem::text("caption"),
            ClipboardItem::new("image/png", png_bytes(12, 12)),
        ]),
    );

    assert!(h.session.paste().await);

    assert_eq!(h.session.status(), RequestState::Cropping);
    let raw = h.session.raw_image().expect("raw image").clone();
    assert_eq!(h.images.dimensions(&raw).expect("dimensions"), (12, 12));
}

#[tokio::test]
async fn paste_ignored_while_settings_open_or_cropping() {
    let mut h = harness();
    let items = vec![ClipboardItem::new("image/png", png_bytes(6, 6))];

    h.session.open_settings();
    assert!(!h.session.paste_items(items.clone()).await);
    assert_eq!(h.session.status(), RequestState::Idle);

    h.session.close_settings();
    assert!(h.session.paste_items(items.clone()).await);
    assert_eq!(h.session.status(), RequestState::Cropping);
    let raw = h.session.raw_image().cloned();

    assert!(!h.session.paste_items(items).await);
    assert_eq!(h.session.raw_image().cloned(), raw);
}

#[tokio::test]
async fn copy_result_sets_acknowledgement() {
    let mut h = harness();
    cropped(&mut h).await;
    h.session.extract().await;

    assert!(h.session.copy_result().expect("copy"));

    assert!(h.session.snapshot().copied);
}

#[test]
fn save_api_key_trims_persists_and_closes_settings() {
    let mut h = harness_with(
        FakeService::default(),
        MemoryCredentialStore::new(),
        MemoryClipboard::default(),
    );
    h.session.open_settings();

    assert!(!h.session.save_api_key("   ").expect("blank input"));
    assert!(h.session.is_settings_open());

    assert!(h.session.save_api_key("  AIzaSyD-1234567890abcdWXYZ \n").expect("save"));
    assert!(!h.session.is_settings_open());
    assert_eq!(
        h.store.get().expect("get").as_deref(),
        Some("AIzaSyD-1234567890abcdWXYZ")
    );
    assert_eq!(h.session.masked_key(), "AIzaSy••••••••WXYZ");

    h.session.clear_api_key().expect("clear");
    assert_eq!(h.session.masked_key(), "未关联密钥");
}

#[tokio::test]
async fn zoom_toggles_only_with_image() {
    let mut h = harness();
    assert!(!h.session.toggle_zoom());

    cropped(&mut h).await;
    assert!(h.session.toggle_zoom());
    assert!(!h.session.toggle_zoom());
}
