//! 识别客户端：解析密钥 → 构造指令 → 调用服务。

use std::sync::Arc;
use std::time::Instant;

use super::credentials::{CredentialStore, build_time_default_key};
use super::gemini::{RecognitionRequest, RecognitionService};
use super::prompt::{USER_INSTRUCTION, build_system_instruction};
use super::RecognitionError;

const DEFAULT_TEMPERATURE: f32 = 0.1;

#[derive(Clone)]
pub struct RecognitionClient {
    store: Arc<dyn CredentialStore>,
    default_key: Option<String>,
    service: Arc<dyn RecognitionService>,
    temperature: f32,
}

impl RecognitionClient {
    /// 默认密钥取自编译期的 `OCRLENS_API_KEY`。
    pub fn new(store: Arc<dyn CredentialStore>, service: Arc<dyn RecognitionService>) -> Self {
        Self {
            store,
            default_key: build_time_default_key(),
            service,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_default_key(mut self, key: Option<String>) -> Self {
        self.default_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// 已保存的密钥优先，其次是默认密钥。
    pub fn resolve_api_key(&self) -> Result<String, RecognitionError> {
        if let Some(saved) = self.store.get()?.filter(|k| !k.is_empty()) {
            return Ok(saved);
        }
        self.default_key
            .clone()
            .ok_or(RecognitionError::MissingCredential)
    }

    /// 识别图片中的文字；`target_lang` 为 `Some` 时翻译为目标语言。
    pub async fn extract(
        &self,
        base64: &str,
        mime_type: &str,
        source_lang: &str,
        target_lang: Option<&str>,
    ) -> Result<String, RecognitionError> {
        let api_key = self.resolve_api_key()?;
        let started = Instant::now();

        let request = RecognitionRequest {
            api_key,
            system_instruction: build_system_instruction(source_lang, target_lang),
            user_instruction: USER_INSTRUCTION.to_string(),
            mime_type: mime_type.to_string(),
            base64: base64.to_string(),
            temperature: self.temperature,
        };

        log::info!(
            "🔍 开始识别 - 服务: {} 源语言: {} 目标语言: {}",
            self.service.provider_name(),
            source_lang,
            target_lang.unwrap_or("-")
        );

        match self.service.generate(request).await {
            Ok(text) => {
                log::info!(
                    "✅ 识别完成 - 字符数: {} 耗时: {}ms",
                    text.chars().count(),
                    started.elapsed().as_millis()
                );
                Ok(text)
            }
            Err(e) => {
                log::error!("❌ 识别失败 - {} 耗时: {}ms", e, started.elapsed().as_millis());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::MemoryCredentialStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        requests: Mutex<Vec<RecognitionRequest>>,
    }

    #[async_trait]
    impl RecognitionService for RecordingService {
        async fn generate(&self, request: RecognitionRequest) -> Result<String, RecognitionError> {
            self.requests.lock().expect("lock").push(request);
            Ok("texto".to_string())
        }

        fn provider_name(&self) -> &str {
            "recording"
        }
    }

    fn client(store: MemoryCredentialStore, default_key: Option<&str>) -> (RecognitionClient, Arc<RecordingService>) {
        let service = Arc::new(RecordingService::default());
        let client = RecognitionClient::new(Arc::new(store), service.clone())
            .with_default_key(default_key.map(str::to_string));
        (client, service)
    }

    #[tokio::test]
    async fn missing_credential_fails_before_network() {
        let (client, service) = client(MemoryCredentialStore::new(), None);

        let err = client.extract("AAAA", "image/png", "auto", None).await.expect_err("should fail");

        assert!(matches!(err, RecognitionError::MissingCredential));
        assert!(service.requests.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn stored_key_wins_over_default() {
        let (client, service) = client(MemoryCredentialStore::with_key("stored"), Some("default"));

        client.extract("AAAA", "image/png", "auto", None).await.expect("extract");

        let requests = service.requests.lock().expect("lock");
        assert_eq!(requests[0].api_key, "stored");
    }

    #[tokio::test]
    async fn default_key_used_when_nothing_stored() {
        let (client, service) = client(MemoryCredentialStore::new(), Some("default"));

        client.extract("AAAA", "image/jpeg", "ja", Some("en")).await.expect("extract");

        let requests = service.requests.lock().expect("lock");
        let sent = &requests[0];
        assert_eq!(sent.api_key, "default");
        assert_eq!(sent.mime_type, "image/jpeg");
        assert_eq!(sent.base64, "AAAA");
        assert_eq!(sent.user_instruction, USER_INSTRUCTION);
        assert!(sent.system_instruction.contains("Return ONLY the translated text."));
        assert!((sent.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn blank_default_key_is_ignored() {
        let (client, _) = client(MemoryCredentialStore::new(), Some("   "));

        assert!(matches!(client.resolve_api_key(), Err(RecognitionError::MissingCredential)));
    }
}
