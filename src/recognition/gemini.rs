//! # 远程识别服务
//!
//! ## 设计思路
//!
//! `RecognitionService` 是本地逻辑与远程多模态接口之间唯一的边界，
//! 生产环境使用 `GeminiService`，测试注入假实现。
//!
//! ## 实现思路
//!
//! - `POST {endpoint}/models/{model}:generateContent`，密钥放在 `x-goog-api-key` 请求头，
//!   不出现在 URL 中，也不写入日志。
//! - 成功：拼接第一个候选的全部文本片段，没有候选时返回空串。
//! - 失败：解析 `{ error: { code, message, status, details } }`，
//!   无效密钥改写为 `InvalidCredential`，其他消息原样透传。
//! - 单次请求，不重试；整体超时可配置。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RecognitionError;
use crate::settings::ServiceSettings;

const API_KEY_HEADER: &str = "x-goog-api-key";
const INVALID_KEY_STATUS: &str = "API_KEY_INVALID";
const INVALID_KEY_MESSAGE: &str = "API key not valid";

/// 一次识别请求的全部输入。
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub api_key: String,
    pub system_instruction: String,
    pub user_instruction: String,
    pub mime_type: String,
    pub base64: String,
    pub temperature: f32,
}

#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// 发送识别请求，返回识别出的文本。
    async fn generate(&self, request: RecognitionRequest) -> Result<String, RecognitionError>;

    fn provider_name(&self) -> &str;
}

// ---- 请求体 ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text(TextPart<'a>),
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

// ---- 响应体 ----

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

impl ApiErrorBody {
    fn is_invalid_credential(&self) -> bool {
        let status_invalid = self.status.as_deref() == Some(INVALID_KEY_STATUS);
        let message_invalid = self
            .message
            .as_deref()
            .is_some_and(|m| m.contains(INVALID_KEY_MESSAGE));
        let detail_invalid = self
            .details
            .iter()
            .any(|d| d.get("reason").and_then(|r| r.as_str()) == Some(INVALID_KEY_STATUS));
        status_invalid || message_invalid || detail_invalid
    }
}

/// Gemini `generateContent` 适配器。
#[derive(Debug, Clone)]
pub struct GeminiService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl GeminiService {
    pub fn new(settings: &ServiceSettings) -> Result<Self, RecognitionError> {
        let timeout_secs = settings.request_timeout_secs.max(1);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RecognitionError::Network(format!("创建 HTTP 客户端失败：{}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout_secs,
        })
    }

    fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> RecognitionError {
        if e.is_timeout() {
            RecognitionError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            RecognitionError::Network(format!("无法连接识别服务：{}", e))
        } else {
            RecognitionError::Network(format!("请求失败：{}", e))
        }
    }

    fn map_error_response(status: reqwest::StatusCode, body: &str) -> RecognitionError {
        match serde_json::from_str::<ApiErrorEnvelope>(body) {
            Ok(envelope) if envelope.error.is_invalid_credential() => {
                RecognitionError::InvalidCredential
            }
            Ok(envelope) => {
                let message = envelope.error.message.unwrap_or_default();
                if message.is_empty() {
                    RecognitionError::Service(format!(
                        "识别服务返回错误（HTTP {}）",
                        envelope.error.code.unwrap_or(status.as_u16() as i64)
                    ))
                } else {
                    RecognitionError::Service(message)
                }
            }
            Err(_) => RecognitionError::Service(format!(
                "识别服务返回错误（HTTP {}）",
                status.as_u16()
            )),
        }
    }
}

#[async_trait]
impl RecognitionService for GeminiService {
    async fn generate(&self, request: RecognitionRequest) -> Result<String, RecognitionError> {
        let started = Instant::now();
        let body = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: &request.mime_type,
                            data: &request.base64,
                        },
                    },
                    RequestPart::Text(TextPart {
                        text: &request.user_instruction,
                    }),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        };

        log::debug!(
            "📡 发送识别请求 - 模型: {} 类型: {} 载荷: {}KB",
            self.model,
            request.mime_type,
            request.base64.len() / 1024
        );

        let response = self
            .client
            .post(self.request_url())
            .header(API_KEY_HEADER, &request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            let err = Self::map_error_response(status, &text);
            log::warn!("⚠️ 识别服务返回错误 - HTTP {} {}", status.as_u16(), err);
            return Err(err);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;
        let result = parsed.text();

        log::info!(
            "✅ 识别服务响应 - 字符数: {} 耗时: {}ms",
            result.chars().count(),
            started.elapsed().as_millis()
        );
        Ok(result)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
