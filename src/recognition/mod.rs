//! # 文字识别模块（recognition）
//!
//! ## 设计思路
//!
//! OCR 本身交给远程多模态服务完成，本地只负责：
//! - 密钥解析（`credentials`）：保存的密钥优先，其次构建时默认值
//! - 指令构造（`prompt`）：固定系统指令 + 可选翻译要求
//! - 服务调用（`gemini`）：请求/响应/错误的归一化
//!
//! ```text
//! RecognitionClient::extract
//!    ├─ CredentialStore::get（缺失则直接失败，不发请求）
//!    ├─ build_system_instruction
//!    └─ RecognitionService::generate（GeminiService / 测试假实现）
//! ```

mod client;
mod credentials;
mod error;
mod gemini;
mod languages;
mod prompt;

pub use client::RecognitionClient;
pub use credentials::{
    API_KEY_STORAGE_KEY, CredentialStore, MemoryCredentialStore, SqliteCredentialStore,
    build_time_default_key, mask_api_key,
};
pub use error::RecognitionError;
pub use gemini::{GeminiService, RecognitionRequest, RecognitionService};
pub use languages::{
    AUTO_DETECT, SUPPORTED_LANGUAGES, SupportedLanguage, find_language, target_languages,
    validate_source, validate_target,
};
pub use prompt::{USER_INSTRUCTION, build_system_instruction};
