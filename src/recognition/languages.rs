//! 可选语言表。

use serde::Serialize;

use super::RecognitionError;

/// 自动检测源语言。
pub const AUTO_DETECT: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedLanguage {
    pub code: &'static str,
    pub name: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[SupportedLanguage] = &[
    SupportedLanguage { code: AUTO_DETECT, name: "Auto Detect" },
    SupportedLanguage { code: "pt", name: "Portuguese" },
    SupportedLanguage { code: "en", name: "English" },
    SupportedLanguage { code: "es", name: "Spanish" },
    SupportedLanguage { code: "fr", name: "French" },
    SupportedLanguage { code: "de", name: "German" },
    SupportedLanguage { code: "it", name: "Italian" },
    SupportedLanguage { code: "ja", name: "Japanese" },
    SupportedLanguage { code: "zh", name: "Chinese" },
];

pub fn find_language(code: &str) -> Option<&'static SupportedLanguage> {
    SUPPORTED_LANGUAGES.iter().find(|lang| lang.code == code)
}

/// 可作为翻译目标的语言（不含 `auto`）。
pub fn target_languages() -> impl Iterator<Item = &'static SupportedLanguage> {
    SUPPORTED_LANGUAGES.iter().filter(|lang| lang.code != AUTO_DETECT)
}

pub fn validate_source(code: &str) -> Result<&'static SupportedLanguage, RecognitionError> {
    find_language(code).ok_or_else(|| RecognitionError::UnsupportedLanguage(code.to_string()))
}

pub fn validate_target(code: &str) -> Result<&'static SupportedLanguage, RecognitionError> {
    target_languages()
        .find(|lang| lang.code == code)
        .ok_or_else(|| RecognitionError::UnsupportedLanguage(code.to_string()))
}
