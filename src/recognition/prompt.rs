//! 识别指令构造。

use super::languages::find_language;

/// 随图片一起发送的固定用户指令。
pub const USER_INSTRUCTION: &str = "Extract and process the text in this image.";

/// 构造系统指令；`target_lang` 为 `Some` 时要求翻译并只返回译文。
pub fn build_system_instruction(source_lang: &str, target_lang: Option<&str>) -> String {
    let output_rule = match target_lang {
        Some(target) => format!(
            "IMPORTANT: After extraction, translate the content faithfully into {}. Return ONLY the translated text.",
            describe_language(target)
        ),
        None => "Return ONLY the pure extracted text.".to_string(),
    };

    format!(
        "You are the OCRLens engine, specialized in high-precision text extraction.\n\
         \n\
         GUIDELINES:\n\
         1. Extract the text exactly as it appears in the image.\n\
         2. Preserve formatting, paragraphs and line breaks.\n\
         3. Ignore decorative elements, logos and visual noise.\n\
         4. If the source language is specified as \"{source_lang}\", use this context to improve accuracy.\n\
         5. {output_rule}\n\
         6. Use Markdown tables if you detect structured data.\n\
         7. Do not add comments, introductions or notes. Return only the final result.\n"
    )
}

fn describe_language(code: &str) -> String {
    match find_language(code) {
        Some(lang) => format!("\"{}\" ({})", lang.name, lang.code),
        None => format!("\"{}\"", code),
    }
}
