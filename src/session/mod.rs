//! # 会话模块（session）
//!
//! - `state`：请求状态、用户提示文案、只读快照
//! - `ocr_session`：状态机本体

mod ocr_session;
mod state;

pub use ocr_session::{COPY_ACK_DURATION, ExtractionTicket, OcrSession};
pub use state::{
    ACQUIRE_FAILED_MESSAGE, CROP_FAILED_MESSAGE, DEFAULT_ERROR_MESSAGE, ImageSummary,
    RequestState, SessionSnapshot,
};
