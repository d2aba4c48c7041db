//! # OCRLens — 库入口
//!
//! 图片转文字工具：获取图片（文件 / 链接 / 剪贴板 / Base64）→ 交互裁剪 →
//! 按原始分辨率导出裁剪区域 → 交给远程多模态服务识别（可选翻译）。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           展示层（命令行 / 任意宿主界面）                   │
//! │                 ↕ 方法调用 + SessionSnapshot               │
//! ├──────────────────────────────────────────────────────────┤
//! │  session ──────── 请求状态机 Idle/Cropping/Loading/...     │
//! │   ├─ cropper            选区（百分比 live / 像素 committed） │
//! │   ├─ image_handler      获取·校验·对象 URL·裁剪栅格化       │
//! │   ├─ clipboard          剪贴板条目读取 / 文本写入           │
//! │   └─ recognition        密钥·指令·远程识别服务              │
//! │                                                          │
//! │  settings ── storage ── db（SQLite 键值表）── error         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 应用级错误 `AppError` |
//! | [`image_handler`] | 从 URL/Base64/文件/剪贴板加载图片，登记对象 URL，栅格化裁剪区域 |
//! | [`cropper`] | 选区几何与拖拽交互 |
//! | [`recognition`] | 密钥存储、识别指令、Gemini 调用 |
//! | [`session`] | 识别请求生命周期状态机 |
//! | [`clipboard`] | 系统剪贴板适配 |
//! | [`settings`] | `settings.json` 读写 |
//! | [`storage`] | 配置/数据目录解析 |
//! | [`db`] | SQLite 初始化、迁移与键值读写 |

pub mod clipboard;
pub mod cropper;
pub mod db;
pub mod error;
pub mod image_handler;
pub mod recognition;
pub mod session;
pub mod settings;
pub mod storage;
