//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“图片来源识别 → 加载校验 → 对象 URL 登记 → 解码裁剪 → PNG 导出”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `handler`：编排获取流程，持有配置与对象 URL 登记表
//! - `loader`：负责 URL/Base64/文件/剪贴板加载与安全校验
//! - `pipeline`：负责解码、像素限制与 PNG 编码
//! - `rasterizer`：负责按显示缩放换算并导出裁剪区域
//! - `object_url`：对象 URL 登记与回收
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! session::OcrSession
//!    ↓ acquire(ImageSource)
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + URL/体积/签名校验）
//!    └─ object_url.rs（登记原图）
//!    ↓ rasterize(ObjectUrl, PixelCrop, DisplaySize)
//! rasterizer.rs
//!    └─ pipeline.rs（解码 + 像素限制 + PNG 编码）
//!    ↓
//! ImageResource（对象 URL + Base64 + MIME）
//! ```

mod config;
mod error;
mod handler;
mod loader;
mod object_url;
mod pipeline;
mod rasterizer;
mod source;

pub use config::ImageConfig;
pub use error::ImageError;
pub use handler::ImageHandler;
pub use object_url::{ObjectUrl, ObjectUrlRegistry, StoredBlob};
pub use source::{ImageResource, ImageSource};

#[cfg(test)]
pub(crate) mod test_support {
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    fn encode(img: ImageBuffer<Rgba<u8>, Vec<u8>>) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    /// 不透明彩色测试图。
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        }))
    }

    /// 像素值等于坐标的渐变图（坐标需小于 256）。
    pub(crate) fn gradient_png_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, 0, 255])
        }))
    }
}
