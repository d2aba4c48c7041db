//! # 解码与编码流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → PNG 字节”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素/内存上限快速拒绝
//! 3. 完整解码
//! 4. 裁剪结果统一编码为 PNG

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

use super::{ImageConfig, ImageError, ImageHandler};

impl ImageHandler {
    /// 在资源上限内把原始字节解码为图像。
    pub(crate) fn decode_with_limits(
        bytes: &[u8],
        config: &ImageConfig,
    ) -> Result<DynamicImage, ImageError> {
        let _format: ImageFormat = image::guess_format(bytes)
            .map_err(|e| ImageError::InvalidFormat(format!("不支持的图片格式：{}", e)))?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;
        Self::validate_decoded_memory_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        Self::validate_pixel_limits(config, width, height)?;

        Ok(decoded)
    }

    /// 编码为 PNG 字节。
    pub(crate) fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| ImageError::Decode(format!("PNG 编码失败：{}", e)))?;
        Ok(cursor.into_inner())
    }

    /// 仅通过内存中的图片头信息读取宽高。
    ///
    /// 用于在完整解码前做像素限制检查。
    pub(crate) fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
        let cursor = Cursor::new(bytes);
        let reader = ImageReader::new(cursor)
            .with_guessed_format()
            .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ImageError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(
        config: &ImageConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(
        config: &ImageConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > config.max_decoded_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::test_support::png_bytes;

    #[test]
    fn decode_reports_true_dimensions() {
        let decoded = ImageHandler::decode_with_limits(&png_bytes(40, 30), &ImageConfig::default())
            .expect("decode should succeed");

        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn rejects_too_many_pixels_before_full_decode() {
        let mut config = ImageConfig::default();
        config.max_decoded_pixels = 1_000;

        let result = ImageHandler::decode_with_limits(&png_bytes(100, 100), &config);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn rejects_estimated_memory_over_limit() {
        let mut config = ImageConfig::default();
        config.max_decoded_bytes = 100;

        let result = ImageHandler::decode_with_limits(&png_bytes(10, 10), &config);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let result = ImageHandler::decode_with_limits(b"not an image", &ImageConfig::default());

        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }
}
