//! # 裁剪栅格化模块
//!
//! ## 设计思路
//!
//! 用户在“显示尺寸”下框选区域，而原图往往以缩放后的尺寸显示。
//! 栅格化时按 `原始尺寸 / 显示尺寸` 分别计算水平、垂直缩放系数，
//! 把选区换算回原图分辨率，保证导出的裁剪图与原图像素一一对应。
//!
//! ## 实现思路
//!
//! 1. 解析原图对象 URL，在资源上限内解码
//! 2. 计算缩放系数（显示尺寸未知时按 1 处理）
//! 3. 分配 `floor(选区 * 系数)` 大小的透明画布
//! 4. 将缩放后的源矩形拷贝到画布原点，超出原图的部分保持透明
//! 5. 编码 PNG，登记新对象 URL，并生成 Base64
//!
//! 解码与编码属于 CPU 密集操作，放到阻塞线程执行，避免阻塞 async 运行时。
//! 单次尝试，不重试。

use std::time::Instant;

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, RgbaImage, imageops};

use super::object_url::ObjectUrl;
use super::source::ImageResource;
use super::{ImageConfig, ImageError, ImageHandler};
use crate::cropper::{DisplaySize, PixelCrop, ScaleFactors};

const CROP_MIME_TYPE: &str = "image/png";

/// 阻塞线程中完成的栅格化结果。
pub(crate) struct RenderedCrop {
    pub(crate) png: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl ImageHandler {
    /// 将原图中选定的像素区域导出为独立的 PNG 图片。
    pub async fn rasterize(
        &self,
        raw_url: &ObjectUrl,
        crop: PixelCrop,
        displayed: Option<DisplaySize>,
    ) -> Result<ImageResource, ImageError> {
        let config = self.config_snapshot();
        let blob = self.resolve(raw_url)?;
        let total_start = Instant::now();

        let rendered = tokio::task::spawn_blocking(move || {
            Self::render_crop(&blob.bytes, crop, displayed, &config)
        })
        .await
        .map_err(|e| ImageError::Decode(format!("裁剪任务异常终止：{}", e)))??;

        let bytes = Bytes::from(rendered.png);
        let object_url = self.register(bytes.clone(), CROP_MIME_TYPE)?;

        log::info!(
            "✂️ 裁剪完成 - 选区: {:.1}x{:.1}@({:.1},{:.1}) 输出: {}x{} 体积: {}KB 耗时: {}ms",
            crop.width,
            crop.height,
            crop.x,
            crop.y,
            rendered.width,
            rendered.height,
            bytes.len() / 1024,
            total_start.elapsed().as_millis()
        );

        Ok(ImageResource::new(
            object_url,
            bytes,
            CROP_MIME_TYPE.to_string(),
            rendered.width,
            rendered.height,
        ))
    }

    /// 同步栅格化：解码 → 缩放换算 → 拷贝 → PNG 编码。
    pub(crate) fn render_crop(
        bytes: &[u8],
        crop: PixelCrop,
        displayed: Option<DisplaySize>,
        config: &ImageConfig,
    ) -> Result<RenderedCrop, ImageError> {
        let decode_start = Instant::now();
        let source = Self::decode_with_limits(bytes, config)?;
        let (natural_width, natural_height) = source.dimensions();
        let decode_elapsed = decode_start.elapsed();

        let scale = ScaleFactors::between(natural_width, natural_height, displayed);
        let target = crop.scaled(scale);

        // 与画布尺寸赋值一致：向下取整
        let width = target.width.max(0.0).floor() as u32;
        let height = target.height.max(0.0).floor() as u32;
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidFormat(format!(
                "裁剪区域为空：{:.2}x{:.2}",
                target.width, target.height
            )));
        }
        Self::validate_output_pixels(config, width, height)?;

        let src_x = target.x.max(0.0).round() as u32;
        let src_y = target.y.max(0.0).round() as u32;

        let mut canvas = RgbaImage::new(width, height);
        let region = source.crop_imm(src_x, src_y, width, height).to_rgba8();
        imageops::replace(&mut canvas, &region, 0, 0);

        let encode_start = Instant::now();
        let png = Self::encode_png(&DynamicImage::ImageRgba8(canvas))?;

        log::debug!(
            "🧮 裁剪换算 - 原图: {}x{} 缩放: {:.4}x{:.4} decode={}ms encode={}ms",
            natural_width,
            natural_height,
            scale.x,
            scale.y,
            decode_elapsed.as_millis(),
            encode_start.elapsed().as_millis()
        );

        Ok(RenderedCrop { png, width, height })
    }

    fn validate_output_pixels(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
        let pixels = (width as u64) * (height as u64);
        if pixels > config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "裁剪输出像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }
        Ok(())
    }
}
