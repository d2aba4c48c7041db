//! # 裁剪选区模块（cropper）
//!
//! - `geometry`：百分比/像素两套坐标、显示尺寸与缩放系数
//! - `selection`：拖拽交互与 `live` / `committed` 两份快照

mod geometry;
mod selection;

pub use geometry::{
    DisplaySize, PercentCrop, PixelCrop, Point, ScaleFactors, center_crop, make_aspect_crop,
};
pub use selection::{CropSelection, Cropper, DragHandle};
