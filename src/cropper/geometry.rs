//! # 选区几何
//!
//! 百分比空间用于实时渲染选区覆盖层（与分辨率无关），
//! 像素空间是显示元素上的屏幕像素坐标，是栅格化的输入。

use serde::{Deserialize, Serialize};

/// 显示元素当前的渲染尺寸（屏幕像素）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 尺寸为正才代表元素已挂载、可用于换算。
    pub fn is_mounted(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// 显示坐标中的一个点。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 百分比空间选区（`unit: '%'`），相对显示尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentCrop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentCrop {
    pub const UNIT: &'static str = "%";

    pub fn to_pixels(&self, display: DisplaySize) -> PixelCrop {
        PixelCrop {
            x: self.x * display.width / 100.0,
            y: self.y * display.height / 100.0,
            width: self.width * display.width / 100.0,
            height: self.height * display.height / 100.0,
        }
    }

    /// 收敛到 `[0, 100]`，宽高非负。
    pub fn clamped(&self) -> Self {
        let x = self.x.clamp(0.0, 100.0);
        let y = self.y.clamp(0.0, 100.0);
        Self {
            x,
            y,
            width: self.width.max(0.0).min(100.0 - x),
            height: self.height.max(0.0).min(100.0 - y),
        }
    }
}

/// 像素空间选区（显示元素上的屏幕像素）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelCrop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelCrop {
    pub fn to_percent(&self, display: DisplaySize) -> PercentCrop {
        if !display.is_mounted() {
            return PercentCrop { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };
        }
        PercentCrop {
            x: self.x / display.width * 100.0,
            y: self.y / display.height * 100.0,
            width: self.width / display.width * 100.0,
            height: self.height / display.height * 100.0,
        }
    }

    /// 按缩放系数换算到原图分辨率。
    pub fn scaled(&self, scale: ScaleFactors) -> PixelCrop {
        PixelCrop {
            x: self.x * scale.x,
            y: self.y * scale.y,
            width: self.width * scale.x,
            height: self.height * scale.y,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// 由两个对角点构造，自动处理翻转。
    pub(crate) fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }
}

/// 原始分辨率 / 显示尺寸，两个轴独立计算。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    /// 显示尺寸未知（元素未挂载）的轴按 1 处理。
    pub fn between(natural_width: u32, natural_height: u32, displayed: Option<DisplaySize>) -> Self {
        let (display_width, display_height) = match displayed {
            Some(size) => (size.width, size.height),
            None => (0.0, 0.0),
        };

        let x = if display_width > 0.0 {
            natural_width as f64 / display_width
        } else {
            1.0
        };
        let y = if display_height > 0.0 {
            natural_height as f64 / display_height
        } else {
            1.0
        };

        Self { x, y }
    }
}

/// 以指定宽度百分比构造一个像素宽高比为 `aspect` 的选区，溢出时收缩。
pub fn make_aspect_crop(width_percent: f64, aspect: f64, display: DisplaySize) -> PercentCrop {
    let mut pixel = PixelCrop {
        x: 0.0,
        y: 0.0,
        width: width_percent * display.width / 100.0,
        height: 0.0,
    };
    pixel.height = pixel.width / aspect;

    if pixel.y + pixel.height > display.height {
        pixel.height = display.height - pixel.y;
        pixel.width = pixel.height * aspect;
    }
    if pixel.x + pixel.width > display.width {
        pixel.width = display.width - pixel.x;
        pixel.height = pixel.width / aspect;
    }

    pixel.to_percent(display)
}

/// 将选区居中。
pub fn center_crop(crop: PercentCrop, display: DisplaySize) -> PercentCrop {
    let mut pixel = crop.to_pixels(display);
    pixel.x = (display.width - pixel.width) / 2.0;
    pixel.y = (display.height - pixel.height) / 2.0;
    pixel.to_percent(display)
}
