//! # 交互式选区
//!
//! ## 设计思路
//!
//! 选区保存为两份显式快照：
//! - `live`：百分比空间，拖拽过程中的每一次变化都只更新它；
//! - `committed`：像素空间，只在拖拽结束时捕获，是裁剪确认的唯一输入。
//!
//! ## 实现思路
//!
//! - 图片显示后以 80% 宽、1:1 像素比例居中的选区作为初始 `live`，不提交。
//! - 拖拽手柄采用“反射点”算法：以对边/对角为固定点，指针越过固定点时手柄自动翻转。
//! - 所有坐标都收敛到显示区域内，宽高永远非负。

use serde::Serialize;

use super::geometry::{DisplaySize, PercentCrop, PixelCrop, Point, center_crop, make_aspect_crop};

const EDGE_GRAB_THICKNESS: f64 = 8.0;
const CORNER_DIAMETER: f64 = 16.0;
const INITIAL_WIDTH_PERCENT: f64 = 80.0;
const INITIAL_ASPECT: f64 = 1.0;

/// 拖拽手柄：八个边角加整体移动。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DragHandle {
    NW,
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    Move,
}

/// 选区的两份快照。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropSelection {
    pub live: Option<PercentCrop>,
    pub committed: Option<PixelCrop>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    handle: DragHandle,
    origin: Point,
    start: PixelCrop,
}

/// 交互式裁剪器。
#[derive(Debug, Clone, Default)]
pub struct Cropper {
    display: Option<DisplaySize>,
    live: Option<PercentCrop>,
    committed: Option<PixelCrop>,
    drag: Option<ActiveDrag>,
}

impl Cropper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 图片渲染完成：记录显示尺寸并播种初始选区。
    pub fn on_image_displayed(&mut self, display: DisplaySize) {
        self.display = Some(display);
        self.drag = None;
        self.committed = None;

        if !display.is_mounted() {
            self.live = None;
            log::warn!("⚠️ 显示尺寸无效，跳过初始选区: {}x{}", display.width, display.height);
            return;
        }

        let seed = center_crop(make_aspect_crop(INITIAL_WIDTH_PERCENT, INITIAL_ASPECT, display), display);
        self.live = Some(seed.clamped());
        log::debug!(
            "🔲 初始选区 - {:.2}%x{:.2}%@({:.2}%,{:.2}%)",
            seed.width,
            seed.height,
            seed.x,
            seed.y
        );
    }

    pub fn display(&self) -> Option<DisplaySize> {
        self.display
    }

    pub fn live(&self) -> Option<PercentCrop> {
        self.live
    }

    pub fn committed(&self) -> Option<PixelCrop> {
        self.committed
    }

    pub fn selection(&self) -> CropSelection {
        CropSelection {
            live: self.live,
            committed: self.committed,
        }
    }

    /// 由外部控件直接设置实时选区（不提交）。
    pub fn set_live(&mut self, crop: PercentCrop) {
        self.live = Some(crop.clamped());
    }

    /// 由外部控件直接提交像素选区。
    pub fn commit(&mut self, crop: PixelCrop) {
        self.committed = Some(self.clamp_pixels(crop));
    }

    /// 判断指针落在哪个手柄上；选区内部为 `Move`。
    pub fn hit_test(&self, point: Point) -> Option<DragHandle> {
        let rect = self.live_pixels()?;
        let half_corner = CORNER_DIAMETER / 2.0;
        let half_edge = EDGE_GRAB_THICKNESS / 2.0;

        let near = |a: f64, b: f64, tolerance: f64| (a - b).abs() <= tolerance;
        let within = |v: f64, lo: f64, hi: f64| v >= lo && v <= hi;

        let corners = [
            (DragHandle::NW, rect.x, rect.y),
            (DragHandle::NE, rect.right(), rect.y),
            (DragHandle::SW, rect.x, rect.bottom()),
            (DragHandle::SE, rect.right(), rect.bottom()),
        ];
        for (handle, cx, cy) in corners {
            if near(point.x, cx, half_corner) && near(point.y, cy, half_corner) {
                return Some(handle);
            }
        }

        if within(point.x, rect.x, rect.right()) {
            if near(point.y, rect.y, half_edge) {
                return Some(DragHandle::N);
            }
            if near(point.y, rect.bottom(), half_edge) {
                return Some(DragHandle::S);
            }
        }
        if within(point.y, rect.y, rect.bottom()) {
            if near(point.x, rect.x, half_edge) {
                return Some(DragHandle::W);
            }
            if near(point.x, rect.right(), half_edge) {
                return Some(DragHandle::E);
            }
        }

        rect.contains(point).then_some(DragHandle::Move)
    }

    /// 开始拖拽已有选区；没有显示尺寸或选区时返回 `false`。
    pub fn begin_drag(&mut self, handle: DragHandle, point: Point) -> bool {
        let Some(start) = self.live_pixels() else {
            return false;
        };
        let origin = self.clamp_point(point);
        self.drag = Some(ActiveDrag { handle, origin, start });
        true
    }

    /// 在选区外按下指针：以该点为锚点绘制新选区。
    pub fn begin_draw(&mut self, point: Point) -> bool {
        let Some(display) = self.mounted_display() else {
            return false;
        };
        let origin = self.clamp_point(point);
        let start = PixelCrop {
            x: origin.x,
            y: origin.y,
            width: 0.0,
            height: 0.0,
        };
        self.live = Some(start.to_percent(display));
        self.drag = Some(ActiveDrag {
            handle: DragHandle::SE,
            origin,
            start,
        });
        true
    }

    /// 拖拽中：只更新 `live`。
    pub fn drag_to(&mut self, point: Point) {
        let Some(display) = self.mounted_display() else {
            return;
        };
        let Some(drag) = self.drag else {
            return;
        };
        let Some(current) = self.live_pixels() else {
            return;
        };

        let p = self.clamp_point(point);
        let (handle, rect) = match drag.handle {
            DragHandle::Move => (DragHandle::Move, Self::translate(drag, p, display)),
            handle => Self::reflect(handle, current, p),
        };

        self.live = Some(self.clamp_pixels(rect).to_percent(display).clamped());
        self.drag = Some(ActiveDrag { handle, ..drag });
    }

    /// 拖拽结束：提交像素选区并返回。
    pub fn end_drag(&mut self) -> Option<PixelCrop> {
        self.drag.take()?;
        let committed = self.live_pixels()?;
        self.committed = Some(committed);
        log::debug!(
            "📌 提交选区 - {:.1}x{:.1}@({:.1},{:.1})",
            committed.width,
            committed.height,
            committed.x,
            committed.y
        );
        Some(committed)
    }

    /// 清空全部状态。
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn mounted_display(&self) -> Option<DisplaySize> {
        self.display.filter(|d| d.is_mounted())
    }

    fn live_pixels(&self) -> Option<PixelCrop> {
        let display = self.mounted_display()?;
        Some(self.live?.to_pixels(display))
    }

    fn clamp_point(&self, point: Point) -> Point {
        match self.mounted_display() {
            Some(d) => Point::new(point.x.clamp(0.0, d.width), point.y.clamp(0.0, d.height)),
            None => point,
        }
    }

    fn clamp_pixels(&self, crop: PixelCrop) -> PixelCrop {
        let Some(d) = self.mounted_display() else {
            return PixelCrop {
                width: crop.width.max(0.0),
                height: crop.height.max(0.0),
                ..crop
            };
        };
        let x = crop.x.clamp(0.0, d.width);
        let y = crop.y.clamp(0.0, d.height);
        PixelCrop {
            x,
            y,
            width: crop.width.max(0.0).min(d.width - x),
            height: crop.height.max(0.0).min(d.height - y),
        }
    }

    /// 整体平移，贴边时保持尺寸不变。
    fn translate(drag: ActiveDrag, p: Point, display: DisplaySize) -> PixelCrop {
        let start = drag.start;
        let dx = p.x - drag.origin.x;
        let dy = p.y - drag.origin.y;
        PixelCrop {
            x: (start.x + dx).clamp(0.0, (display.width - start.width).max(0.0)),
            y: (start.y + dy).clamp(0.0, (display.height - start.height).max(0.0)),
            ..start
        }
    }

    /// 以对边/对角为反射点调整选区，越过反射点时翻转手柄。
    fn reflect(handle: DragHandle, prev: PixelCrop, p: Point) -> (DragHandle, PixelCrop) {
        let (left, top, right, bottom) = (prev.x, prev.y, prev.right(), prev.bottom());
        let reflection = match handle {
            DragHandle::NW => (right, bottom),
            DragHandle::N => (left, bottom),
            DragHandle::NE => (left, bottom),
            DragHandle::E => (left, top),
            DragHandle::SE => (left, top),
            DragHandle::S => (left, top),
            DragHandle::SW => (right, top),
            DragHandle::W => (right, top),
            DragHandle::Move => return (handle, prev),
        };

        let next = match handle {
            DragHandle::NW | DragHandle::NE | DragHandle::SE | DragHandle::SW => {
                match (p.x < reflection.0, p.y < reflection.1) {
                    (true, true) => DragHandle::NW,
                    (false, true) => DragHandle::NE,
                    (true, false) => DragHandle::SW,
                    (false, false) => DragHandle::SE,
                }
            }
            DragHandle::N | DragHandle::S => {
                if p.y < reflection.1 {
                    DragHandle::N
                } else {
                    DragHandle::S
                }
            }
            DragHandle::E | DragHandle::W => {
                if p.x > reflection.0 {
                    DragHandle::E
                } else {
                    DragHandle::W
                }
            }
            DragHandle::Move => handle,
        };

        let rect = match next {
            DragHandle::N | DragHandle::S => PixelCrop::from_corners(
                Point::new(left, reflection.1),
                Point::new(right, p.y),
            ),
            DragHandle::E | DragHandle::W => PixelCrop::from_corners(
                Point::new(reflection.0, top),
                Point::new(p.x, bottom),
            ),
            _ => PixelCrop::from_corners(Point::new(reflection.0, reflection.1), p),
        };

        (next, rect)
    }
}
