//! 交互变换状态模块
//!
//! 描述作用在源图上的二维变换（缩放、旋转、平移），以及裁剪框尺寸与自动适配算法。
//!
//! # 设计思路
//!
//! - 变换状态是普通值对象，所有修改方法在单线程下原地修改，不依赖任何响应式框架。
//! - 缩放越界时夹取而非拒绝；旋转不限范围，仅展示时归一到 [-180, 180]。
//! - 平移不做任何约束，允许把图片完全移出裁剪框以选择任意区域。
//! - 算法纯函数化：输入为自然尺寸与裁剪框尺寸，输出唯一结果，便于测试。

use serde::{Deserialize, Serialize};

/// 缩放按钮步长
pub const ZOOM_STEP: f64 = 0.1;

/// 旋转按钮步长（度）
pub const ROTATION_STEP: f64 = 15.0;

/// 逻辑坐标系中的点或位移。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 逻辑单位下的矩形尺寸（与视口同一单位）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicalSize {
    pub width: f64,
    pub height: f64,
}

impl LogicalSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn square(size: f64) -> Self {
        Self::new(size, size)
    }
}

/// 缩放允许区间。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl ScaleRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min, self.max)
    }
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self::new(0.1, 5.0)
    }
}

/// 当前变换状态。
///
/// `pan` 位于“已旋转、已缩放”的坐标系中，单位为源图像素。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformState {
    pub scale: f64,
    pub rotation_degrees: f64,
    pub pan: Point,
}

impl Default for TransformState {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformState {
    /// 恒等变换：scale=1, rotation=0, pan=(0,0)。
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation_degrees: 0.0,
            pan: Point::ORIGIN,
        }
    }

    /// 设置缩放，超出区间的值被夹取，NaN 被忽略。
    pub fn set_scale(&mut self, scale: f64, range: ScaleRange) {
        if scale.is_nan() {
            log::warn!("⚠️ 忽略非法缩放值 NaN");
            return;
        }
        let clamped = range.clamp(scale);
        if clamped != scale {
            log::debug!("缩放 {} 超出 [{}, {}]，夹取为 {}", scale, range.min, range.max, clamped);
        }
        self.scale = clamped;
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        if !degrees.is_finite() {
            log::warn!("⚠️ 忽略非法旋转值 {}", degrees);
            return;
        }
        self.rotation_degrees = degrees;
    }

    pub fn rotate_by(&mut self, delta_degrees: f64) {
        self.set_rotation(self.rotation_degrees + delta_degrees);
    }

    /// 累加平移，不做范围约束；结果非有限值时忽略本次平移。
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.set_pan(Point::new(self.pan.x + dx, self.pan.y + dy));
    }

    pub fn set_pan(&mut self, pan: Point) {
        if !(pan.x.is_finite() && pan.y.is_finite()) {
            log::warn!("⚠️ 忽略非法平移值 ({}, {})", pan.x, pan.y);
            return;
        }
        self.pan = pan;
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    pub fn rotation_radians(&self) -> f64 {
        self.rotation_degrees.to_radians()
    }

    /// 展示用旋转角，归一到 [-180, 180]。
    pub fn display_rotation(&self) -> f64 {
        let normalized = (self.rotation_degrees + 180.0).rem_euclid(360.0) - 180.0;
        if normalized == -180.0 && self.rotation_degrees > 0.0 {
            180.0
        } else {
            normalized
        }
    }
}

/// 计算视口中的裁剪框尺寸。
///
/// 宽度固定为 `viewport * fraction`，高度按宽高比推导（竖向比例时高度可能超出视口）。
pub fn crop_box_size(viewport_size: f64, fraction: f64, aspect_ratio: f64) -> LogicalSize {
    let width = viewport_size * fraction;
    LogicalSize::new(width, width / aspect_ratio)
}

/// 自动适配：让图片恰好贴合裁剪框的一条边，另一条边不超出。
///
/// `scale = min(cropW / naturalW, cropH / naturalH)`，同时平移归零、旋转归零。
/// 结果不受缩放区间约束，超大源图可以得到低于下限的缩放。
pub fn auto_fit(natural_width: u32, natural_height: u32, crop_box: LogicalSize) -> TransformState {
    let scale_x = crop_box.width / natural_width.max(1) as f64;
    let scale_y = crop_box.height / natural_height.max(1) as f64;

    TransformState {
        scale: scale_x.min(scale_y),
        rotation_degrees: 0.0,
        pan: Point::ORIGIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_pan_is_ignored() {
        let mut transform = TransformState::identity();
        transform.pan_by(3.0, -4.0);

        transform.pan_by(f64::NAN, 1.0);
        transform.pan_by(1.0, f64::INFINITY);
        transform.set_pan(Point::new(f64::NEG_INFINITY, 0.0));
        assert_eq!(transform.pan, Point::new(3.0, -4.0));

        transform.pan_by(f64::MAX, 0.0);
        transform.pan_by(f64::MAX, 0.0);
        assert_eq!(transform.pan.y, -4.0);
        assert!(transform.pan.x.is_finite());
    }
    use proptest::prelude::*;

    #[test]
    fn set_scale_clamps_above_range() {
        let mut transform = TransformState::identity();
        transform.set_scale(6.0, ScaleRange::default());
        assert_eq!(transform.scale, 5.0);
    }

    #[test]
    fn set_scale_clamps_below_range() {
        let mut transform = TransformState::identity();
        transform.set_scale(0.01, ScaleRange::default());
        assert_eq!(transform.scale, 0.1);
    }

    #[test]
    fn set_scale_ignores_nan() {
        let mut transform = TransformState::identity();
        transform.set_scale(f64::NAN, ScaleRange::default());
        assert_eq!(transform.scale, 1.0);
    }

    #[test]
    fn pan_accumulates_without_limits() {
        let mut transform = TransformState::identity();
        transform.pan_by(10.0, -4.0);
        transform.pan_by(5_000.0, 2.5);
        assert_eq!(transform.pan, Point::new(5_010.0, -1.5));
    }

    #[test]
    fn reset_returns_to_identity() {
        let mut transform = TransformState {
            scale: 2.5,
            rotation_degrees: 45.0,
            pan: Point::new(3.0, 4.0),
        };
        transform.reset();
        assert_eq!(transform, TransformState::identity());
    }

    #[test]
    fn display_rotation_wraps_into_half_turns() {
        let mut transform = TransformState::identity();
        for (raw, shown) in [(0.0, 0.0), (195.0, -165.0), (-195.0, 165.0), (180.0, 180.0), (-180.0, -180.0), (720.0, 0.0)] {
            transform.set_rotation(raw);
            assert_eq!(transform.display_rotation(), shown, "raw rotation {}", raw);
        }
    }

    #[test]
    fn crop_box_follows_aspect_ratio() {
        let square = crop_box_size(300.0, 0.8, 1.0);
        assert!((square.width - 240.0).abs() < 1e-9 && (square.height - 240.0).abs() < 1e-9);

        let banner = crop_box_size(300.0, 0.8, 3.0);
        assert!((banner.width - 240.0).abs() < 1e-9 && (banner.height - 80.0).abs() < 1e-9);
    }

    #[test]
    fn auto_fit_wide_source_into_square_box() {
        let fit = auto_fit(800, 400, crop_box_size(300.0, 0.8, 1.0));
        assert!((fit.scale - 0.3).abs() < 1e-12);
        assert_eq!(fit.pan, Point::ORIGIN);
        assert_eq!(fit.rotation_degrees, 0.0);
    }

    proptest! {
        #[test]
        fn auto_fit_spans_one_axis_and_stays_within_the_other(
            width in 1u32..=8000,
            height in 1u32..=8000,
            aspect in 0.25f64..=4.0,
        ) {
            let crop = crop_box_size(300.0, 0.8, aspect);
            let fit = auto_fit(width, height, crop);
            let drawn_w = width as f64 * fit.scale;
            let drawn_h = height as f64 * fit.scale;

            prop_assert!(drawn_w <= crop.width + 1e-9);
            prop_assert!(drawn_h <= crop.height + 1e-9);
            prop_assert!(
                (drawn_w - crop.width).abs() < 1e-9 || (drawn_h - crop.height).abs() < 1e-9
            );
        }
    }
}
