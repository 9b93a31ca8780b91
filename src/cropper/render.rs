//! 变换渲染模块
//!
//! 交互视口、实时预览与最终输出共用同一个渲染函数 `render_transformed`，
//! 三者只在目标画布尺寸与其代表的逻辑范围上不同，因此取景在不同分辨率下保持一致。
//!
//! # 设计思路
//!
//! 绘制顺序固定为“以画布中心为原点 → 像素密度缩放 → 旋转 → 缩放 → 平移 → 以图片中心绘制”，
//! 使旋转与缩放始终围绕裁剪框的视觉中心，而不是图片左上角。
//!
//! # 实现思路
//!
//! - 变换用 `imageproc` 的 `Projection` 组合（`a * b` 表示先 `b` 后 `a`）。
//! - `warp_into` 以像素索引为坐标，而变换在连续坐标（像素中心位于 `i + 0.5`）中定义，
//!   两端各补半像素偏移，恒等变换因此逐字节复制源图。
//! - 采样使用带 1px 透明边的源图，边缘双线性过渡到透明，源图矩形之外保持透明。
//! - 像素密度 `k = 目标宽度 / 逻辑宽度`，视口的 k 为 1。

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::rect::Rect;

use super::transform::{LogicalSize, TransformState};
use crate::image_handler::{ImageError, SourceImage};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const OVERLAY_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OVERLAY_LINE_WIDTH: f64 = 2.0;
const OVERLAY_DASH: f64 = 5.0;
const OVERLAY_HANDLE_SIZE: f64 = 8.0;

/// 计算源图连续坐标到目标画布连续坐标的映射。
pub fn device_transform(
    natural_width: u32,
    natural_height: u32,
    transform: &TransformState,
    extent: LogicalSize,
    target: (u32, u32),
) -> Projection {
    let density = (target.0 as f64 / extent.width) as f32;
    let scale = transform.scale as f32;

    Projection::translate(target.0 as f32 / 2.0, target.1 as f32 / 2.0)
        * Projection::scale(density, density)
        * Projection::rotate(transform.rotation_radians() as f32)
        * Projection::scale(scale, scale)
        * Projection::translate(transform.pan.x as f32, transform.pan.y as f32)
        * Projection::translate(-(natural_width as f32) / 2.0, -(natural_height as f32) / 2.0)
}

/// 按变换状态把源图渲染到 `target` 尺寸的画布上。
///
/// `extent` 是目标画布所代表的逻辑区域：视口渲染传入整个视口，预览与输出传入裁剪框。
pub fn render_transformed(
    source: &SourceImage,
    transform: &TransformState,
    extent: LogicalSize,
    target: (u32, u32),
) -> Result<RgbaImage, ImageError> {
    let (target_width, target_height) = target;
    if target_width == 0 || target_height == 0 {
        return Err(ImageError::ContextAcquisition(format!(
            "画布尺寸为 0：{}x{}",
            target_width, target_height
        )));
    }
    if !(extent.width > 0.0 && extent.height > 0.0) {
        return Err(ImageError::Validation(format!(
            "逻辑区域必须为正：{}x{}",
            extent.width, extent.height
        )));
    }
    let finite = transform.scale.is_finite()
        && transform.rotation_degrees.is_finite()
        && transform.pan.x.is_finite()
        && transform.pan.y.is_finite();
    if !(finite && transform.scale > 0.0) {
        return Err(ImageError::Validation(format!(
            "变换不可逆：scale={} rotation={} pan=({}, {})",
            transform.scale, transform.rotation_degrees, transform.pan.x, transform.pan.y
        )));
    }

    // 带边源图索引 p 对应连续坐标 p - 0.5；画布连续坐标 c 对应像素索引 c - 0.5
    let projection = Projection::translate(-0.5, -0.5)
        * device_transform(source.width(), source.height(), transform, extent, target)
        * Projection::translate(-0.5, -0.5);

    let mut canvas = RgbaImage::new(target_width, target_height);
    warp_into(
        source.padded_pixels(),
        &projection,
        Interpolation::Bilinear,
        TRANSPARENT,
        &mut canvas,
    );
    Ok(canvas)
}

/// 在视口画布上叠加裁剪框提示：白色虚线边框与四角手柄。
///
/// 仅用于交互反馈，不影响预览与输出像素。
pub fn draw_crop_overlay(canvas: &mut RgbaImage, crop_box: LogicalSize, density: f64) {
    let width = crop_box.width * density;
    let height = crop_box.height * density;
    let left = (canvas.width() as f64 - width) / 2.0;
    let top = (canvas.height() as f64 - height) / 2.0;
    let right = left + width;
    let bottom = top + height;
    let half_line = OVERLAY_LINE_WIDTH / 2.0;

    // 水平边
    for edge_y in [top, bottom] {
        let mut x = left;
        while x < right {
            let dash_end = (x + OVERLAY_DASH).min(right);
            fill_rect(canvas, x, edge_y - half_line, dash_end - x, OVERLAY_LINE_WIDTH);
            x += OVERLAY_DASH * 2.0;
        }
    }

    // 垂直边
    for edge_x in [left, right] {
        let mut y = top;
        while y < bottom {
            let dash_end = (y + OVERLAY_DASH).min(bottom);
            fill_rect(canvas, edge_x - half_line, y, OVERLAY_LINE_WIDTH, dash_end - y);
            y += OVERLAY_DASH * 2.0;
        }
    }

    let half_handle = OVERLAY_HANDLE_SIZE / 2.0;
    for (corner_x, corner_y) in [(left, top), (right, top), (left, bottom), (right, bottom)] {
        fill_rect(
            canvas,
            corner_x - half_handle,
            corner_y - half_handle,
            OVERLAY_HANDLE_SIZE,
            OVERLAY_HANDLE_SIZE,
        );
    }
}

/// 填充像素中心落在矩形内的像素；画布外部分由 `imageproc` 裁掉。
fn fill_rect(canvas: &mut RgbaImage, x: f64, y: f64, width: f64, height: f64) {
    let x_start = (x - 0.5).ceil();
    let y_start = (y - 0.5).ceil();
    let x_end = (x + width - 0.5).ceil();
    let y_end = (y + height - 0.5).ceil();
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let rect = Rect::at(x_start as i32, y_start as i32)
        .of_size((x_end - x_start) as u32, (y_end - y_start) as u32);
    draw_filled_rect_mut(canvas, rect, OVERLAY_COLOR);
}
