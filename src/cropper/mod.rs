//! # 交互裁剪模块（cropper）
//!
//! ## 设计思路
//!
//! 把“交互变换面 → 实时预览 → 最终输出”拆成互不依赖 UI 的几个部分：
//!
//! - `transform`：变换状态、缩放区间、裁剪框尺寸与自动适配
//! - `render`：唯一的渲染函数，视口 / 预览 / 输出共用
//! - `output`：调用方参数与输出尺寸规格
//! - `session`：状态机，串联上述部分并驱动回调
//!
//! ## 实现思路
//!
//! ```text
//! ImageHandler::open_cropper
//!    ↓
//! CropSession::new（Loading）
//!    ↓ 解码完成
//! CropSession::load（auto_fit + 首帧预览 → Ready）
//!    ↓ set_scale / rotate / pan / drag ...
//! render_transformed（预览，120px）
//!    ↓
//! commit（render_transformed 输出尺寸 → JPEG → on_commit）
//! ```
//!
//! 预览与输出只在目标画布尺寸上不同，取景一致性由同一套变换数学保证。

mod output;
mod render;
mod session;
mod transform;

pub use output::{CropConfig, CropOutputSpec, preview_dimensions};
pub use render::{device_transform, draw_crop_overlay, render_transformed};
pub use session::{CropCallbacks, CropSession, CropperState};
pub use transform::{
    LogicalSize, Point, ROTATION_STEP, ScaleRange, TransformState, ZOOM_STEP, auto_fit, crop_box_size,
};
