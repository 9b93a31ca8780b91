//! # 裁剪会话模块
//!
//! ## 设计思路
//!
//! `CropSession` 把交互变换面、实时预览与最终输出组合成一个状态机：
//!
//! ```text
//! Loading ──load──▶ Ready ◀──▶ Adjusting
//!    │                │
//!    └─fail─▶ Failed  ├─commit─▶ Committed
//!                     └─cancel─▶ Cancelled
//! ```
//!
//! - 每次变换修改都会同步重渲染预览，因此任意时刻可见的预览都对应最新的变换状态。
//! - `Committed` / `Cancelled` / `Failed` 为终态：源图、预览、拖拽锚点全部丢弃，变换归零。
//! - 会话独占自己的源图与画布，不与其他会话共享任何可变资源。
//!
//! ## 实现思路
//!
//! 视口、预览、输出三条渲染路径都调用 `render_transformed`，只传入不同的逻辑范围与画布尺寸。

use image::RgbaImage;

use super::output::{CropConfig, CropOutputSpec, preview_dimensions};
use super::render::{draw_crop_overlay, render_transformed};
use super::transform::{
    LogicalSize, Point, ROTATION_STEP, ScaleRange, TransformState, ZOOM_STEP, auto_fit, crop_box_size,
};
use crate::image_handler::{EncodedImage, ImageConfig, ImageError, ImageHandler, OutputFormat, SourceImage};
use crate::image_handler::encode_rgba;

const DEFAULT_TITLE: &str = "Crop Image";

/// 会话状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropperState {
    /// 已交入源文件，等待解码。
    Loading,
    /// 解码完成、已自动适配并渲染预览。
    Ready,
    /// 拖拽或控件交互进行中。
    Adjusting,
    Committed,
    Cancelled,
    /// 加载阶段解码失败。
    Failed,
}

impl CropperState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled | Self::Failed)
    }
}

type CommitHook = Box<dyn FnOnce(EncodedImage) + Send>;
type CancelHook = Box<dyn FnOnce() + Send>;

/// 宿主 UI 的回调：提交时收到编码结果，取消时收到通知。
pub struct CropCallbacks {
    on_commit: CommitHook,
    on_cancel: CancelHook,
}

impl CropCallbacks {
    pub fn new<C, X>(on_commit: C, on_cancel: X) -> Self
    where
        C: FnOnce(EncodedImage) + Send + 'static,
        X: FnOnce() + Send + 'static,
    {
        Self {
            on_commit: Box::new(on_commit),
            on_cancel: Box::new(on_cancel),
        }
    }
}

/// 单次图片裁剪会话。
pub struct CropSession {
    state: CropperState,
    title: String,
    output: CropOutputSpec,
    config: ImageConfig,
    crop_box: LogicalSize,
    preview_size: (u32, u32),
    scale_range: ScaleRange,
    source: Option<SourceImage>,
    transform: TransformState,
    preview: Option<RgbaImage>,
    drag_anchor: Option<Point>,
    callbacks: Option<CropCallbacks>,
}

impl CropSession {
    /// 创建处于 `Loading` 状态的会话。
    ///
    /// 输出规格与所有画布尺寸在这里一次性校验，加载后不再变化。
    pub fn new(crop_config: &CropConfig, config: &ImageConfig, callbacks: CropCallbacks) -> Result<Self, ImageError> {
        let output = CropOutputSpec::from_config(crop_config)?;
        let crop_box = crop_box_size(config.viewport_size, config.crop_box_fraction, output.aspect_ratio());
        let preview_size = preview_dimensions(config.preview_width, output.aspect_ratio());

        let viewport_px = Self::viewport_pixels(config);
        ImageHandler::ensure_canvas(viewport_px, viewport_px, config)?;
        ImageHandler::ensure_canvas(preview_size.0, preview_size.1, config)?;
        ImageHandler::ensure_canvas(output.output_width(), output.output_height(), config)?;

        Ok(Self {
            state: CropperState::Loading,
            title: crop_config.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            output,
            config: config.clone(),
            crop_box,
            preview_size,
            scale_range: ScaleRange::new(config.min_scale, config.max_scale),
            source: None,
            transform: TransformState::identity(),
            preview: None,
            drag_anchor: None,
            callbacks: Some(callbacks),
        })
    }

    /// 解码完成：装入源图、自动适配、渲染首帧预览，进入 `Ready`。
    pub fn load(&mut self, source: SourceImage) -> Result<(), ImageError> {
        if self.state != CropperState::Loading {
            return Err(ImageError::InvalidState(format!(
                "只有加载中的会话可以装入源图（当前：{:?}）",
                self.state
            )));
        }

        self.transform = auto_fit(source.width(), source.height(), self.crop_box);
        log::info!(
            "🖼️ 裁剪会话就绪 - {} 源图 {}x{} 输出 {} 自动适配 scale={:.4}",
            self.title,
            source.width(),
            source.height(),
            self.output.size_label(),
            self.transform.scale
        );
        self.source = Some(source);
        self.refresh_preview()?;
        self.state = CropperState::Ready;
        Ok(())
    }

    /// 加载失败：会话进入终态，不产生任何输出。
    pub fn fail(&mut self, error: &ImageError) {
        log::error!("❌ 裁剪会话加载失败：{}", error);
        self.discard();
        self.state = CropperState::Failed;
    }

    pub fn state(&self) -> CropperState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn output_spec(&self) -> &CropOutputSpec {
        &self.output
    }

    pub fn crop_box(&self) -> LogicalSize {
        self.crop_box
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn scale_range(&self) -> ScaleRange {
        self.scale_range
    }

    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(|source| (source.width(), source.height()))
    }

    /// 源图宽高比文本，例如 `2.00:1`。
    pub fn aspect_label(&self) -> Option<String> {
        self.source
            .as_ref()
            .map(|source| format!("{:.2}:1", source.aspect_ratio()))
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<(), ImageError> {
        let range = self.scale_range;
        self.adjust("set_scale", |t| t.set_scale(scale, range))
    }

    pub fn zoom_in(&mut self) -> Result<(), ImageError> {
        let range = self.scale_range;
        self.adjust("zoom_in", |t| t.set_scale(t.scale + ZOOM_STEP, range))
    }

    pub fn zoom_out(&mut self) -> Result<(), ImageError> {
        let range = self.scale_range;
        self.adjust("zoom_out", |t| t.set_scale(t.scale - ZOOM_STEP, range))
    }

    pub fn set_rotation(&mut self, degrees: f64) -> Result<(), ImageError> {
        self.adjust("set_rotation", |t| t.set_rotation(degrees))
    }

    pub fn rotate_left(&mut self) -> Result<(), ImageError> {
        self.adjust("rotate_left", |t| t.rotate_by(-ROTATION_STEP))
    }

    pub fn rotate_right(&mut self) -> Result<(), ImageError> {
        self.adjust("rotate_right", |t| t.rotate_by(ROTATION_STEP))
    }

    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<(), ImageError> {
        self.adjust("pan", |t| t.pan_by(dx, dy))
    }

    /// 重新自动适配（“Fit” 按钮）。
    pub fn auto_fit(&mut self) -> Result<(), ImageError> {
        let (width, height) = self
            .source_dimensions()
            .ok_or_else(|| ImageError::InvalidState("没有可适配的源图".to_string()))?;
        let crop_box = self.crop_box;
        self.adjust("auto_fit", |t| *t = auto_fit(width, height, crop_box))
    }

    /// 回到恒等变换（“Reset” 按钮），与自动适配不同。
    pub fn reset(&mut self) -> Result<(), ImageError> {
        self.adjust("reset", TransformState::reset)
    }

    /// 按下指针开始拖拽，记录锚点 `pointer - pan`。
    pub fn begin_drag(&mut self, pointer_x: f64, pointer_y: f64) -> Result<(), ImageError> {
        self.ensure_interactive()?;
        self.drag_anchor = Some(Point::new(
            pointer_x - self.transform.pan.x,
            pointer_y - self.transform.pan.y,
        ));
        self.state = CropperState::Adjusting;
        Ok(())
    }

    /// 拖拽移动：`pan = pointer - anchor`。未处于拖拽中时忽略。
    pub fn drag_to(&mut self, pointer_x: f64, pointer_y: f64) -> Result<(), ImageError> {
        self.ensure_interactive()?;
        let Some(anchor) = self.drag_anchor else {
            return Ok(());
        };
        self.adjust("drag", |t| {
            t.set_pan(Point::new(pointer_x - anchor.x, pointer_y - anchor.y))
        })
    }

    /// 松开指针或离开画布。
    pub fn end_drag(&mut self) -> Result<(), ImageError> {
        self.ensure_interactive()?;
        self.drag_anchor = None;
        self.state = CropperState::Ready;
        Ok(())
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// 当前预览像素（与最终输出同一套变换数学，仅画布更小）。
    pub fn preview(&self) -> Result<&RgbaImage, ImageError> {
        self.preview
            .as_ref()
            .ok_or_else(|| ImageError::InvalidState("当前没有可用预览".to_string()))
    }

    /// 预览编码为 JPEG，可直接作为 `<img src>` 展示。
    pub fn preview_encoded(&self) -> Result<EncodedImage, ImageError> {
        encode_rgba(self.preview()?, OutputFormat::Jpeg, self.config.crop_quality)
    }

    /// 渲染交互视口：源图 + 裁剪框提示。
    pub fn render_viewport(&self) -> Result<RgbaImage, ImageError> {
        self.ensure_interactive()?;
        let source = self.active_source()?;
        let viewport_px = Self::viewport_pixels(&self.config);
        let extent = LogicalSize::square(self.config.viewport_size);

        let mut canvas = render_transformed(source, &self.transform, extent, (viewport_px, viewport_px))?;
        draw_crop_overlay(&mut canvas, self.crop_box, viewport_px as f64 / extent.width);
        Ok(canvas)
    }

    /// 提交：按输出规格渲染并编码，结果交给 `on_commit`，会话进入 `Committed`。
    ///
    /// 渲染或编码失败时会话保持原状态，不产生任何输出。
    pub fn commit(&mut self) -> Result<(), ImageError> {
        self.ensure_interactive()?;
        let source = self.active_source()?;

        let rendered = render_transformed(source, &self.transform, self.crop_box, self.output.dimensions())?;
        let encoded = encode_rgba(&rendered, OutputFormat::Jpeg, self.config.crop_quality)?;

        log::info!(
            "✂️ 裁剪提交 - {} 输出 {} scale={:.4} rotation={}° pan=({:.1}, {:.1}) size={}B",
            self.title,
            self.output.size_label(),
            self.transform.scale,
            self.transform.rotation_degrees,
            self.transform.pan.x,
            self.transform.pan.y,
            encoded.bytes().len()
        );

        let callbacks = self.callbacks.take();
        self.discard();
        self.state = CropperState::Committed;

        if let Some(callbacks) = callbacks {
            (callbacks.on_commit)(encoded);
        }
        Ok(())
    }

    /// 取消：丢弃全部状态，通知 `on_cancel`，不产生输出。
    pub fn cancel(&mut self) -> Result<(), ImageError> {
        if self.state.is_terminal() {
            return Err(ImageError::InvalidState(format!(
                "会话已结束（{:?}），无法取消",
                self.state
            )));
        }

        log::info!("🚫 裁剪会话取消 - {}", self.title);
        let callbacks = self.callbacks.take();
        self.discard();
        self.state = CropperState::Cancelled;

        if let Some(callbacks) = callbacks {
            (callbacks.on_cancel)();
        }
        Ok(())
    }

    fn adjust<F>(&mut self, action: &'static str, apply: F) -> Result<(), ImageError>
    where
        F: FnOnce(&mut TransformState),
    {
        self.ensure_interactive()?;
        self.state = CropperState::Adjusting;
        apply(&mut self.transform);
        log::debug!(
            "🎛️ {} -> scale={:.4} rotation={}° pan=({:.1}, {:.1})",
            action,
            self.transform.scale,
            self.transform.rotation_degrees,
            self.transform.pan.x,
            self.transform.pan.y
        );

        let refreshed = self.refresh_preview();
        if self.drag_anchor.is_none() {
            self.state = CropperState::Ready;
        }
        refreshed
    }

    fn refresh_preview(&mut self) -> Result<(), ImageError> {
        let source = self.active_source()?;
        let rendered = render_transformed(source, &self.transform, self.crop_box, self.preview_size)?;
        self.preview = Some(rendered);
        Ok(())
    }

    fn ensure_interactive(&self) -> Result<(), ImageError> {
        match self.state {
            CropperState::Ready | CropperState::Adjusting => Ok(()),
            CropperState::Loading => Err(ImageError::InvalidState("图片仍在加载，暂不接受变换操作".to_string())),
            other => Err(ImageError::InvalidState(format!("会话已结束（{:?}）", other))),
        }
    }

    fn active_source(&self) -> Result<&SourceImage, ImageError> {
        self.source
            .as_ref()
            .ok_or_else(|| ImageError::InvalidState("会话没有源图".to_string()))
    }

    fn discard(&mut self) {
        self.source = None;
        self.preview = None;
        self.drag_anchor = None;
        self.callbacks = None;
        self.transform = TransformState::identity();
    }

    fn viewport_pixels(config: &ImageConfig) -> u32 {
        (config.viewport_size.round() as u32).max(1)
    }
}
