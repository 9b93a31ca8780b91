//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排与配置管理，不直接与任何 UI 框架绑定。
//! 两条处理链路：
//! 1. 压缩：读取配置快照 → 加载原始字节 → 解码 → 有界缩放 → 重新编码
//! 2. 裁剪：读取配置快照 → 加载原始字节 → 解码（会话处于 Loading）→ 交给 `CropSession`
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ImageConfig>>` 支持运行时动态替换。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 异步入口把 CPU 密集的解码/缩放放到 `spawn_blocking`，解码完成前会话不接受任何变换操作。
//! - 记录 `load/decode/compress/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::source::{ImageSource, RawImageData, SourceImage};
use super::{CompressOptions, EncodedImage, ImageConfig, ImageError};
use crate::cropper::{CropCallbacks, CropConfig, CropSession, CropperState};
use crate::settings::PipelineSettings;

/// 图片处理器。
///
/// 封装了配置状态，并编排各子模块实现完整流程。本身不持有任何会话状态。
pub struct ImageHandler {
    pub(super) config: Arc<RwLock<ImageConfig>>,
}

impl ImageHandler {
    /// 根据初始配置创建处理器。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use profile_image::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// # Ok::<(), profile_image::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<ImageConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置（先校验再生效）。
    pub fn set_config(&self, next: ImageConfig) -> Result<(), ImageError> {
        next.validate()?;

        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *config = next;
        Ok(())
    }

    /// 将设置文件中的覆盖项应用到当前配置。
    pub fn apply_settings(&self, settings: &PipelineSettings) -> Result<(), ImageError> {
        let mut next = self.config_snapshot()?;
        settings.apply_to(&mut next)?;
        self.set_config(next.clone())?;

        log::info!(
            "⚙️ 已应用图片设置（max_file_size={}, viewport={}, preview_width={}, scale=[{}, {}], filter={:?}）",
            next.max_file_size,
            next.viewport_size,
            next.preview_width,
            next.min_scale,
            next.max_scale,
            next.resize_filter
        );

        Ok(())
    }

    /// 压缩入口：从任意来源加载图片并输出有界尺寸的编码结果。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use profile_image::image_handler::{CompressOptions, ImageConfig, ImageHandler, ImageSource};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// let encoded = handler.compress(
    ///     ImageSource::FilePath("/tmp/avatar.png".into()),
    ///     &CompressOptions::default(),
    /// )?;
    /// println!("{}", encoded.to_data_url());
    /// # Ok::<(), profile_image::image_handler::ImageError>(())
    /// ```
    pub fn compress(&self, source: ImageSource, options: &CompressOptions) -> Result<EncodedImage, ImageError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let raw = self.timed_load(source, &config)?;
        let encoded = Self::decode_and_compress(raw, options, &config)?;

        log::info!("✅ 图片压缩链路完成 - total={}ms", total_start.elapsed().as_millis());
        Ok(encoded)
    }

    /// 异步压缩入口，解码与缩放在阻塞线程池中执行。
    pub async fn compress_async(
        &self,
        source: ImageSource,
        options: CompressOptions,
    ) -> Result<EncodedImage, ImageError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let raw = self.timed_load(source, &config)?;
        let encoded = tokio::task::spawn_blocking(move || Self::decode_and_compress(raw, &options, &config))
            .await
            .map_err(|e| ImageError::ContextAcquisition(format!("后台压缩任务失败：{}", e)))??;

        log::info!("✅ 图片压缩链路完成（异步）- total={}ms", total_start.elapsed().as_millis());
        Ok(encoded)
    }

    /// 只读取图片头，返回自然尺寸。
    pub fn inspect_dimensions(&self, source: ImageSource) -> Result<(u32, u32), ImageError> {
        let config = self.config_snapshot()?;
        let raw = self.load_source(source, &config)?;
        Self::inspect_dimensions_from_memory(&raw.bytes)
    }

    /// 打开裁剪会话（同步解码）。
    ///
    /// 返回的会话已处于 `Ready`：自动适配已完成、预览已渲染。
    pub fn open_cropper(
        &self,
        source: ImageSource,
        crop_config: &CropConfig,
        callbacks: CropCallbacks,
    ) -> Result<CropSession, ImageError> {
        let config = self.config_snapshot()?;
        let mut session = CropSession::new(crop_config, &config, callbacks)?;

        let decoded = self
            .load_source(source, &config)
            .and_then(|raw| Self::decode_raw(raw, &config));

        Self::finish_loading(&mut session, decoded)?;
        Ok(session)
    }

    /// 创建处于 `Loading` 的裁剪会话，尚未解码任何字节。
    ///
    /// 宿主可以先展示会话（标题、输出尺寸），并在解码前调用 `cancel`；
    /// 随后用 `load_cropper` 装入源图。
    pub fn start_cropper(&self, crop_config: &CropConfig, callbacks: CropCallbacks) -> Result<CropSession, ImageError> {
        let config = self.config_snapshot()?;
        CropSession::new(crop_config, &config, callbacks)
    }

    /// 在后台解码源图并装入 `Loading` 会话。
    ///
    /// 会话已被取消或已离开 `Loading` 时直接返回 `InvalidState`，不读取也不解码源数据。
    /// 解码失败对该会话是致命的，错误直接返回给调用方。
    pub async fn load_cropper(&self, session: &mut CropSession, source: ImageSource) -> Result<(), ImageError> {
        if session.state() != CropperState::Loading {
            log::warn!("⚠️ 会话已离开加载状态（{:?}），跳过解码", session.state());
            return Err(ImageError::InvalidState(format!(
                "只有加载中的会话可以装入源图（当前：{:?}）",
                session.state()
            )));
        }

        let config = self.config_snapshot()?;
        let decoded = match self.load_source(source, &config) {
            Ok(raw) => tokio::task::spawn_blocking(move || Self::decode_raw(raw, &config))
                .await
                .map_err(|e| ImageError::ContextAcquisition(format!("后台解码任务失败：{}", e)))
                .and_then(|result| result),
            Err(err) => Err(err),
        };

        Self::finish_loading(session, decoded)
    }

    /// 打开裁剪会话（异步解码）。
    ///
    /// 等价于 `start_cropper` 后立即 `load_cropper`。需要在解码期间取消的宿主应分开调用两者。
    pub async fn open_cropper_async(
        &self,
        source: ImageSource,
        crop_config: &CropConfig,
        callbacks: CropCallbacks,
    ) -> Result<CropSession, ImageError> {
        let mut session = self.start_cropper(crop_config, callbacks)?;
        self.load_cropper(&mut session, source).await?;
        Ok(session)
    }

    fn finish_loading(
        session: &mut CropSession,
        decoded: Result<image::DynamicImage, ImageError>,
    ) -> Result<(), ImageError> {
        match decoded {
            Ok(image) => session.load(SourceImage::from_dynamic(image)),
            Err(err) => {
                session.fail(&err);
                Err(err)
            }
        }
    }

    fn timed_load(&self, source: ImageSource, config: &ImageConfig) -> Result<RawImageData, ImageError> {
        let load_start = Instant::now();
        let raw = self.load_source(source, config)?;
        log::debug!(
            "📥 加载完成 - 来源: {} 大小: {}B load={}ms",
            raw.source_hint,
            raw.bytes.len(),
            load_start.elapsed().as_millis()
        );
        Ok(raw)
    }

    fn decode_and_compress(
        raw: RawImageData,
        options: &CompressOptions,
        config: &ImageConfig,
    ) -> Result<EncodedImage, ImageError> {
        let decode_start = Instant::now();
        let decoded = Self::decode_raw(raw, config)?;
        log::debug!("🧮 解码耗时 decode={}ms", decode_start.elapsed().as_millis());

        Self::compress_decoded(decoded, options, config)
    }
}
