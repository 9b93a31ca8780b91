//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中图片用途预设（profile / banner）作为高层语义，映射到压缩参数与裁剪参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（5MB 上传上限、300 视口、0.1~5.0 缩放区间）。
//! - `ImagePreset` 负责预设字符串解析与反向输出。
//! - `CompressOptions` / `OutputFormat` 描述单次压缩请求。
//! - `validate` 在配置整体替换前做一致性检查。

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::ImageError;
use crate::cropper::CropConfig;

/// 图片处理配置。
///
/// 字段覆盖了上传校验、解码限制、降采样与裁剪画布四个阶段。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 上传文件允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 单张渲染画布允许的最大像素数，超出视为无法获取画布。
    pub max_output_pixels: u64,
    /// 压缩阶段降采样滤镜。
    pub resize_filter: FilterType,
    /// 交互视口边长（逻辑单位）。
    pub viewport_size: f64,
    /// 裁剪框宽度占视口的比例。
    pub crop_box_fraction: f64,
    /// 实时预览图宽度（像素），高度由宽高比推导。
    pub preview_width: u32,
    pub min_scale: f64,
    pub max_scale: f64,
    /// 裁剪输出 JPEG 质量（0~1）。
    pub crop_quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 5 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            max_output_pixels: 16_000_000,
            resize_filter: FilterType::Triangle,
            viewport_size: 300.0,
            crop_box_fraction: 0.8,
            preview_width: 120,
            min_scale: 0.1,
            max_scale: 5.0,
            crop_quality: 0.9,
        }
    }
}

impl ImageConfig {
    /// 校验配置的一致性。
    ///
    /// 只拒绝没有安全默认值的组合，例如零尺寸或反转的缩放区间。
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.max_file_size == 0 {
            return Err(ImageError::Validation("max_file_size 必须大于 0".to_string()));
        }
        if self.max_decoded_pixels == 0 || self.max_output_pixels == 0 {
            return Err(ImageError::Validation("像素上限必须大于 0".to_string()));
        }
        if !(self.viewport_size.is_finite() && self.viewport_size > 0.0) {
            return Err(ImageError::Validation(format!(
                "viewport_size 必须为正数：{}",
                self.viewport_size
            )));
        }
        if !(self.crop_box_fraction > 0.0 && self.crop_box_fraction <= 1.0) {
            return Err(ImageError::Validation(format!(
                "crop_box_fraction 必须在 (0, 1] 之间：{}",
                self.crop_box_fraction
            )));
        }
        if self.preview_width == 0 {
            return Err(ImageError::Validation("preview_width 必须大于 0".to_string()));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale && self.max_scale.is_finite()) {
            return Err(ImageError::Validation(format!(
                "缩放区间非法：[{}, {}]",
                self.min_scale, self.max_scale
            )));
        }
        Ok(())
    }
}

/// 从配置字符串解析降采样滤镜。
pub fn parse_resize_filter(name: &str) -> Result<FilterType, ImageError> {
    match name.trim().to_lowercase().as_str() {
        "nearest" => Ok(FilterType::Nearest),
        "triangle" | "bilinear" => Ok(FilterType::Triangle),
        "catmull-rom" | "catmullrom" => Ok(FilterType::CatmullRom),
        "gaussian" => Ok(FilterType::Gaussian),
        "lanczos3" => Ok(FilterType::Lanczos3),
        other => Err(ImageError::InvalidFormat(format!(
            "未知滤镜：{}（可选：nearest / triangle / catmull-rom / gaussian / lanczos3）",
            other
        ))),
    }
}

pub fn resize_filter_name(filter: FilterType) -> &'static str {
    match filter {
        FilterType::Nearest => "nearest",
        FilterType::Triangle => "triangle",
        FilterType::CatmullRom => "catmull-rom",
        FilterType::Gaussian => "gaussian",
        FilterType::Lanczos3 => "lanczos3",
    }
}

/// 编码输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn from_str(format: &str) -> Result<Self, ImageError> {
        match format.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(Self::Jpeg),
            "png" | "image/png" => Ok(Self::Png),
            "webp" | "image/webp" => Ok(Self::Webp),
            other => Err(ImageError::InvalidFormat(format!(
                "不支持的输出格式：{}（可选：jpeg / png / webp）",
                other
            ))),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// 单次压缩请求参数。
///
/// 所有字段都有默认值：1200×1200、质量 0.8、JPEG。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompressOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: f32,
    pub format: OutputFormat,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_width: 1200,
            max_height: 1200,
            quality: 0.8,
            format: OutputFormat::Jpeg,
        }
    }
}

/// 图片用途预设（面向产品语义）。
///
/// - `Profile`：头像，正方形
/// - `Banner`：横幅，3:1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePreset {
    Profile,
    Banner,
}

impl ImagePreset {
    /// 从外部字符串解析预设。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use profile_image::image_handler::ImagePreset;
    ///
    /// let p = ImagePreset::from_str("banner")?;
    /// assert_eq!(p.as_str(), "banner");
    /// # Ok::<(), profile_image::image_handler::ImageError>(())
    /// ```
    pub fn from_str(preset: &str) -> Result<Self, ImageError> {
        match preset.trim().to_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "banner" => Ok(Self::Banner),
            other => Err(ImageError::InvalidFormat(format!(
                "未知图片预设：{}（可选：profile / banner）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Banner => "banner",
        }
    }

    /// 进入裁剪前的压缩参数。
    pub fn compress_options(self) -> CompressOptions {
        let (max_width, max_height) = match self {
            Self::Profile => (400, 400),
            Self::Banner => (1200, 400),
        };

        CompressOptions {
            max_width,
            max_height,
            quality: 0.8,
            format: OutputFormat::Jpeg,
        }
    }

    /// 裁剪会话参数。
    pub fn crop_config(self) -> CropConfig {
        match self {
            Self::Profile => CropConfig {
                aspect_ratio: 1.0,
                output_width: 400,
                output_height: None,
                title: Some("Crop Profile Picture".to_string()),
            },
            Self::Banner => CropConfig {
                aspect_ratio: 3.0,
                output_width: 1200,
                output_height: None,
                title: Some("Crop Banner Image".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ImageConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_scale_range() {
        let config = ImageConfig {
            min_scale: 3.0,
            max_scale: 0.5,
            ..ImageConfig::default()
        };
        assert!(matches!(config.validate(), Err(ImageError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_preview_width() {
        let config = ImageConfig {
            preview_width: 0,
            ..ImageConfig::default()
        };
        assert!(matches!(config.validate(), Err(ImageError::Validation(_))));
    }

    #[test]
    fn preset_round_trips_through_strings() {
        for preset in [ImagePreset::Profile, ImagePreset::Banner] {
            assert_eq!(ImagePreset::from_str(preset.as_str()).ok(), Some(preset));
        }
        assert!(matches!(
            ImagePreset::from_str("avatar"),
            Err(ImageError::InvalidFormat(_))
        ));
    }

    #[test]
    fn banner_preset_uses_wide_bounds() {
        let options = ImagePreset::Banner.compress_options();
        assert_eq!((options.max_width, options.max_height), (1200, 400));

        let crop = ImagePreset::Banner.crop_config();
        assert_eq!(crop.aspect_ratio, 3.0);
        assert_eq!(crop.output_width, 1200);
    }

    #[test]
    fn output_format_accepts_mime_and_short_names() {
        assert_eq!(OutputFormat::from_str("JPG").ok(), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_str("image/png").ok(), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::Webp.mime_type(), "image/webp");
        assert!(OutputFormat::from_str("gif").is_err());
    }

    #[test]
    fn resize_filter_names_are_stable() {
        for name in ["nearest", "triangle", "catmull-rom", "gaussian", "lanczos3"] {
            let filter = parse_resize_filter(name).expect("known filter");
            assert_eq!(resize_filter_name(filter), name);
        }
    }

    #[test]
    fn compress_options_deserialize_with_defaults() {
        let options: CompressOptions =
            serde_json::from_str(r#"{"maxWidth": 640, "format": "png"}"#).expect("valid json");
        assert_eq!(options.max_width, 640);
        assert_eq!(options.max_height, 1200);
        assert_eq!(options.format, OutputFormat::Png);
        assert!((options.quality - 0.8).abs() < f32::EPSILON);
    }
}
