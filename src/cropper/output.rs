//! 裁剪输出规格
//!
//! 调用方按用途（头像 / 横幅）提供 `CropConfig`，这里将其解析为确定的输出尺寸。
//! 裁剪框宽高比与输出画布宽高比必须一致，否则输出会被非等比拉伸，因此显式高度与
//! `aspect_ratio` 不一致时直接拒绝。

use serde::{Deserialize, Serialize};

use crate::image_handler::ImageError;

/// 打开裁剪会话时的调用方参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropConfig {
    pub aspect_ratio: f64,
    pub output_width: u32,
    #[serde(default)]
    pub output_height: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.0,
            output_width: 400,
            output_height: None,
            title: None,
        }
    }
}

/// 解析后的输出规格。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropOutputSpec {
    output_width: u32,
    output_height: u32,
    aspect_ratio: f64,
}

impl CropOutputSpec {
    /// 构建输出规格。
    ///
    /// 未给出高度时按 `round(width / aspect_ratio)` 推导；给出时允许 1px 的取整误差。
    pub fn new(aspect_ratio: f64, output_width: u32, output_height: Option<u32>) -> Result<Self, ImageError> {
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
            return Err(ImageError::Validation(format!("宽高比必须为正数：{}", aspect_ratio)));
        }
        if output_width == 0 {
            return Err(ImageError::Validation("输出宽度必须大于 0".to_string()));
        }

        let derived_height = output_width as f64 / aspect_ratio;
        let output_height = match output_height {
            Some(0) => {
                return Err(ImageError::Validation("输出高度必须大于 0".to_string()));
            }
            Some(height) if (height as f64 - derived_height).abs() > 1.0 => {
                return Err(ImageError::Validation(format!(
                    "输出尺寸 {}x{} 与宽高比 {} 不一致，输出会被拉伸",
                    output_width, height, aspect_ratio
                )));
            }
            Some(height) => height,
            None => (derived_height.round() as u32).max(1),
        };

        Ok(Self {
            output_width,
            output_height,
            aspect_ratio,
        })
    }

    pub fn from_config(config: &CropConfig) -> Result<Self, ImageError> {
        Self::new(config.aspect_ratio, config.output_width, config.output_height)
    }

    pub fn output_width(&self) -> u32 {
        self.output_width
    }

    pub fn output_height(&self) -> u32 {
        self.output_height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    /// 尺寸标签，例如 `1200 × 400px`。
    pub fn size_label(&self) -> String {
        format!("{} × {}px", self.output_width, self.output_height)
    }
}

/// 预览画布尺寸：固定宽度，高度按宽高比推导。
pub fn preview_dimensions(preview_width: u32, aspect_ratio: f64) -> (u32, u32) {
    let height = (preview_width as f64 / aspect_ratio).round() as u32;
    (preview_width, height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_is_derived_from_aspect_ratio() {
        let spec = CropOutputSpec::new(3.0, 1200, None).expect("valid spec");
        assert_eq!(spec.dimensions(), (1200, 400));
        assert_eq!(spec.size_label(), "1200 × 400px");
    }

    #[test]
    fn derived_height_is_rounded() {
        let spec = CropOutputSpec::new(3.0, 400, None).expect("valid spec");
        assert_eq!(spec.dimensions(), (400, 133));
    }

    #[test]
    fn explicit_height_within_rounding_is_accepted() {
        let spec = CropOutputSpec::new(3.0, 400, Some(134)).expect("valid spec");
        assert_eq!(spec.output_height(), 134);
    }

    #[test]
    fn mismatched_explicit_height_is_rejected() {
        assert!(matches!(
            CropOutputSpec::new(1.0, 400, Some(300)),
            Err(ImageError::Validation(_))
        ));
    }

    #[test]
    fn non_positive_inputs_are_rejected() {
        assert!(CropOutputSpec::new(0.0, 400, None).is_err());
        assert!(CropOutputSpec::new(f64::NAN, 400, None).is_err());
        assert!(CropOutputSpec::new(1.0, 0, None).is_err());
        assert!(CropOutputSpec::new(1.0, 400, Some(0)).is_err());
    }

    #[test]
    fn config_deserializes_from_host_json() {
        let config: CropConfig =
            serde_json::from_str(r#"{"aspectRatio": 3, "outputWidth": 1200, "title": "Crop Banner Image"}"#)
                .expect("valid json");
        let spec = CropOutputSpec::from_config(&config).expect("valid spec");

        assert_eq!(spec.dimensions(), (1200, 400));
        assert_eq!(config.title.as_deref(), Some("Crop Banner Image"));
    }

    #[test]
    fn preview_dimensions_follow_aspect() {
        assert_eq!(preview_dimensions(120, 1.0), (120, 120));
        assert_eq!(preview_dimensions(120, 3.0), (120, 40));
        assert_eq!(preview_dimensions(120, 500.0), (120, 1));
    }
}
