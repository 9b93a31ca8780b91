//! 设置文件模块
//!
//! 设置文件是 `ImageConfig` 的可选覆盖层，以 pretty JSON 持久化。
//! 未出现的字段保持当前配置不变；应用前整体校验，失败时配置保持原样。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::{ImageConfig, ImageError, parse_resize_filter, resize_filter_name};

/// 可持久化的图片流水线设置，所有字段可选。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_decoded_pixels: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_pixels: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_box_fraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_quality: Option<f32>,
}

impl PipelineSettings {
    /// 导出当前配置的完整设置。
    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            max_file_size: Some(config.max_file_size),
            max_decoded_pixels: Some(config.max_decoded_pixels),
            max_output_pixels: Some(config.max_output_pixels),
            resize_filter: Some(resize_filter_name(config.resize_filter).to_string()),
            viewport_size: Some(config.viewport_size),
            crop_box_fraction: Some(config.crop_box_fraction),
            preview_width: Some(config.preview_width),
            min_scale: Some(config.min_scale),
            max_scale: Some(config.max_scale),
            crop_quality: Some(config.crop_quality),
        }
    }

    /// 把覆盖项写入 `config`，并校验结果。
    ///
    /// 出错时 `config` 可能已被部分修改，调用方应只在成功后使用它。
    pub fn apply_to(&self, config: &mut ImageConfig) -> Result<(), ImageError> {
        if let Some(value) = self.max_file_size {
            config.max_file_size = value;
        }
        if let Some(value) = self.max_decoded_pixels {
            config.max_decoded_pixels = value;
            // 内存上限随像素上限同步（RGBA 4 字节）
            config.max_decoded_bytes = value.saturating_mul(4);
        }
        if let Some(value) = self.max_output_pixels {
            config.max_output_pixels = value;
        }
        if let Some(name) = &self.resize_filter {
            config.resize_filter = parse_resize_filter(name)?;
        }
        if let Some(value) = self.viewport_size {
            config.viewport_size = value;
        }
        if let Some(value) = self.crop_box_fraction {
            config.crop_box_fraction = value;
        }
        if let Some(value) = self.preview_width {
            config.preview_width = value;
        }
        if let Some(value) = self.min_scale {
            config.min_scale = value;
        }
        if let Some(value) = self.max_scale {
            config.max_scale = value;
        }
        if let Some(value) = self.crop_quality {
            if !(0.0..=1.0).contains(&value) {
                return Err(ImageError::Validation(format!("crop_quality 必须在 [0, 1] 之间：{}", value)));
            }
            config.crop_quality = value;
        }

        config.validate()
    }
}

/// 读取设置文件；文件不存在时返回 `None`。
pub fn load_settings(path: &Path) -> Result<Option<PipelineSettings>, AppError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let parsed = serde_json::from_str::<PipelineSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;

    Ok(Some(parsed))
}

/// 以 pretty JSON 写入设置文件，必要时创建父目录。
pub fn save_settings(path: &Path, settings: &PipelineSettings) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::imageops::FilterType;

    #[test]
    fn missing_file_yields_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load_settings(&dir.path().join("absent.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");
        let settings = PipelineSettings {
            preview_width: Some(160),
            resize_filter: Some("lanczos3".to_string()),
            ..PipelineSettings::default()
        };

        save_settings(&path, &settings).expect("save");
        let loaded = load_settings(&path).expect("load");

        assert_eq!(loaded, Some(settings));
    }

    #[test]
    fn unset_fields_are_not_written() {
        let settings = PipelineSettings {
            max_scale: Some(4.0),
            ..PipelineSettings::default()
        };
        let json = serde_json::to_string(&settings).expect("serialize");
        assert_eq!(json, r#"{"maxScale":4.0}"#);
    }

    #[test]
    fn malformed_file_is_a_settings_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");

        assert!(matches!(load_settings(&path), Err(AppError::Settings(_))));
    }

    #[test]
    fn apply_overrides_only_present_fields() {
        let mut config = ImageConfig::default();
        let settings: PipelineSettings =
            serde_json::from_str(r#"{"viewportSize": 400, "resizeFilter": "nearest"}"#).expect("json");

        settings.apply_to(&mut config).expect("apply");

        assert_eq!(config.viewport_size, 400.0);
        assert_eq!(config.resize_filter, FilterType::Nearest);
        assert_eq!(config.preview_width, 120);
    }

    #[test]
    fn apply_rejects_unknown_filter_and_bad_quality() {
        let mut config = ImageConfig::default();
        let filter = PipelineSettings {
            resize_filter: Some("sharpest".to_string()),
            ..PipelineSettings::default()
        };
        assert!(matches!(filter.apply_to(&mut config), Err(ImageError::InvalidFormat(_))));

        let quality = PipelineSettings {
            crop_quality: Some(1.5),
            ..PipelineSettings::default()
        };
        assert!(matches!(quality.apply_to(&mut ImageConfig::default()), Err(ImageError::Validation(_))));
    }

    #[test]
    fn from_config_round_trips_through_apply() {
        let mut config = ImageConfig {
            preview_width: 200,
            ..ImageConfig::default()
        };
        let exported = PipelineSettings::from_config(&config);

        exported.apply_to(&mut config).expect("apply");
        assert_eq!(PipelineSettings::from_config(&config), exported);
    }
}
