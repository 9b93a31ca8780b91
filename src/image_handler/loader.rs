//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（内存字节 / Base64 / 本地文件）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 字节：签名校验。
//! - Base64：格式解析 + 解码前体积估算 + 解码后体积限制。
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 上传校验（拖拽/选择文件）：声明的 MIME 类型 + 体积 + 文件签名三层检查。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::source::{ImageSource, RawImageData};
use super::{ImageConfig, ImageError, ImageHandler};

impl ImageHandler {
    /// 按来源加载原始字节。
    pub(super) fn load_source(
        &self,
        source: ImageSource,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        match source {
            ImageSource::Bytes(bytes) => Self::load_from_bytes(bytes),
            ImageSource::Base64(data) => self.load_from_base64(&data, config),
            ImageSource::FilePath(path) => self.load_from_file(&path, config),
        }
    }

    fn load_from_bytes(bytes: Vec<u8>) -> Result<RawImageData, ImageError> {
        log::debug!("📦 使用内存图片字节 - {} bytes", bytes.len());
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "bytes",
        })
    }

    /// 从 Base64 字符串加载图片原始字节。
    pub(super) fn load_from_base64(
        &self,
        data: &str,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;

        if bytes.len() as u64 > config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 解码后体积过大：{}（限制：{}）",
                format_file_size(bytes.len() as u64),
                format_file_size(config.max_file_size)
            )));
        }
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "base64",
        })
    }

    /// 从本地路径加载图片原始字节。
    pub(super) fn load_from_file(
        &self,
        path: &str,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(ImageError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "文件过大：{}（限制：{}）",
                format_file_size(metadata.len()),
                format_file_size(config.max_file_size)
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 上传入口校验：模拟拖拽区对单个文件的检查。
    ///
    /// 1. 声明的 MIME 必须是 `image/*`
    /// 2. 体积不超过 `max_file_size`
    /// 3. 文件签名确实是图片
    pub fn validate_upload(&self, bytes: &[u8], declared_mime: &str) -> Result<(), ImageError> {
        let config = self.config_snapshot()?;

        if !declared_mime.trim().to_lowercase().starts_with("image/") {
            return Err(ImageError::Validation("请选择图片文件".to_string()));
        }

        if bytes.len() as u64 > config.max_file_size {
            return Err(ImageError::Validation(format!(
                "文件大小必须小于 {}",
                format_file_size(config.max_file_size)
            )));
        }

        Self::validate_image_signature(bytes)
    }

    pub(crate) fn parse_base64(data: &str) -> Result<Vec<u8>, ImageError> {
        Self::parse_base64_with_limit(data, u64::MAX)
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, ImageError> {
        let normalized = data.trim();

        let base64_data = if normalized.starts_with("data:") {
            if !normalized.starts_with("data:image/") {
                return Err(ImageError::InvalidFormat("Data URL 不是图片类型".to_string()));
            }
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| ImageError::InvalidFormat("缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;
        if estimated_len > max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{}（限制：{}）",
                format_file_size(estimated_len),
                format_file_size(max_file_size)
            )));
        }

        general_purpose::STANDARD
            .decode(base64_data)
            .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 文件签名校验。无法识别为图片的内容视为不可解码。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}

/// 将字节数格式化为人类可读体积，例如 `1.5 KB`、`5 MB`。
///
/// 最多保留两位小数，并去掉末尾多余的 0。
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let k = 1024_f64;
    let value = bytes as f64;
    let index = ((value.ln() / k.ln()).floor() as usize).min(UNITS.len() - 1);
    let scaled = value / k.powi(index as i32);

    let formatted = format!("{:.2}", scaled);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[index])
}
