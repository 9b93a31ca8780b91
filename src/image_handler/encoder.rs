//! # 编码模块
//!
//! ## 设计思路
//!
//! 流水线最终产物 `EncodedImage` 是“格式 + 字节”的自描述对象：
//! 可直接转为 `data:image/...;base64,...` 字符串交给宿主 UI 作为图片源，
//! 也可作为不透明文本字段交给持久化协作方。产物所有权在返回时转移给调用方。
//!
//! ## 实现思路
//!
//! - JPEG：先将 RGBA 合成到黑底（与画布导出 JPEG 时透明像素变黑的行为一致），再按质量编码。
//! - PNG / WebP：无损编码，忽略 quality。
//! - quality 超出 [0, 1] 时夹取而非报错，NaN 回退默认值。

use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use serde::Serialize;

use super::{ImageError, ImageHandler, OutputFormat};

/// 编码后的图片。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    format: OutputFormat,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// 输出为 Data URL，可直接作为 `<img src>` 或存入文本字段。
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// 从 Data URL 还原（格式取自 MIME 段）。
    pub fn from_data_url(data_url: &str) -> Result<Self, ImageError> {
        let normalized = data_url.trim();
        let mime = normalized
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .ok_or_else(|| ImageError::InvalidFormat("不是 Data URL".to_string()))?;
        let format = OutputFormat::from_str(mime)?;
        let bytes = ImageHandler::parse_base64(normalized)?;

        Ok(Self { format, bytes })
    }

    /// 重新解码为像素，供调用方或测试比对使用。
    pub fn decode(&self) -> Result<RgbaImage, ImageError> {
        image::load_from_memory(&self.bytes)
            .map(|img| img.into_rgba8())
            .map_err(|e| ImageError::Decode(format!("编码产物解码失败：{}", e)))
    }
}

impl Serialize for EncodedImage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_data_url())
    }
}

/// 将 quality 规范到 [0, 1]。
pub(crate) fn normalize_quality(quality: f32, fallback: f32) -> f32 {
    if quality.is_nan() {
        log::warn!("⚠️ quality 为 NaN，回退默认值 {}", fallback);
        return fallback;
    }
    let clamped = quality.clamp(0.0, 1.0);
    if clamped != quality {
        log::warn!("⚠️ quality {} 超出 [0, 1]，已夹取为 {}", quality, clamped);
    }
    clamped
}

/// 0~1 的质量映射到 JPEG 编码器的 1~100。
fn jpeg_quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// 将 RGBA 合成到黑底。
fn flatten_on_black(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// 按格式与质量编码 RGBA 画布。
pub(crate) fn encode_rgba(
    rgba: &RgbaImage,
    format: OutputFormat,
    quality: f32,
) -> Result<EncodedImage, ImageError> {
    let (width, height) = rgba.dimensions();
    let mut bytes = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            let rgb = flatten_on_black(rgba);
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality_percent(quality));
            encoder
                .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(|e| ImageError::ContextAcquisition(format!("JPEG 编码失败：{}", e)))?;
        }
        OutputFormat::Png => {
            log::debug!("PNG 为无损格式，忽略 quality={}", quality);
            PngEncoder::new(&mut bytes)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| ImageError::ContextAcquisition(format!("PNG 编码失败：{}", e)))?;
        }
        OutputFormat::Webp => {
            log::debug!("WebP 使用无损编码，忽略 quality={}", quality);
            WebPEncoder::new_lossless(&mut bytes)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| ImageError::ContextAcquisition(format!("WebP 编码失败：{}", e)))?;
        }
    }

    Ok(EncodedImage { format, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x * 8) as u8, (y * 8) as u8, 128, 255])
        })
    }

    #[test]
    fn normalize_quality_clamps_and_handles_nan() {
        assert_eq!(normalize_quality(1.7, 0.8), 1.0);
        assert_eq!(normalize_quality(-0.2, 0.8), 0.0);
        assert_eq!(normalize_quality(f32::NAN, 0.8), 0.8);
        assert_eq!(normalize_quality(0.5, 0.8), 0.5);
    }

    #[test]
    fn jpeg_quality_percent_never_reaches_zero() {
        assert_eq!(jpeg_quality_percent(0.0), 1);
        assert_eq!(jpeg_quality_percent(0.9), 90);
        assert_eq!(jpeg_quality_percent(1.0), 100);
    }

    #[test]
    fn flatten_on_black_turns_transparent_pixels_black() {
        let mut rgba = RgbaImage::from_pixel(2, 1, image::Rgba([200, 100, 50, 255]));
        rgba.put_pixel(1, 0, image::Rgba([200, 100, 50, 0]));

        let rgb = flatten_on_black(&rgba);

        assert_eq!(rgb.get_pixel(0, 0).0, [200, 100, 50]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn png_data_url_round_trips_losslessly() {
        let rgba = gradient(16, 8);
        let encoded = encode_rgba(&rgba, OutputFormat::Png, 0.3).expect("png encode");

        let data_url = encoded.to_data_url();
        assert!(data_url.starts_with("data:image/png;base64,"));

        let restored = EncodedImage::from_data_url(&data_url).expect("parse data url");
        assert_eq!(restored, encoded);
        assert_eq!(restored.decode().expect("decode"), rgba);
    }

    #[test]
    fn jpeg_output_keeps_dimensions_and_mime() {
        let encoded = encode_rgba(&gradient(20, 10), OutputFormat::Jpeg, 0.9).expect("jpeg encode");

        assert_eq!(encoded.mime_type(), "image/jpeg");
        let decoded = encoded.decode().expect("decode");
        assert_eq!(decoded.dimensions(), (20, 10));
    }

    #[test]
    fn webp_output_is_lossless() {
        let rgba = gradient(8, 8);
        let encoded = encode_rgba(&rgba, OutputFormat::Webp, 0.1).expect("webp encode");

        assert_eq!(encoded.decode().expect("decode"), rgba);
    }

    #[test]
    fn serializes_as_data_url_string() {
        let encoded = encode_rgba(&gradient(2, 2), OutputFormat::Png, 1.0).expect("png encode");
        let json = serde_json::to_string(&encoded).expect("serialize");

        assert_eq!(json, format!("\"{}\"", encoded.to_data_url()));
    }
}
