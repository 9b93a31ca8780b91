//! # 解码与压缩流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 有界尺寸 → 重新编码”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低超大相机原图触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 读取 header 尺寸，按像素/内存上限快速拒绝
//! 2. 完整解码，并按 EXIF Orientation 摆正（相机竖拍照片的像素通常按横向存储）
//! 3. 计算统一缩放比例 `min(maxW / w, maxH / h)`，仅在超出边界时生效（从不放大）
//! 4. 使用 `fast_image_resize` 降采样，失败时回退 `image::resize_exact`
//! 5. 按请求格式与质量重新编码

use fast_image_resize as fr;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageDecoder, ImageReader, Rgba};
use std::io::Cursor;
use std::time::Instant;

use super::encoder::{EncodedImage, encode_rgba, normalize_quality};
use super::source::RawImageData;
use super::{CompressOptions, ImageConfig, ImageError, ImageHandler};

const DEFAULT_COMPRESS_QUALITY: f32 = 0.8;

impl ImageHandler {
    /// 将原始字节解码为图像，并在解码前后各做一次资源上限检查。
    pub(crate) fn decode_raw(raw: RawImageData, config: &ImageConfig) -> Result<DynamicImage, ImageError> {
        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;
        Self::validate_decoded_memory_limits(config, header_width, header_height)?;

        let mut decoder = Self::open_decoder(&raw.bytes)?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut decoded = DynamicImage::from_decoder(decoder)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;
        if orientation != Orientation::NoTransforms {
            log::debug!("🔄 按 EXIF 方向摆正：{:?}", orientation);
            decoded.apply_orientation(orientation);
        }

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::Decode("图片尺寸为 0".to_string()));
        }
        Self::validate_pixel_limits(config, width, height)?;
        Self::validate_decoded_memory_limits(config, width, height)?;

        log::info!(
            "✅ 图片解码成功 - 来源: {} 尺寸: {}x{}",
            raw.source_hint,
            width,
            height
        );

        Ok(decoded)
    }

    /// 压缩已解码图像：有界缩放 + 重新编码。
    pub(crate) fn compress_decoded(
        image: DynamicImage,
        options: &CompressOptions,
        config: &ImageConfig,
    ) -> Result<EncodedImage, ImageError> {
        let quality = normalize_quality(options.quality, DEFAULT_COMPRESS_QUALITY);
        let (width, height) = image.dimensions();
        let (target_width, target_height) =
            Self::bounded_dimensions(width, height, options.max_width, options.max_height)?;
        Self::ensure_canvas(target_width, target_height, config)?;

        let resize_start = Instant::now();
        let resized = if (target_width, target_height) == (width, height) {
            image
        } else {
            log::info!(
                "🧩 压缩降采样：{}x{} -> {}x{}（filter={:?}）",
                width,
                height,
                target_width,
                target_height,
                config.resize_filter
            );

            match Self::resize_with_fast_image_resize(&image, target_width, target_height, config.resize_filter) {
                Ok(resized) => resized,
                Err(err) => {
                    log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
                    image.resize_exact(target_width, target_height, config.resize_filter)
                }
            }
        };
        let resize_elapsed = resize_start.elapsed();

        let encode_start = Instant::now();
        let encoded = encode_rgba(&resized.to_rgba8(), options.format, quality)?;

        log::info!(
            "✅ 压缩完成 - {}x{} {} quality={} resize={}ms encode={}ms size={}B",
            target_width,
            target_height,
            options.format.mime_type(),
            quality,
            resize_elapsed.as_millis(),
            encode_start.elapsed().as_millis(),
            encoded.bytes().len()
        );

        Ok(encoded)
    }

    /// 计算压缩目标尺寸。
    ///
    /// 自然尺寸未超出边界时原样返回；否则按统一比例缩小，保持宽高比（误差 ±1px）。
    pub fn bounded_dimensions(
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    ) -> Result<(u32, u32), ImageError> {
        if max_width == 0 || max_height == 0 {
            return Err(ImageError::Validation(format!(
                "目标边界必须为正数：{}x{}",
                max_width, max_height
            )));
        }

        if width <= max_width && height <= max_height {
            return Ok((width, height));
        }

        let ratio = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
        let target_width = ((width as f64 * ratio).round() as u32).clamp(1, max_width);
        let target_height = ((height as f64 * ratio).round() as u32).clamp(1, max_height);

        Ok((target_width, target_height))
    }

    /// 检查能否分配指定尺寸的画布。
    pub(crate) fn ensure_canvas(width: u32, height: u32, config: &ImageConfig) -> Result<(), ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::ContextAcquisition(format!(
                "画布尺寸为 0：{}x{}",
                width, height
            )));
        }

        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::ContextAcquisition("画布像素数溢出".to_string()))?;

        if pixels > config.max_output_pixels {
            return Err(ImageError::ContextAcquisition(format!(
                "画布过大：{}x{}（限制：{} 像素）",
                width, height, config.max_output_pixels
            )));
        }

        Ok(())
    }

    /// 仅通过内存中的图片头信息读取宽高。
    ///
    /// 返回按 EXIF 方向摆正后的尺寸，与 `decode_raw` 的结果一致。
    /// 用于在完整解码前做像素限制检查。
    pub(crate) fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
        let mut decoder = Self::open_decoder(bytes)?;
        let (width, height) = decoder.dimensions();

        match decoder.orientation().unwrap_or(Orientation::NoTransforms) {
            Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH => Ok((height, width)),
            _ => Ok((width, height)),
        }
    }

    fn open_decoder(bytes: &[u8]) -> Result<impl ImageDecoder + '_, ImageError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?
            .into_decoder()
            .map_err(|e| ImageError::Decode(format!("无法读取图片头：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > config.max_decoded_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: image::imageops::FilterType,
    ) -> Result<DynamicImage, ImageError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ImageError::ContextAcquisition(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(
            Self::to_fast_filter(filter),
        ));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::ContextAcquisition(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| ImageError::ContextAcquisition("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
        match filter {
            image::imageops::FilterType::Nearest => fr::FilterType::Box,
            image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
            image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
            image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
            image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}
