//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `SourceImage` 表示已解码、不可变的 RGBA 源图，由单个裁剪会话独占

use image::{DynamicImage, RgbaImage, imageops};

/// 图片输入来源。
pub enum ImageSource {
    /// 内存中的原始文件字节（拖拽/选择文件后读入）。
    Bytes(Vec<u8>),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(String),
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 解码后的源图。
///
/// 加载后不可变；宽高即图片的自然尺寸（已按 EXIF 方向校正）。
/// 内部额外保存一份四周带 1px 透明边的像素，供双线性重采样在边缘处平滑过渡到透明。
#[derive(Debug, Clone)]
pub struct SourceImage {
    padded: RgbaImage,
}

impl SourceImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        let mut padded = RgbaImage::new(pixels.width() + 2, pixels.height() + 2);
        imageops::replace(&mut padded, &pixels, 1, 1);
        Self { padded }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::from_rgba(image.into_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.padded.width() - 2
    }

    pub fn height(&self) -> u32 {
        self.padded.height() - 2
    }

    /// 自然宽高比（宽 / 高）。
    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height().max(1) as f64
    }

    /// 复制出不含透明边的源图像素。
    pub fn to_rgba(&self) -> RgbaImage {
        imageops::crop_imm(&self.padded, 1, 1, self.width(), self.height()).to_image()
    }

    /// 带 1px 透明边的像素，源图像素 `(x, y)` 位于 `(x + 1, y + 1)`。
    pub(crate) fn padded_pixels(&self) -> &RgbaImage {
        &self.padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn padding_is_transparent_and_invisible_to_callers() {
        let pixels = RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]));
        let source = SourceImage::from_rgba(pixels.clone());

        assert_eq!((source.width(), source.height()), (3, 2));
        assert_eq!(source.to_rgba(), pixels);
        assert_eq!(source.padded_pixels().get_pixel(0, 0)[3], 0);
        assert_eq!(source.padded_pixels().get_pixel(4, 3)[3], 0);
        assert_eq!(*source.padded_pixels().get_pixel(1, 1), Rgba([9, 8, 7, 255]));
    }
}
