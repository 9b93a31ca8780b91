//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“图片来源识别 → 加载校验 → 解码 → 有界缩放 → 重新编码”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `handler`：编排整条处理流水线，并为裁剪会话提供解码
//! - `loader`：负责字节/Base64/文件加载与上传校验
//! - `pipeline`：负责解码、像素限制、有界缩放
//! - `encoder`：负责 JPEG/PNG/WebP 编码与 data URL
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型，内部细节保持 `mod` 私有。
//!
//! ## 新同事快速上手
//!
//! ```text
//! CLI / 宿主 UI
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 类型/体积校验）
//!    ├─ pipeline.rs（解码 + 像素限制 + 有界缩放）
//!    └─ encoder.rs（编码 + data URL）
//!    ↓
//! EncodedImage / CropSession
//! ```
//!
//! ## 分层职责建议
//!
//! - 配置与策略变更优先改 `config.rs`
//! - 业务流程顺序变更优先改 `handler.rs`
//! - 单阶段行为优化分别改 `loader/pipeline/encoder`

mod config;
mod encoder;
mod error;
mod handler;
mod loader;
mod pipeline;
mod source;

pub use config::{
    CompressOptions, ImageConfig, ImagePreset, OutputFormat, parse_resize_filter, resize_filter_name,
};
pub use encoder::EncodedImage;
pub use error::ImageError;
pub use handler::ImageHandler;
pub use loader::format_file_size;
pub use source::{ImageSource, SourceImage};

pub(crate) use encoder::encode_rgba;
