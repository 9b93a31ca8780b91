//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图片链路（加载 → 压缩 → 裁剪会话 → 编码）中的所有错误来源，
//! 避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 所有错误都只作用于单次操作/单个会话，不存在重试，也不会使宿主进程崩溃。

/// 图片处理统一错误类型。
///
/// 该类型会在宿主层被上转为 `AppError`，最终透传给前端展示。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// 源字节无法被解码为图片。对会话而言是致命错误，不产生任何输出。
    #[error("解码错误：{0}")]
    Decode(String),

    /// 无法获取渲染画布（尺寸溢出、内存上限或缓冲构建失败）。
    #[error("画布获取失败：{0}")]
    ContextAcquisition(String),

    /// 参数非法且没有安全默认值可回退（如零尺寸目标）。
    #[error("参数校验失败：{0}")]
    Validation(String),

    /// 输入格式错误（Data URL 结构、预设名称等）。
    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 会话当前状态不接受该操作（加载中、已提交、已取消）。
    #[error("会话状态错误：{0}")]
    InvalidState(String),
}
