//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! CLI 与宿主 UI 入口统一返回 `Result<T, AppError>`，
//! 宿主通过 `Serialize` 获得可直接展示的错误信息。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，满足 IPC 桥接要求。

use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（加载 / 解码 / 渲染 / 编码）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件读写或解析失败
    #[error("设置文件错误: {0}")]
    Settings(String),

    /// 命令行参数不合法
    #[error("命令行参数错误: {0}")]
    Cli(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_error_keeps_its_message() {
        let err: AppError = ImageError::Validation("输出宽度必须大于 0".to_string()).into();
        assert_eq!(err.to_string(), ImageError::Validation("输出宽度必须大于 0".to_string()).to_string());
    }

    #[test]
    fn serializes_as_plain_string() {
        let err = AppError::Cli("缺少输入文件".to_string());
        let json = serde_json::to_string(&err).expect("serialize");
        assert_eq!(json, "\"命令行参数错误: 缺少输入文件\"");
    }
}
