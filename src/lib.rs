//! # 头像 / 横幅图片处理 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            宿主（个人资料页 UI / CLI）                    │
//! │                                                          │
//! │  拖拽上传 ── 压缩 ── 裁剪弹窗（缩放 / 旋转 / 拖拽）       │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ settings ─── 设置文件 (JSON) → ImageConfig            │
//! │  │                                                       │
//! │  ├─ image_handler      加载·校验·解码·有界压缩·编码       │
//! │  │                                                       │
//! │  └─ cropper            变换·渲染·预览同步·会话状态机      │
//! │      ├─ transform      缩放/旋转/平移 + 自动适配          │
//! │      ├─ render         视口 / 预览 / 输出共用渲染         │
//! │      └─ session        Loading → Ready ⇄ Adjusting → 终态 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有入口的返回类型 |
//! | [`settings`] | 设置文件读写，覆盖 `ImageConfig` |
//! | [`image_handler`] | 从字节/Base64/文件加载图片，压缩为有界尺寸并重新编码 |
//! | [`cropper`] | 交互裁剪会话：变换状态、实时预览与像素一致的最终输出 |

pub mod cropper;
pub mod error;
pub mod image_handler;
pub mod settings;
