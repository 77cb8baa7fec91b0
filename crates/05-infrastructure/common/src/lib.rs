//! # Config Common
//!
//! 这个 crate 提供了 Strata 分层配置引擎的公共错误类型和工具。
//!
//! ## 核心组件
//!
//! - [`ConfigError`] - 配置错误分类
//! - [`ConfigSection`] - 配置节与类型化绑定

pub mod configuration;
pub mod errors;

pub use configuration::*;
pub use errors::*;
