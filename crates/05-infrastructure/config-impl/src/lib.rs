//! # Configuration Implementation
//!
//! 分层配置解析引擎的具体实现。
//!
//! ## 主要组件
//!
//! - [`ConfigurationContext`] / [`ConfigurationContextBuilder`] - 属性源、过滤器与转换器的不可变组合
//! - [`Configuration`] - 按序数合并、过滤并转换属性的只读门面
//! - [`ConverterRegistry`] - 类型转换器注册表
//! - [`ThreadFilterContext`] - 线程级过滤器
//! - [`ChangeSetBuilder`] / [`diff`] - 变更集计算
//! - [`ConfigEventManager`] - 配置事件分发
//! - [`DefaultContextChangeListener`] - 属性源变更后重建并发布上下文
//! - [`ConfigurationProvider`] / [`ContextHolder`] - 当前上下文的原子发布
//! - [`sources`] - 内置属性源（内存、动态、环境变量、TOML）

pub mod change;
pub mod configuration;
pub mod context;
pub mod context_listener;
pub mod converters;
pub mod event_manager;
pub mod filter;
pub mod functions;
pub mod merge;
pub mod provider;
pub mod settings;
pub mod sources;


pub use change::*;
pub use configuration::*;
pub use context::*;
pub use context_listener::*;
pub use converters::*;
pub use event_manager::*;
pub use filter::*;
pub use provider::*;
pub use settings::*;
