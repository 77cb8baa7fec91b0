//! # Configuration Abstractions
//!
//! 分层配置的抽象层，定义配置解析的数据模型和核心接口。
//!
//! ## 核心接口
//!
//! - [`PropertySource`] - 属性源接口（名称 + 序数 + 键值）
//! - [`PropertyFilter`] - 属性过滤器接口
//! - [`PropertyConverter`] - 属性类型转换器接口
//! - [`ConfigEventListener`] - 配置事件监听接口
//!
//! ## 数据模型
//!
//! - [`PropertyValue`] - 携带来源与元数据的属性值
//! - [`FrozenSnapshot`] - 不可变的属性快照
//! - [`ChangeSet`] - 两个快照之间的分类变更集
//! - [`ContextChange`] - 属性源级别的变更

pub mod change;
pub mod converter;
pub mod events;
pub mod filter;
pub mod snapshot;
pub mod source;
pub mod value;

pub use change::*;
pub use converter::*;
pub use events::*;
pub use filter::*;
pub use snapshot::*;
pub use source::*;
pub use value::*;
