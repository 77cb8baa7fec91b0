//! 配置事件定义

use crate::change::ChangeSet;
use crate::source::PropertySource;
use chrono::{DateTime, Utc};
use config_common::ConfigResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// 属性源级别的变更
///
/// 描述配置上下文中哪些属性源被新增、删除或替换。
#[derive(Debug, Clone)]
pub struct ContextChange {
    version: String,
    timestamp: DateTime<Utc>,
    added: Vec<Arc<dyn PropertySource>>,
    removed: Vec<Arc<dyn PropertySource>>,
    updated: Vec<Arc<dyn PropertySource>>,
}

impl ContextChange {
    /// 创建构建器
    pub fn builder() -> ContextChangeBuilder {
        ContextChangeBuilder::default()
    }

    /// 唯一版本标识
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 创建时间
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 新增的属性源
    pub fn added_sources(&self) -> &[Arc<dyn PropertySource>] {
        &self.added
    }

    /// 删除的属性源
    pub fn removed_sources(&self) -> &[Arc<dyn PropertySource>] {
        &self.removed
    }

    /// 替换后的属性源
    pub fn updated_sources(&self) -> &[Arc<dyn PropertySource>] {
        &self.updated
    }

    /// 属性源（按名称）是否受此变更影响
    pub fn is_affected(&self, source: &dyn PropertySource) -> bool {
        self.affected_names().contains(source.name())
    }

    /// 所有受影响的属性源名称
    pub fn affected_names(&self) -> HashSet<&str> {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.updated)
            .map(|s| s.name())
            .collect()
    }

    /// 需要从现有上下文中移除的属性源名称（删除与替换）
    pub fn stale_names(&self) -> HashSet<&str> {
        self.removed
            .iter()
            .chain(&self.updated)
            .map(|s| s.name())
            .collect()
    }

    /// 是否没有任何变更
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// 属性源变更构建器
#[derive(Debug, Default)]
pub struct ContextChangeBuilder {
    version: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    added: Vec<Arc<dyn PropertySource>>,
    removed: Vec<Arc<dyn PropertySource>>,
    updated: Vec<Arc<dyn PropertySource>>,
}

impl ContextChangeBuilder {
    /// 记录新增的属性源
    pub fn added(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.added.push(source);
        self
    }

    /// 记录删除的属性源
    pub fn removed(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.removed.push(source);
        self
    }

    /// 记录替换后的属性源，同名旧属性源会被移除
    pub fn updated(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.updated.push(source);
        self
    }

    /// 指定版本
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 指定时间
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// 构建变更
    pub fn build(self) -> ContextChange {
        ContextChange {
            version: self
                .version
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            added: self.added,
            removed: self.removed,
            updated: self.updated,
        }
    }
}

/// 配置事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigEventType {
    /// 属性值变更
    Change,
    /// 属性源集合变更
    ContextChanged,
    /// 当前配置上下文已被替换
    ContextReplaced,
}

/// 配置事件
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// 属性值变更集
    Change(Arc<ChangeSet>),
    /// 属性源集合变更
    ContextChanged(Arc<ContextChange>),
    /// 新的配置上下文已发布
    ContextReplaced {
        /// 触发替换的变更版本
        version: String,
        /// 发布时间
        timestamp: DateTime<Utc>,
    },
}

impl ConfigEvent {
    /// 事件类型
    pub fn event_type(&self) -> ConfigEventType {
        match self {
            Self::Change(_) => ConfigEventType::Change,
            Self::ContextChanged(_) => ConfigEventType::ContextChanged,
            Self::ContextReplaced { .. } => ConfigEventType::ContextReplaced,
        }
    }

    /// 事件版本
    pub fn version(&self) -> &str {
        match self {
            Self::Change(change) => change.version(),
            Self::ContextChanged(change) => change.version(),
            Self::ContextReplaced { version, .. } => version,
        }
    }

    /// 事件时间
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Change(change) => change.timestamp(),
            Self::ContextChanged(change) => change.timestamp(),
            Self::ContextReplaced { timestamp, .. } => *timestamp,
        }
    }
}

impl From<ChangeSet> for ConfigEvent {
    fn from(change: ChangeSet) -> Self {
        Self::Change(Arc::new(change))
    }
}

impl From<ContextChange> for ConfigEvent {
    fn from(change: ContextChange) -> Self {
        Self::ContextChanged(Arc::new(change))
    }
}

/// 配置事件监听器 trait
pub trait ConfigEventListener: Send + Sync {
    /// 处理配置事件
    ///
    /// 返回的错误只会被记录和汇报，不会影响其他监听器。
    fn on_config_event(&self, event: &ConfigEvent) -> ConfigResult<()>;

    /// 获取监听器名称
    fn name(&self) -> &str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }

    /// 感兴趣的事件类型，空表示全部
    fn interested_event_types(&self) -> Vec<ConfigEventType> {
        Vec::new()
    }
}

/// 基于闭包的监听器
pub struct FnListener<F> {
    name: String,
    func: F,
}

impl<F> FnListener<F>
where
    F: Fn(&ConfigEvent) -> ConfigResult<()> + Send + Sync,
{
    /// 创建命名的闭包监听器
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ConfigEventListener for FnListener<F>
where
    F: Fn(&ConfigEvent) -> ConfigResult<()> + Send + Sync,
{
    fn on_config_event(&self, event: &ConfigEvent) -> ConfigResult<()> {
        (self.func)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener").field("name", &self.name).finish()
    }
}
