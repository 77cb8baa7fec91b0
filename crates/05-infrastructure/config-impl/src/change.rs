//! 变更集计算

use chrono::{DateTime, Utc};
use config_abstractions::{ChangeEntry, ChangeSet, FrozenSnapshot, ResourceType};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// 比较两个属性源快照
///
/// 对两侧键的并集逐一分类：仅新快照有为新增，仅旧快照有为删除，两侧都有且不同为更新，
/// 相同的键不产生条目。基线为旧快照。
pub fn diff(old: &Arc<FrozenSnapshot>, new: &FrozenSnapshot) -> ChangeSet {
    ChangeSetBuilder::of(Arc::clone(old)).compare_with(new).build()
}

/// 比较两个整体配置快照
pub fn diff_configuration(old: &Arc<FrozenSnapshot>, new: &FrozenSnapshot) -> ChangeSet {
    ChangeSetBuilder::of_configuration(Arc::clone(old))
        .compare_with(new)
        .build()
}

/// 变更集构建器
#[derive(Debug, Clone)]
pub struct ChangeSetBuilder {
    resource_type: ResourceType,
    base: Option<Arc<FrozenSnapshot>>,
    version: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    entries: BTreeMap<String, ChangeEntry>,
}

impl ChangeSetBuilder {
    /// 不带基线的构建器，变更需要显式声明
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            base: None,
            version: None,
            timestamp: None,
            entries: BTreeMap::new(),
        }
    }

    /// 以属性源快照为基线
    pub fn of(base: Arc<FrozenSnapshot>) -> Self {
        Self::with_base(ResourceType::PropertySource, base)
    }

    /// 以整体配置快照为基线
    pub fn of_configuration(base: Arc<FrozenSnapshot>) -> Self {
        Self::with_base(ResourceType::Configuration, base)
    }

    /// 指定资源类型和基线
    pub fn with_base(resource_type: ResourceType, base: Arc<FrozenSnapshot>) -> Self {
        Self {
            base: Some(base),
            ..Self::new(resource_type)
        }
    }

    fn base_value(&self, key: &str) -> Option<String> {
        self.base
            .as_ref()
            .and_then(|base| base.value(key))
            .map(str::to_string)
    }

    fn record(&mut self, key: &str, old: Option<String>, new: Option<String>) {
        if old == new {
            self.entries.remove(key);
            return;
        }
        let entry = match (old, new) {
            (None, Some(new)) => ChangeEntry::added(new),
            (Some(old), Some(new)) => ChangeEntry::updated(old, new),
            (Some(old), None) => ChangeEntry::removed(old),
            (None, None) => return,
        };
        self.entries.insert(key.to_string(), entry);
    }

    /// 相对基线设置键的新值；与基线相同则不产生条目
    pub fn add_change(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let old = self.base_value(&key);
        self.record(&key, old, Some(value.into()));
        self
    }

    /// 批量设置新值
    pub fn put_all<I, K, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        values
            .into_iter()
            .fold(self, |builder, (key, value)| builder.add_change(key, value))
    }

    /// 相对基线删除键；基线中不存在的键被忽略
    pub fn remove_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            match self.base_value(key) {
                Some(old) => self.record(key, Some(old), None),
                None => debug!("忽略删除基线中不存在的键: {}", key),
            }
        }
        self
    }

    /// 将基线与另一个快照的差异并入
    pub fn compare_with(mut self, other: &FrozenSnapshot) -> Self {
        let base_keys: BTreeSet<String> = self
            .base
            .as_ref()
            .map(|base| base.entries().keys().cloned().collect())
            .unwrap_or_default();
        let keys: BTreeSet<String> = base_keys
            .into_iter()
            .chain(other.entries().keys().cloned())
            .collect();
        for key in keys {
            let old = self.base_value(&key);
            let new = other.value(&key).map(str::to_string);
            self.record(&key, old, new);
        }
        self
    }

    /// 显式声明新增
    pub fn added(mut self, key: impl Into<String>, new_value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), ChangeEntry::added(new_value));
        self
    }

    /// 显式声明更新
    pub fn updated(
        mut self,
        key: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        self.entries.insert(key.into(), ChangeEntry::updated(old_value, new_value));
        self
    }

    /// 显式声明删除
    pub fn removed(mut self, key: impl Into<String>, old_value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), ChangeEntry::removed(old_value));
        self
    }

    /// 指定版本，默认随机生成
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 指定时间，默认为构建时刻
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// 当前条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否还没有条目
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 构建变更集
    pub fn build(self) -> ChangeSet {
        ChangeSet::new(
            self.resource_type,
            self.base,
            self.version
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            self.timestamp.unwrap_or_else(Utc::now),
            self.entries,
        )
    }
}
