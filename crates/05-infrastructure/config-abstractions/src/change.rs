//! 变更集定义

use crate::snapshot::FrozenSnapshot;
use chrono::{DateTime, Utc};
use config_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// 新增：旧值缺失，新值存在
    Added,
    /// 更新：新旧值均存在且不同
    Updated,
    /// 删除：旧值存在，新值缺失
    Removed,
}

/// 单个键的变更条目
///
/// 新旧值同时缺失是非法的，构造时即拒绝。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChangeEntry")]
pub struct ChangeEntry {
    old_value: Option<String>,
    new_value: Option<String>,
}

#[derive(Deserialize)]
struct RawChangeEntry {
    old_value: Option<String>,
    new_value: Option<String>,
}

impl TryFrom<RawChangeEntry> for ChangeEntry {
    type Error = ConfigError;

    fn try_from(raw: RawChangeEntry) -> Result<Self, Self::Error> {
        ChangeEntry::new("<deserialized>", raw.old_value, raw.new_value)
    }
}

impl ChangeEntry {
    /// 创建变更条目
    pub fn new(
        key: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> ConfigResult<Self> {
        if old_value.is_none() && new_value.is_none() {
            return Err(ConfigError::InvalidChangeEntry {
                key: key.to_string(),
            });
        }
        Ok(Self {
            old_value,
            new_value,
        })
    }

    /// 新增条目
    pub fn added(new_value: impl Into<String>) -> Self {
        Self {
            old_value: None,
            new_value: Some(new_value.into()),
        }
    }

    /// 更新条目
    pub fn updated(old_value: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            old_value: Some(old_value.into()),
            new_value: Some(new_value.into()),
        }
    }

    /// 删除条目
    pub fn removed(old_value: impl Into<String>) -> Self {
        Self {
            old_value: Some(old_value.into()),
            new_value: None,
        }
    }

    /// 旧值
    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    /// 新值
    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    /// 变更类型
    pub fn kind(&self) -> ChangeKind {
        match (&self.old_value, &self.new_value) {
            (None, _) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            (Some(_), Some(_)) => ChangeKind::Updated,
        }
    }
}

/// 变更所针对的资源类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// 单个属性源
    PropertySource,
    /// 整个配置的合并视图
    Configuration,
    /// 其他资源
    Custom(String),
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PropertySource => write!(f, "property-source"),
            Self::Configuration => write!(f, "configuration"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// 变更集
///
/// 由变更引擎产生，不可变且可序列化。序列化时不包含基线快照，
/// 反序列化后 [`ChangeSet::resource`] 为 `None`。
#[derive(Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    resource_type: ResourceType,
    #[serde(skip)]
    resource: Option<Arc<FrozenSnapshot>>,
    version: String,
    timestamp: DateTime<Utc>,
    entries: BTreeMap<String, ChangeEntry>,
}

impl ChangeSet {
    /// 创建变更集
    pub fn new(
        resource_type: ResourceType,
        resource: Option<Arc<FrozenSnapshot>>,
        version: impl Into<String>,
        timestamp: DateTime<Utc>,
        entries: BTreeMap<String, ChangeEntry>,
    ) -> Self {
        Self {
            resource_type,
            resource,
            version: version.into(),
            timestamp,
            entries,
        }
    }

    /// 基于快照的空变更集
    pub fn empty(resource_type: ResourceType, resource: Arc<FrozenSnapshot>) -> Self {
        Self::new(
            resource_type,
            Some(resource),
            uuid::Uuid::new_v4().to_string(),
            Utc::now(),
            BTreeMap::new(),
        )
    }

    /// 资源类型
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// 基线快照，反序列化后为 `None`
    pub fn resource(&self) -> Option<&Arc<FrozenSnapshot>> {
        self.resource.as_ref()
    }

    /// 唯一版本标识
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 创建时间
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 全部变更条目（按键排序）
    pub fn entries(&self) -> &BTreeMap<String, ChangeEntry> {
        &self.entries
    }

    /// 单个键的变更
    pub fn entry(&self, key: &str) -> Option<&ChangeEntry> {
        self.entries.get(key)
    }

    /// 指定类型的变更键
    pub fn keys_of(&self, kind: ChangeKind) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(move |(_, e)| e.kind() == kind)
            .map(|(k, _)| k.as_str())
    }

    /// 键是否被新增
    pub fn is_added(&self, key: &str) -> bool {
        self.entry(key).map_or(false, |e| e.kind() == ChangeKind::Added)
    }

    /// 键是否被删除
    pub fn is_removed(&self, key: &str) -> bool {
        self.entry(key).map_or(false, |e| e.kind() == ChangeKind::Removed)
    }

    /// 键是否被更新
    pub fn is_updated(&self, key: &str) -> bool {
        self.entry(key).map_or(false, |e| e.kind() == ChangeKind::Updated)
    }

    /// 键被新增或更新（纯删除不算）
    pub fn is_key_affected(&self, key: &str) -> bool {
        self.entry(key).map_or(false, |e| e.new_value().is_some())
    }

    /// 新增条目数量
    pub fn added_count(&self) -> usize {
        self.keys_of(ChangeKind::Added).count()
    }

    /// 删除条目数量
    pub fn removed_count(&self) -> usize {
        self.keys_of(ChangeKind::Removed).count()
    }

    /// 更新条目数量
    pub fn updated_count(&self) -> usize {
        self.keys_of(ChangeKind::Updated).count()
    }

    /// 条目总数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何变更
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSet")
            .field("resource_type", &self.resource_type)
            .field("resource", &self.resource.as_ref().map(|r| r.snapshot_name()))
            .field("version", &self.version)
            .field("timestamp", &self.timestamp)
            .field("entries", &self.entries)
            .finish()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot_id = self
            .resource
            .as_ref()
            .map_or("<detached>", |r| r.snapshot_name());
        write!(
            f,
            "ChangeSet{{type={}, change-id={}, snapshot-id={}, timestamp={}, entries={}}}",
            self.resource_type,
            self.version,
            snapshot_id,
            self.timestamp.to_rfc3339(),
            self.entries.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChangeSet {
        let mut entries = BTreeMap::new();
        entries.insert("added".to_string(), ChangeEntry::added("1"));
        entries.insert("updated".to_string(), ChangeEntry::updated("1", "2"));
        entries.insert("removed".to_string(), ChangeEntry::removed("1"));
        ChangeSet::new(ResourceType::Configuration, None, "v1", Utc::now(), entries)
    }

    #[test]
    fn test_entry_rejects_double_absence() {
        assert!(ChangeEntry::new("k", None, None).is_err());
        assert_eq!(
            ChangeEntry::new("k", None, Some("v".into())).unwrap().kind(),
            ChangeKind::Added
        );
    }

    #[test]
    fn test_classification_queries() {
        let change = sample();
        assert!(change.is_added("added"));
        assert!(change.is_updated("updated"));
        assert!(change.is_removed("removed"));
        assert!(change.is_key_affected("added"));
        assert!(change.is_key_affected("updated"));
        assert!(!change.is_key_affected("removed"));
        assert!(!change.is_key_affected("unknown"));
        assert_eq!(
            (change.added_count(), change.updated_count(), change.removed_count()),
            (1, 1, 1)
        );
    }

    #[test]
    fn test_display_hides_keys() {
        let text = sample().to_string();
        assert!(text.contains("change-id=v1"));
        assert!(text.contains("snapshot-id=<detached>"));
        assert!(text.contains("timestamp"));
        assert!(!text.contains("updated"));
    }

    #[test]
    fn test_serialization_drops_resource() {
        let snapshot = Arc::new(FrozenSnapshot::from_properties("s", 0, BTreeMap::new()));
        let change = ChangeSet::empty(ResourceType::PropertySource, snapshot);
        assert!(change.resource().is_some());
        let json = serde_json::to_string(&change).unwrap();
        let restored: ChangeSet = serde_json::from_str(&json).unwrap();
        assert!(restored.resource().is_none());
        assert_eq!(restored.version(), change.version());
        assert!(restored.is_empty());
    }

    #[test]
    fn test_deserializing_invalid_entry_fails() {
        let json = r#"{"old_value":null,"new_value":null}"#;
        assert!(serde_json::from_str::<ChangeEntry>(json).is_err());
    }
}
