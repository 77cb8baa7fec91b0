//! 冻结快照定义

use crate::source::{ordinal_of, AsAny, PropertySource};
use crate::value::PropertyValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 快照值携带的元数据键：冻结时间
pub const FROZEN_AT_META: &str = "frozen_at";

/// 冻结快照
///
/// 属性源（或整个配置合并视图）在某一时刻的完整、不可变副本，
/// 用作变更比较的基线。创建后属性映射只能读取；相等性只比较序数和属性。
#[derive(Clone, Serialize, Deserialize)]
pub struct FrozenSnapshot {
    name: String,
    ordinal: i32,
    properties: BTreeMap<String, String>,
    frozen_at: DateTime<Utc>,
}

impl FrozenSnapshot {
    /// 冻结属性源
    ///
    /// 对已冻结的快照是幂等的：直接返回同一个实例。
    pub fn of(source: &Arc<dyn PropertySource>) -> Arc<FrozenSnapshot> {
        match AsAny::into_any_arc(Arc::clone(source)).downcast::<FrozenSnapshot>() {
            Ok(frozen) => frozen,
            Err(_) => Arc::new(Self::capture(&**source)),
        }
    }

    /// 复制属性源当前的全部属性
    pub fn capture(source: &dyn PropertySource) -> Self {
        let properties = source
            .properties()
            .into_values()
            .filter_map(|v| {
                let key = v.key().to_string();
                v.into_value().map(|value| (key, value))
            })
            .collect();
        Self::from_properties(source.name(), ordinal_of(source), properties)
    }

    /// 由现成的属性映射创建快照
    pub fn from_properties(
        name: impl Into<String>,
        ordinal: i32,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            ordinal,
            properties,
            frozen_at: Utc::now(),
        }
    }

    /// 快照名称
    pub fn snapshot_name(&self) -> &str {
        &self.name
    }

    /// 冻结时的序数
    pub fn snapshot_ordinal(&self) -> i32 {
        self.ordinal
    }

    /// 冻结时间
    pub fn frozen_at(&self) -> DateTime<Utc> {
        self.frozen_at
    }

    /// 只读的属性映射
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// 读取单个值
    pub fn value(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 是否包含指定键
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn to_property_value(&self, key: &str, value: &str) -> PropertyValue {
        PropertyValue::of(key, value, self.name.as_str())
            .with_metadata(FROZEN_AT_META, self.frozen_at.to_rfc3339())
    }
}

impl PropertySource for FrozenSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.properties
            .get(key)
            .map(|value| self.to_property_value(key, value))
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        self.properties
            .iter()
            .map(|(k, v)| (k.clone(), self.to_property_value(k, v)))
            .collect()
    }
}

impl PartialEq for FrozenSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal && self.properties == other.properties
    }
}

impl Eq for FrozenSnapshot {}

impl Hash for FrozenSnapshot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordinal.hash(state);
        self.properties.hash(state);
    }
}

impl fmt::Debug for FrozenSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrozenSnapshot")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("properties", &self.properties.len())
            .field("frozen_at", &self.frozen_at)
            .finish()
    }
}
