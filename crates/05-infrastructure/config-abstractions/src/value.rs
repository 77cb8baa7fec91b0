//! 属性值定义

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 属性值
///
/// 由属性源产生后不可变；`value` 为 `None` 表示缺失而非错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    key: String,
    value: Option<String>,
    source: String,
    metadata: BTreeMap<String, String>,
}

impl PropertyValue {
    /// 创建属性值
    pub fn of(key: impl Into<String>, value: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            source: source.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// 创建表示缺失的属性值
    pub fn absent(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            source: source.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// 属性键
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 属性值，缺失时为 `None`
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// 产生该值的属性源名称
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 元数据
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// 读取单个元数据项
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// 是否包含实际值
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// 返回替换了值的新实例
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..self.clone()
        }
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 合并一组元数据
    pub fn with_all_metadata<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// 拆出原始字符串值
    pub fn into_value(self) -> Option<String> {
        self.value
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={} ({})", self.key, value, self.source),
            None => write!(f, "{}=<absent> ({})", self.key, self.source),
        }
    }
}
