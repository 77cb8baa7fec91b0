//! 内存映射属性源

use config_abstractions::{PropertySource, PropertyValue};
use std::collections::{BTreeMap, HashMap};

/// 不可变的内存属性源
#[derive(Debug, Clone)]
pub struct MapPropertySource {
    name: String,
    ordinal: i32,
    scannable: bool,
    values: HashMap<String, String>,
    metadata: BTreeMap<String, String>,
}

impl MapPropertySource {
    /// 创建内存属性源
    pub fn new<I, K, V>(name: impl Into<String>, ordinal: i32, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            ordinal,
            scannable: true,
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            metadata: BTreeMap::new(),
        }
    }

    /// 设置是否可扫描
    pub fn with_scannable(mut self, scannable: bool) -> Self {
        self.scannable = scannable;
        self
    }

    /// 为所有值附加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn to_property_value(&self, key: &str, value: &str) -> PropertyValue {
        PropertyValue::of(key, value, self.name.as_str()).with_all_metadata(
            self.metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn is_scannable(&self) -> bool {
        self.scannable
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.values
            .get(key)
            .map(|value| self.to_property_value(key, value))
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), self.to_property_value(k, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_carry_source_and_metadata() {
        let source = MapPropertySource::new("defaults", 5, [("a", "1")]).with_metadata("origin", "test");
        let value = source.get("a").unwrap();
        assert_eq!(value.source(), "defaults");
        assert_eq!(value.meta("origin"), Some("test"));
        assert_eq!(source.properties()["a"], value);
        assert!(source.get("b").is_none());
        assert_eq!(source.len(), 1);
    }
}
