//! 可变的内存属性源

use config_abstractions::{PropertySource, PropertyValue};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

/// 线程安全的可变属性源
///
/// 值和序数都可以在两次读取之间变化，用于模拟远程存储等动态后端。
#[derive(Debug)]
pub struct DynamicPropertySource {
    name: String,
    ordinal: AtomicI32,
    values: RwLock<HashMap<String, String>>,
}

impl DynamicPropertySource {
    /// 创建空的动态属性源
    pub fn new(name: impl Into<String>, ordinal: i32) -> Self {
        Self {
            name: name.into(),
            ordinal: AtomicI32::new(ordinal),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// 设置属性，返回旧值
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.write().insert(key.into(), value.into())
    }

    /// 删除属性，返回旧值
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// 整体替换全部属性
    pub fn replace_all<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        *self.values.write() = values;
    }

    /// 修改序数
    pub fn set_ordinal(&self, ordinal: i32) {
        self.ordinal.store(ordinal, Ordering::SeqCst);
    }
}

impl PropertySource for DynamicPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal.load(Ordering::SeqCst)
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.values
            .read()
            .get(key)
            .map(|value| PropertyValue::of(key, value.as_str(), self.name.as_str()))
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        self.values
            .read()
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    PropertyValue::of(k.as_str(), v.as_str(), self.name.as_str()),
                )
            })
            .collect()
    }
}
