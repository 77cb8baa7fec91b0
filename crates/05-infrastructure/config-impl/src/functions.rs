//! 属性源与配置键的工具函数

use crate::configuration::Configuration;
use config_abstractions::{ordinal_of, PropertySource, PropertyValue};
use config_common::ConfigResult;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// 根节点的节名称
pub const ROOT_SECTION: &str = "<root>";

#[derive(Debug)]
struct EmptySource;

impl PropertySource for EmptySource {
    fn name(&self) -> &str {
        "<empty>"
    }

    fn get(&self, _key: &str) -> Option<PropertyValue> {
        None
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        HashMap::new()
    }
}

/// 没有任何属性的属性源
pub fn empty_source() -> Arc<dyn PropertySource> {
    Arc::new(EmptySource)
}

/// 只保留满足谓词的键的属性源
pub struct FilteredPropertySource<P> {
    name: String,
    inner: Arc<dyn PropertySource>,
    predicate: P,
}

impl<P> FilteredPropertySource<P>
where
    P: Fn(&str) -> bool + Send + Sync + 'static,
{
    /// 包装属性源，名称为 `filtered:<原名称>`
    pub fn new(inner: Arc<dyn PropertySource>, predicate: P) -> Self {
        Self {
            name: format!("filtered:{}", inner.name()),
            inner,
            predicate,
        }
    }
}

impl<P> PropertySource for FilteredPropertySource<P>
where
    P: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        ordinal_of(&*self.inner)
    }

    fn is_scannable(&self) -> bool {
        self.inner.is_scannable()
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        if (self.predicate)(key) {
            self.inner.get(key)
        } else {
            None
        }
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        self.inner
            .properties()
            .into_iter()
            .filter(|(key, _)| (self.predicate)(key.as_str()))
            .collect()
    }
}

impl<P> fmt::Debug for FilteredPropertySource<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredPropertySource")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .finish()
    }
}

/// 向属性源追加条目的包装
#[derive(Debug)]
pub struct EnrichedPropertySource {
    name: String,
    inner: Arc<dyn PropertySource>,
    additions: BTreeMap<String, String>,
    overriding: bool,
}

impl EnrichedPropertySource {
    /// 包装属性源；`overriding` 为真时追加的条目优先，否则原属性源的值优先
    pub fn new<I, K, V>(inner: Arc<dyn PropertySource>, additions: I, overriding: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: format!("enriched:{}", inner.name()),
            inner,
            additions: additions
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            overriding,
        }
    }

    fn addition(&self, key: &str) -> Option<PropertyValue> {
        self.additions
            .get(key)
            .map(|value| PropertyValue::of(key, value.as_str(), self.name.as_str()))
    }
}

impl PropertySource for EnrichedPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        ordinal_of(&*self.inner)
    }

    fn is_scannable(&self) -> bool {
        self.inner.is_scannable()
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        let original = self.inner.get(key).filter(PropertyValue::is_present);
        if self.overriding {
            self.addition(key).or(original)
        } else {
            original.or_else(|| self.addition(key))
        }
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        let mut properties = self.inner.properties();
        for key in self.additions.keys() {
            if self.overriding || !properties.get(key).is_some_and(PropertyValue::is_present) {
                if let Some(value) = self.addition(key) {
                    properties.insert(key.clone(), value);
                }
            }
        }
        properties
    }
}

/// 追加条目，原属性源已有的值优先
pub fn add_items<I, K, V>(source: Arc<dyn PropertySource>, items: I) -> Arc<dyn PropertySource>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    Arc::new(EnrichedPropertySource::new(source, items, false))
}

/// 追加条目，追加的值覆盖原属性源的值
pub fn replace_items<I, K, V>(source: Arc<dyn PropertySource>, items: I) -> Arc<dyn PropertySource>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    Arc::new(EnrichedPropertySource::new(source, items, true))
}

/// 把配置的合并视图包装为可扫描的属性源
#[derive(Debug, Clone)]
pub struct ConfigWrappingPropertySource {
    name: String,
    ordinal: i32,
    config: Configuration,
}

impl ConfigWrappingPropertySource {
    /// 以指定名称和序数包装配置
    pub fn new(name: impl Into<String>, ordinal: i32, config: Configuration) -> Self {
        Self {
            name: name.into(),
            ordinal,
            config,
        }
    }
}

impl PropertySource for ConfigWrappingPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.config
            .get(key)
            .map(|value| PropertyValue::of(key, value, self.name.as_str()))
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        self.config
            .properties()
            .into_iter()
            .map(|(key, value)| {
                let property = PropertyValue::of(key.as_str(), value, self.name.as_str());
                (key, property)
            })
            .collect()
    }
}

/// 多个配置的组合视图
///
/// 按加入顺序查询，最后一个有值的配置胜出；全部属性按同样的顺序合并。
#[derive(Debug, Clone)]
pub struct CombinedConfiguration {
    name: String,
    configurations: Vec<Configuration>,
}

impl CombinedConfiguration {
    /// 创建组合配置
    pub fn new<I>(name: impl Into<String>, configurations: I) -> Self
    where
        I: IntoIterator<Item = Configuration>,
    {
        Self {
            name: name.into(),
            configurations: configurations.into_iter().collect(),
        }
    }

    /// 加入一个配置，优先级高于已加入的配置
    pub fn add_configuration(&mut self, configuration: Configuration) {
        self.configurations.push(configuration);
    }

    /// 组合名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 参与组合的配置
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// 读取字符串值
    pub fn get(&self, key: &str) -> Option<String> {
        self.configurations.iter().rev().find_map(|c| c.get(key))
    }

    /// 读取字符串值，缺失时返回默认值
    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// 读取并转换为目标类型；任何一个配置转换失败都返回错误
    pub fn get_typed<T: 'static>(&self, key: &str) -> ConfigResult<Option<T>> {
        let mut current = None;
        for configuration in &self.configurations {
            if let Some(value) = configuration.get_typed::<T>(key)? {
                current = Some(value);
            }
        }
        Ok(current)
    }

    /// 读取并转换为目标类型，缺失时返回默认值
    pub fn get_typed_or<T: 'static>(&self, key: &str, default: T) -> ConfigResult<T> {
        Ok(self.get_typed(key)?.unwrap_or(default))
    }

    /// 合并后的全部属性
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();
        for configuration in &self.configurations {
            result.extend(configuration.properties());
        }
        result
    }
}

/// 键的直接所属节；顶层键属于 [`ROOT_SECTION`]
fn area_of(key: &str) -> &str {
    match key.rfind('.') {
        Some(index) if index > 0 => &key[..index],
        _ => ROOT_SECTION,
    }
}

/// 键是否直接位于节之下（不含更深的子节）
pub fn is_key_in_section(key: &str, section: &str) -> bool {
    let section = section.trim_end_matches('.');
    if section.is_empty() || section == ROOT_SECTION {
        return !key.contains('.');
    }
    area_of(key) == section
}

/// 键是否直接位于任意一个节之下
pub fn is_key_in_sections<S: AsRef<str>>(key: &str, sections: &[S]) -> bool {
    sections
        .iter()
        .any(|section| is_key_in_section(key, section.as_ref()))
}

/// 所有键的直接所属节
pub fn sections<'a, I>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    keys.into_iter()
        .map(|key| area_of(key).to_string())
        .collect()
}

/// 所有键的所属节及其全部上级节
pub fn transitive_sections<'a, I>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut result = BTreeSet::new();
    for key in keys {
        let mut area = area_of(key);
        if area == ROOT_SECTION {
            result.insert(ROOT_SECTION.to_string());
            continue;
        }
        loop {
            result.insert(area.to_string());
            match area.rfind('.') {
                Some(index) if index > 0 => area = &area[..index],
                _ => break,
            }
        }
    }
    result
}

/// 满足谓词的直接所属节
pub fn sections_matching<'a, I, P>(keys: I, predicate: P) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
    P: Fn(&str) -> bool,
{
    sections(keys)
        .into_iter()
        .filter(|section| predicate(section.as_str()))
        .collect()
}

/// 满足谓词的所属节及上级节
pub fn transitive_sections_matching<'a, I, P>(keys: I, predicate: P) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
    P: Fn(&str) -> bool,
{
    transitive_sections(keys)
        .into_iter()
        .filter(|section| predicate(section.as_str()))
        .collect()
}

/// 截取节（含所有子节）下的属性
///
/// `strip` 为真时去掉键的节前缀。
pub fn section(
    properties: &BTreeMap<String, String>,
    section_key: &str,
    strip: bool,
) -> BTreeMap<String, String> {
    let section_key = section_key.trim_end_matches('.');
    let prefix = format!("{}.", section_key);
    properties
        .iter()
        .filter_map(|(key, value)| {
            let rest = key.strip_prefix(prefix.as_str())?;
            let key = if strip { rest.to_string() } else { key.clone() };
            Some((key, value.clone()))
        })
        .collect()
}
