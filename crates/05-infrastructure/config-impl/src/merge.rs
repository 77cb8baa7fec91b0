//! 按序数合并属性源

use config_abstractions::{ordinal_of, PropertySource, PropertyValue};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::trace;

/// 按有效序数升序排列属性源
///
/// 排序是稳定的：序数相同的属性源保持注册顺序，因此后注册者在合并时胜出。
pub fn rank_sources(sources: &[Arc<dyn PropertySource>]) -> Vec<Arc<dyn PropertySource>> {
    let mut ranked: Vec<(i32, Arc<dyn PropertySource>)> = sources
        .iter()
        .map(|source| (ordinal_of(&**source), Arc::clone(source)))
        .collect();
    ranked.sort_by_key(|(ordinal, _)| *ordinal);
    ranked.into_iter().map(|(_, source)| source).collect()
}

/// 解析单个键
///
/// 从低序数到高序数遍历，每个给出非缺失值的属性源覆盖之前的结果。
pub fn resolve(ranked: &[Arc<dyn PropertySource>], key: &str) -> Option<PropertyValue> {
    let mut result = None;
    for source in ranked {
        if let Some(value) = source.get(key).filter(PropertyValue::is_present) {
            trace!("键 {} 由属性源 {} 提供", key, source.name());
            result = Some(value);
        }
    }
    result
}

/// 解析全部键
///
/// 键集合来自可扫描的属性源；每个键的值按 [`resolve`] 的相同顺序在所有属性源中确定，
/// 不可扫描的属性源也会参与覆盖，从而与逐键读取的结果一致。
pub fn resolve_all(ranked: &[Arc<dyn PropertySource>]) -> BTreeMap<String, PropertyValue> {
    let scanned: Vec<Option<HashMap<String, PropertyValue>>> = ranked
        .iter()
        .map(|source| source.is_scannable().then(|| source.properties()))
        .collect();

    let keys: BTreeSet<&String> = scanned
        .iter()
        .flatten()
        .flat_map(|properties| {
            properties
                .iter()
                .filter(|(_, value)| value.is_present())
                .map(|(key, _)| key)
        })
        .collect();

    let mut merged = BTreeMap::new();
    for key in keys {
        let mut result: Option<PropertyValue> = None;
        for (source, properties) in ranked.iter().zip(&scanned) {
            let candidate = match properties {
                Some(properties) => properties.get(key).cloned(),
                None => source.get(key),
            };
            if let Some(value) = candidate.filter(PropertyValue::is_present) {
                result = Some(value);
            }
        }
        if let Some(value) = result {
            merged.insert(key.clone(), value);
        }
    }
    merged
}
