//! 配置节与类型化绑定

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 配置节
///
/// 以前缀截取的一组扁平属性（键已去掉前缀），可以绑定为任意 serde 类型。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSection {
    /// 配置节前缀，根节点为空字符串
    pub prefix: String,
    /// 配置数据（相对键 → 原始字符串值）
    pub data: BTreeMap<String, String>,
}

impl ConfigSection {
    /// 创建新的配置节
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            data: BTreeMap::new(),
        }
    }

    /// 从扁平属性中截取指定前缀下的配置节
    pub fn from_properties<'a, I>(prefix: &str, properties: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let prefix = prefix.trim_matches('.');
        let mut section = Self::new(prefix);
        for (key, value) in properties {
            if prefix.is_empty() {
                section.insert(key.clone(), value.clone());
            } else if let Some(rest) = key
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
            {
                section.insert(rest, value.clone());
            }
        }
        section
    }

    /// 插入配置项
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// 获取配置项
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// 配置节是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 配置项数量
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 将点分隔的扁平键折叠为嵌套 JSON 对象
    ///
    /// 叶子值按 bool、整数、浮点数、字符串的顺序推断类型。
    /// 同一路径既是叶子又是父节点时，父节点优先，叶子值丢弃。
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for (key, raw) in &self.data {
            let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
            if parts.is_empty() {
                continue;
            }
            insert_path(&mut root, &parts, infer_json_value(raw));
        }
        Value::Object(root)
    }

    /// 绑定到具体类型
    pub fn bind<T>(&self) -> Result<T, ConfigError>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_value(self.to_json()).map_err(|e| ConfigError::SerializationError { source: e })
    }
}

fn insert_path(node: &mut Map<String, Value>, parts: &[&str], value: Value) {
    let (head, rest) = match parts.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        // 已存在的子对象优先
        if !matches!(node.get(*head), Some(Value::Object(_))) {
            node.insert((*head).to_string(), value);
        }
        return;
    }
    let child = node
        .entry((*head).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(map) = child {
        insert_path(map, rest, value);
    }
}

/// 推断原始字符串对应的 JSON 值
pub fn infer_json_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        Value::Bool(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Number(serde_json::Number::from(i))
    } else if let Some(n) = raw
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
    {
        Value::Number(n)
    } else {
        Value::String(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct ServerOptions {
        host: String,
        port: u16,
        tls: TlsOptions,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct TlsOptions {
        enabled: bool,
        ratio: f64,
    }

    fn props() -> BTreeMap<String, String> {
        [
            ("server.host", "localhost"),
            ("server.port", "8080"),
            ("server.tls.enabled", "true"),
            ("server.tls.ratio", "0.5"),
            ("client.timeout", "30"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_section_strips_prefix() {
        let props = props();
        let section = ConfigSection::from_properties("server", &props);
        assert_eq!(section.len(), 4);
        assert_eq!(section.get("host"), Some("localhost"));
        assert_eq!(section.get("timeout"), None);
    }

    #[test]
    fn test_bind_nested_struct() {
        let props = props();
        let section = ConfigSection::from_properties("server.", &props);
        let options: ServerOptions = section.bind().unwrap();
        assert_eq!(
            options,
            ServerOptions {
                host: "localhost".to_string(),
                port: 8080,
                tls: TlsOptions {
                    enabled: true,
                    ratio: 0.5,
                },
            }
        );
    }

    #[test]
    fn test_bind_type_mismatch_is_error() {
        let mut section = ConfigSection::new("x");
        section.insert("port", "not-a-number");
        let result: Result<ServerOptions, _> = section.bind();
        assert!(result.is_err());
    }

    #[test]
    fn test_parent_wins_over_leaf() {
        let mut section = ConfigSection::new("");
        section.insert("a", "1");
        section.insert("a.b", "2");
        assert_eq!(section.to_json(), serde_json::json!({"a": {"b": 2}}));
    }
}
