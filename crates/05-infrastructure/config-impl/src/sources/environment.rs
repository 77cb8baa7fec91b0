//! 环境变量属性源

use config_abstractions::{PropertySource, PropertyValue};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// 环境变量属性源的默认序数
pub const DEFAULT_ENVIRONMENT_ORDINAL: i32 = 300;

#[derive(Debug, Default)]
struct EnvironmentState {
    /// 配置键 -> (环境变量名, 值)
    entries: HashMap<String, (String, String)>,
}

/// 环境变量属性源
///
/// 按前缀筛选环境变量，`PREFIX_A_B` 映射为配置键 `a.b`。
/// 内容是创建（或 [`reload`](Self::reload)）时的快照。
#[derive(Debug)]
pub struct EnvironmentPropertySource {
    name: String,
    prefix: String,
    separator: String,
    ordinal: i32,
    state: RwLock<EnvironmentState>,
}

impl EnvironmentPropertySource {
    /// 读取当前进程的环境变量
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_separator(prefix, "_")
    }

    /// 指定分隔符读取当前进程的环境变量
    pub fn with_separator(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let source = Self::empty(prefix.into(), separator.into());
        source.reload();
        source
    }

    /// 由给定的变量集合创建，不读取进程环境
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, separator: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = Self::empty(prefix.into(), separator.into());
        source.load(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        source
    }

    fn empty(prefix: String, separator: String) -> Self {
        let name = if prefix.is_empty() {
            "environment".to_string()
        } else {
            format!("environment:{}", prefix)
        };
        Self {
            name,
            prefix,
            separator,
            ordinal: DEFAULT_ENVIRONMENT_ORDINAL,
            state: RwLock::new(EnvironmentState::default()),
        }
    }

    /// 设置序数
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// 设置名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 变量前缀
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 分隔符
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// 重新读取进程环境变量
    pub fn reload(&self) {
        self.load(std::env::vars());
    }

    fn load(&self, vars: impl Iterator<Item = (String, String)>) {
        debug!("加载环境变量，前缀: {}", self.prefix);
        let entries: HashMap<_, _> = vars
            .filter_map(|(var, value)| {
                let key = self.env_key_to_config_key(&var)?;
                Some((key, (var, value)))
            })
            .collect();
        debug!("加载了 {} 个环境变量", entries.len());
        self.state.write().entries = entries;
    }

    /// 将环境变量名转换为配置键，不匹配前缀时返回 `None`
    fn env_key_to_config_key(&self, env_key: &str) -> Option<String> {
        let rest = if self.prefix.is_empty() {
            env_key
        } else {
            env_key
                .strip_prefix(self.prefix.as_str())?
                .strip_prefix(self.separator.as_str())?
        };
        let rest = rest.trim_start_matches(self.separator.as_str());
        if rest.is_empty() {
            return None;
        }
        Some(rest.replace(self.separator.as_str(), ".").to_lowercase())
    }

    fn to_property_value(&self, key: &str, var: &str, value: &str) -> PropertyValue {
        PropertyValue::of(key, value, self.name.as_str())
            .with_metadata("source", "environment")
            .with_metadata("env_var", var)
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.state
            .read()
            .entries
            .get(key)
            .map(|(var, value)| self.to_property_value(key, var, value))
    }

    fn properties(&self) -> HashMap<String, PropertyValue> {
        self.state
            .read()
            .entries
            .iter()
            .map(|(key, (var, value))| (key.clone(), self.to_property_value(key, var, value)))
            .collect()
    }
}
