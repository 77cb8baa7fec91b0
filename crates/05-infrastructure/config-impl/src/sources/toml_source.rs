//! TOML 属性源

use config_abstractions::{PropertySource, PropertyValue};
use config_common::{ConfigError, ConfigResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// TOML 属性源的默认序数
pub const DEFAULT_TOML_ORDINAL: i32 = 100;

/// TOML 属性源
///
/// 文档被展开为点分隔的键：嵌套表 `[server] port = 1` 对应 `server.port`，
/// 标量数组渲染为逗号分隔的列表，表数组按下标展开（`items.0.name`）。
#[derive(Debug)]
pub struct TomlPropertySource {
    name: String,
    ordinal: i32,
    file_path: Option<PathBuf>,
    values: RwLock<HashMap<String, String>>,
}

impl TomlPropertySource {
    /// 解析 TOML 文本
    pub fn from_toml_str(name: impl Into<String>, content: &str) -> ConfigResult<Self> {
        Ok(Self {
            name: name.into(),
            ordinal: DEFAULT_TOML_ORDINAL,
            file_path: None,
            values: RwLock::new(parse_document(content)?),
        })
    }

    /// 读取 TOML 文件，名称为 `toml:<路径>`
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let file_path = path.as_ref().to_path_buf();
        let values = load_file(&file_path)?;
        Ok(Self {
            name: format!("toml:{}", file_path.display()),
            ordinal: DEFAULT_TOML_ORDINAL,
            file_path: Some(file_path),
            values: RwLock::new(values),
        })
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

    /// 文件路径；由文本创建时为 `None`
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// 重新读取文件，失败时保留原有内容
    ///
    /// 由文本创建的属性源没有可以重读的内容，直接返回成功。
    pub fn reload(&self) -> ConfigResult<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let values = load_file(path)?;
        *self.values.write() = values;
        Ok(())
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
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

fn load_file(path: &Path) -> ConfigResult<HashMap<String, String>> {
    debug!("加载 TOML 配置文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let values = parse_document(&content)?;
    debug!("TOML 配置文件加载完成: {} 个键", values.len());
    Ok(values)
}

fn parse_document(content: &str) -> ConfigResult<HashMap<String, String>> {
    let table: toml::Table = toml::from_str(content).map_err(ConfigError::parse)?;
    let mut values = HashMap::new();
    flatten_table(&table, "", &mut values);
    Ok(values)
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn flatten_table(table: &toml::Table, prefix: &str, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        flatten_value(value, &join_key(prefix, key), out);
    }
}

fn flatten_value(value: &toml::Value, key: &str, out: &mut HashMap<String, String>) {
    match value {
        toml::Value::Table(table) => flatten_table(table, key, out),
        toml::Value::Array(items) => {
            let mut scalars = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match item {
                    toml::Value::Table(_) | toml::Value::Array(_) => {
                        flatten_value(item, &join_key(key, &index.to_string()), out);
                    }
                    scalar => scalars.push(render_scalar(scalar)),
                }
            }
            if !scalars.is_empty() || items.is_empty() {
                out.insert(key.to_string(), scalars.join(","));
            }
        }
        scalar => {
            out.insert(key.to_string(), render_scalar(scalar));
        }
    }
}

fn render_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        other => other.to_string(),
    }
}
