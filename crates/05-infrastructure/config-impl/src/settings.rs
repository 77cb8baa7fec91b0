//! 配置上下文的引导设置

use crate::context::ConfigurationContextBuilder;
use crate::sources::{EnvironmentPropertySource, TomlPropertySource};
use config_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// 上下文引导设置
///
/// ```toml
/// default_converters = true
///
/// [environment]
/// prefix = "APP"
///
/// [[files]]
/// path = "config/app.toml"
/// ordinal = 150
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// 是否注册默认转换器
    pub default_converters: bool,
    /// 环境变量属性源
    pub environment: Option<EnvironmentSettings>,
    /// TOML 文件属性源（按列出顺序注册）
    pub files: Vec<FileSourceSettings>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            default_converters: true,
            environment: None,
            files: Vec::new(),
        }
    }
}

/// 环境变量属性源设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    /// 变量前缀，空表示全部变量
    #[serde(default)]
    pub prefix: String,
    /// 分隔符
    #[serde(default = "default_separator")]
    pub separator: String,
    /// 序数，缺省使用属性源默认值
    #[serde(default)]
    pub ordinal: Option<i32>,
}

fn default_separator() -> String {
    "_".to_string()
}

/// TOML 文件属性源设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSourceSettings {
    /// 文件路径
    pub path: PathBuf,
    /// 序数，缺省使用属性源默认值
    #[serde(default)]
    pub ordinal: Option<i32>,
    /// 名称，缺省为 `toml:<路径>`
    #[serde(default)]
    pub name: Option<String>,
}

impl ContextSettings {
    /// 从 TOML 文本加载
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(ConfigError::parse)
    }

    /// 从 TOML 文件加载
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl ConfigurationContextBuilder {
    /// 按引导设置创建构建器
    ///
    /// 文件读取或解析失败时返回错误。
    pub fn from_settings(settings: &ContextSettings) -> ConfigResult<Self> {
        let mut builder = Self::new();
        if settings.default_converters {
            builder = builder.with_default_converters();
        }

        for file in &settings.files {
            let mut source = TomlPropertySource::from_path(&file.path)?;
            if let Some(ordinal) = file.ordinal {
                source = source.with_ordinal(ordinal);
            }
            if let Some(name) = &file.name {
                source = source.with_name(name.clone());
            }
            builder = builder.add_source(Arc::new(source));
        }

        if let Some(env) = &settings.environment {
            let mut source =
                EnvironmentPropertySource::with_separator(env.prefix.clone(), env.separator.clone());
            if let Some(ordinal) = env.ordinal {
                source = source.with_ordinal(ordinal);
            }
            builder = builder.add_source(Arc::new(source));
        }

        info!(
            "按引导设置创建构建器: {} 个文件属性源, 环境变量属性源: {}",
            settings.files.len(),
            settings.environment.is_some()
        );
        Ok(builder)
    }
}
