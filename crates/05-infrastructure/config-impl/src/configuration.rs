//! 配置读取门面

use crate::context::ConfigurationContext;
use crate::filter::apply_filters;
use crate::merge::{rank_sources, resolve, resolve_all};
use config_abstractions::{FrozenSnapshot, PropertyValue};
use config_common::{ConfigResult, ConfigSection};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// 整体配置快照的名称
pub const CONFIGURATION_SNAPSHOT_NAME: &str = "<configuration>";

/// 配置门面
///
/// 只读视图：读取时按序数合并属性源、执行过滤器链，并按需做类型转换。
/// 键不存在用 `None` 表示；转换失败才是错误。
#[derive(Debug, Clone)]
pub struct Configuration {
    context: Arc<ConfigurationContext>,
}

impl Configuration {
    /// 基于上下文创建配置门面
    pub fn new(context: Arc<ConfigurationContext>) -> Self {
        Self { context }
    }

    /// 所基于的上下文
    pub fn context(&self) -> &Arc<ConfigurationContext> {
        &self.context
    }

    /// 合并并过滤后的属性值，携带来源与元数据
    pub fn get_property_value(&self, key: &str) -> Option<PropertyValue> {
        let ranked = rank_sources(self.context.sources());
        let merged = resolve(&ranked, key)?;
        apply_filters(self.context.filters(), merged)
    }

    /// 读取原始字符串值
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_property_value(key)
            .and_then(PropertyValue::into_value)
    }

    /// 读取原始字符串值，缺失时使用默认值
    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// 使用注册的转换器读取类型化的值
    pub fn get_typed<T: 'static>(&self, key: &str) -> ConfigResult<Option<T>> {
        self.get(key)
            .map(|raw| self.context.converters().convert::<T>(key, &raw))
            .transpose()
    }

    /// 读取类型化的值，缺失时使用默认值
    ///
    /// 值存在但无法转换时仍然返回错误。
    pub fn get_typed_or<T: 'static>(&self, key: &str, default: T) -> ConfigResult<T> {
        Ok(self.get_typed(key)?.unwrap_or(default))
    }

    /// 读取类型化的值；目标类型没有注册转换器时回退到 [`FromStr`]
    pub fn get_parsed<T>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr + 'static,
    {
        self.get(key)
            .map(|raw| self.context.converters().convert_discovering::<T>(key, &raw))
            .transpose()
    }

    /// 合并并过滤后的全部属性值
    pub fn property_values(&self) -> BTreeMap<String, PropertyValue> {
        let ranked = rank_sources(self.context.sources());
        resolve_all(&ranked)
            .into_iter()
            .filter_map(|(key, value)| {
                apply_filters(self.context.filters(), value).map(|value| (key, value))
            })
            .collect()
    }

    /// 合并并过滤后的全部属性
    pub fn properties(&self) -> BTreeMap<String, String> {
        self.property_values()
            .into_iter()
            .filter_map(|(key, value)| value.into_value().map(|value| (key, value)))
            .collect()
    }

    /// 截取前缀下的配置节
    pub fn section(&self, prefix: &str) -> ConfigSection {
        let properties = self.properties();
        ConfigSection::from_properties(prefix, &properties)
    }

    /// 将前缀下的配置节绑定为具体类型
    pub fn bind<T: DeserializeOwned>(&self, prefix: &str) -> ConfigResult<T> {
        self.section(prefix).bind()
    }

    /// 冻结整个合并视图
    pub fn snapshot(&self) -> FrozenSnapshot {
        FrozenSnapshot::from_properties(CONFIGURATION_SNAPSHOT_NAME, 0, self.properties())
    }
}

impl From<ConfigurationContext> for Configuration {
    fn from(context: ConfigurationContext) -> Self {
        Self::new(Arc::new(context))
    }
}
