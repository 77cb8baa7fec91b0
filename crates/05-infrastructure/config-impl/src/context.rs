//! 配置上下文与构建器

use crate::configuration::Configuration;
use crate::converters::ConverterRegistry;
use crate::merge::rank_sources;
use config_abstractions::{same_source, PropertyConverter, PropertyFilter, PropertySource};
use config_common::{ConfigError, ConfigResult};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 配置上下文
///
/// 属性源（注册顺序）、过滤器链（执行顺序）和转换器注册表的不可变组合。
/// 任何"修改"都通过 [`ConfigurationContextBuilder`] 产生新的上下文。
#[derive(Clone, Default)]
pub struct ConfigurationContext {
    sources: Vec<Arc<dyn PropertySource>>,
    filters: Vec<Arc<dyn PropertyFilter>>,
    converters: ConverterRegistry,
}

impl ConfigurationContext {
    /// 创建构建器
    pub fn builder() -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::new()
    }

    /// 没有属性源和过滤器、只包含默认转换器的上下文
    pub fn with_default_converters() -> Self {
        Self {
            converters: ConverterRegistry::with_defaults(),
            ..Self::default()
        }
    }

    /// 以注册顺序返回属性源
    pub fn sources(&self) -> &[Arc<dyn PropertySource>] {
        &self.sources
    }

    /// 以有效序数升序返回属性源
    pub fn sources_sorted(&self) -> Vec<Arc<dyn PropertySource>> {
        rank_sources(&self.sources)
    }

    /// 按名称查找属性源；同名时返回最后注册的
    pub fn source(&self, name: &str) -> Option<&Arc<dyn PropertySource>> {
        self.sources.iter().rev().find(|s| s.name() == name)
    }

    /// 按正则表达式查找属性源
    pub fn find_sources_by_name(&self, pattern: &str) -> ConfigResult<Vec<Arc<dyn PropertySource>>> {
        let regex = Regex::new(pattern)?;
        Ok(self
            .sources
            .iter()
            .filter(|s| regex.is_match(s.name()))
            .cloned()
            .collect())
    }

    /// 过滤器链
    pub fn filters(&self) -> &[Arc<dyn PropertyFilter>] {
        &self.filters
    }

    /// 转换器注册表
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// 以当前内容为起点的构建器
    pub fn to_builder(&self) -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::from_context(self)
    }

    /// 基于此上下文的配置门面
    pub fn into_configuration(self) -> Configuration {
        Configuration::new(Arc::new(self))
    }
}

impl fmt::Debug for ConfigurationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationContext")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("converters", &self.converters)
            .finish()
    }
}

/// 配置上下文构建器
///
/// 以值传递链式调用；[`build`](Self::build) 不消耗构建器，
/// 之后继续修改构建器不会影响已经构建出的上下文。
#[derive(Clone, Default)]
pub struct ConfigurationContextBuilder {
    sources: Vec<Arc<dyn PropertySource>>,
    filters: Vec<Arc<dyn PropertyFilter>>,
    converters: ConverterRegistry,
}

impl ConfigurationContextBuilder {
    /// 创建空的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 以现有上下文为起点
    pub fn from_context(context: &ConfigurationContext) -> Self {
        Self::new().set_context(context)
    }

    /// 用现有上下文的内容替换构建器的全部内容
    pub fn set_context(mut self, context: &ConfigurationContext) -> Self {
        self.sources = context.sources.clone();
        self.filters = context.filters.clone();
        self.converters = context.converters.clone();
        self
    }

    /// 添加属性源
    pub fn add_source(mut self, source: Arc<dyn PropertySource>) -> Self {
        debug!("添加属性源: {} (序数 {})", source.name(), source.ordinal());
        self.sources.push(source);
        self
    }

    /// 批量添加属性源
    pub fn add_sources<I>(self, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn PropertySource>>,
    {
        sources.into_iter().fold(self, Self::add_source)
    }

    /// 按名称移除属性源（同名的全部移除）
    pub fn remove_sources<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            let before = self.sources.len();
            self.sources.retain(|s| s.name() != name);
            let removed = before - self.sources.len();
            if removed > 0 {
                debug!("移除属性源: {} ({} 个)", name, removed);
            }
        }
        self
    }

    /// 移除指定的属性源实例
    pub fn remove_source_instance(mut self, source: &Arc<dyn PropertySource>) -> Self {
        self.sources.retain(|s| !same_source(s, source));
        self
    }

    /// 在原位置替换同名属性源；找不到时追加到末尾
    pub fn replace_source(mut self, name: &str, replacement: Arc<dyn PropertySource>) -> Self {
        match self.sources.iter().position(|s| s.name() == name) {
            Some(index) => {
                debug!("替换属性源: {} -> {}", name, replacement.name());
                self.sources[index] = replacement;
                self
            }
            None => {
                warn!("未找到要替换的属性源 {}，改为追加", name);
                self.add_source(replacement)
            }
        }
    }

    /// 当前的属性源（注册顺序）
    pub fn sources(&self) -> &[Arc<dyn PropertySource>] {
        &self.sources
    }

    /// 追加过滤器
    pub fn add_filter(mut self, filter: Arc<dyn PropertyFilter>) -> Self {
        debug!("添加过滤器: {}", filter.name());
        self.filters.push(filter);
        self
    }

    /// 按名称移除过滤器
    pub fn remove_filters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            self.filters.retain(|f| f.name() != name);
        }
        self
    }

    /// 清空过滤器
    pub fn clear_filters(mut self) -> Self {
        self.filters.clear();
        self
    }

    /// 当前的过滤器链
    pub fn filters(&self) -> &[Arc<dyn PropertyFilter>] {
        &self.filters
    }

    /// 注册转换器
    pub fn add_converter<T, C>(mut self, converter: C) -> Self
    where
        T: 'static,
        C: PropertyConverter<T> + 'static,
    {
        self.converters.register::<T, C>(converter);
        self
    }

    /// 合并另一个注册表的转换器，追加在同类型已有转换器之后
    pub fn add_converters(mut self, converters: &ConverterRegistry) -> Self {
        self.converters.merge(converters);
        self
    }

    /// 移除目标类型的全部转换器
    pub fn remove_converters<T: 'static>(mut self) -> Self {
        let removed = self.converters.remove_all::<T>();
        debug!("移除类型转换器: {} ({} 个)", std::any::type_name::<T>(), removed);
        self
    }

    /// 注册默认转换器
    pub fn with_default_converters(mut self) -> Self {
        self.converters.register_defaults();
        self
    }

    /// 构建上下文
    ///
    /// 属性源名称不能为空。
    pub fn build(&self) -> ConfigResult<ConfigurationContext> {
        if let Some(index) = self.sources.iter().position(|s| s.name().trim().is_empty()) {
            return Err(ConfigError::context_build_failed(format!(
                "第 {} 个属性源的名称为空",
                index + 1
            )));
        }
        info!(
            "构建配置上下文: {} 个属性源, {} 个过滤器",
            self.sources.len(),
            self.filters.len()
        );
        Ok(ConfigurationContext {
            sources: self.sources.clone(),
            filters: self.filters.clone(),
            converters: self.converters.clone(),
        })
    }
}

impl fmt::Debug for ConfigurationContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationContextBuilder")
            .field("sources", &self.sources.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}
