//! 类型转换器注册表实现

use config_abstractions::PropertyConverter;
use config_common::{ConfigError, ConfigResult};
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

macro_rules! register_integers {
    ($registry:expr, $($ty:ty),+) => {
        $(
            $registry.register::<$ty, _>(|raw: &str| {
                parse_integer(
                    raw,
                    <$ty>::MIN,
                    <$ty>::MAX,
                    |digits, radix| <$ty>::from_str_radix(digits, radix).ok(),
                )
            });
        )+
    };
}

type ConverterList<T> = Vec<Arc<dyn PropertyConverter<T>>>;
type ErasedConverters = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct ConverterEntry {
    type_name: &'static str,
    /// 实际类型为 `ConverterList<T>`
    converters: ErasedConverters,
    count: usize,
    append: fn(&ErasedConverters, &ErasedConverters) -> ConverterEntryParts,
}

type ConverterEntryParts = (ErasedConverters, usize);

fn append_converters<T: 'static>(
    current: &ErasedConverters,
    more: &ErasedConverters,
) -> ConverterEntryParts {
    let mut list = current
        .downcast_ref::<ConverterList<T>>()
        .cloned()
        .unwrap_or_default();
    if let Some(more) = more.downcast_ref::<ConverterList<T>>() {
        list.extend(more.iter().cloned());
    }
    let count = list.len();
    (Arc::new(list), count)
}

/// 类型转换器注册表
///
/// 按目标类型保存有序的字符串转换器列表，第一个成功的转换器胜出。
/// 注册表随配置上下文一起复制；通过 [`FromStr`] 隐式发现的转换器
/// 缓存在各副本共享的表中。
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, ConverterEntry>,
    discovered: Arc<DashMap<TypeId, ErasedConverters>>,
}

impl ConverterRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建包含默认转换器的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    /// 注册转换器，追加在同类型已有转换器之后
    pub fn register<T, C>(&mut self, converter: C)
    where
        T: 'static,
        C: PropertyConverter<T> + 'static,
    {
        self.register_arc::<T>(Arc::new(converter));
    }

    /// 注册共享的转换器实例
    pub fn register_arc<T: 'static>(&mut self, converter: Arc<dyn PropertyConverter<T>>) {
        let entry = self
            .converters
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ConverterEntry {
                type_name: type_name::<T>(),
                converters: Arc::new(ConverterList::<T>::new()),
                count: 0,
                append: append_converters::<T>,
            });
        let mut list = entry
            .converters
            .downcast_ref::<ConverterList<T>>()
            .cloned()
            .unwrap_or_default();
        list.push(converter);
        entry.count = list.len();
        entry.converters = Arc::new(list);
        debug!("注册类型转换器: {} (共 {} 个)", type_name::<T>(), entry.count);
    }

    /// 移除目标类型的全部转换器
    pub fn remove_all<T: 'static>(&mut self) -> usize {
        self.converters
            .remove(&TypeId::of::<T>())
            .map_or(0, |entry| entry.count)
    }

    /// 目标类型已注册的转换器数量
    pub fn converter_count<T: 'static>(&self) -> usize {
        self.converters
            .get(&TypeId::of::<T>())
            .map_or(0, |entry| entry.count)
    }

    /// 目标类型是否有显式注册的转换器
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.converter_count::<T>() > 0
    }

    /// 所有已注册的目标类型名称
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.converters.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    /// 合并另一个注册表，同类型的转换器追加在已有转换器之后
    pub fn merge(&mut self, other: &ConverterRegistry) {
        for (id, entry) in &other.converters {
            match self.converters.get_mut(id) {
                Some(existing) => {
                    let (converters, count) =
                        (existing.append)(&existing.converters, &entry.converters);
                    existing.converters = converters;
                    existing.count = count;
                }
                None => {
                    self.converters.insert(*id, entry.clone());
                }
            }
            debug!("合并类型转换器: {}", entry.type_name);
        }
    }

    fn registered<T: 'static>(&self) -> Option<ConverterList<T>> {
        self.converters
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.converters.downcast_ref::<ConverterList<T>>())
            .cloned()
    }

    /// 使用显式注册的转换器转换原始值
    pub fn convert<T: 'static>(&self, key: &str, raw: &str) -> ConfigResult<T> {
        let converters = self.registered::<T>().unwrap_or_default();
        Self::try_all(&converters, key, raw)
    }

    /// 转换原始值；目标类型没有显式注册的转换器时，基于 [`FromStr`] 合成一个并缓存
    pub fn convert_discovering<T>(&self, key: &str, raw: &str) -> ConfigResult<T>
    where
        T: FromStr + 'static,
    {
        if let Some(converters) = self.registered::<T>() {
            return Self::try_all(&converters, key, raw);
        }
        let converter = self.discovered_converter::<T>();
        Self::try_all(&[converter], key, raw)
    }

    /// 已通过隐式发现缓存的类型数量
    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    fn discovered_converter<T>(&self) -> Arc<dyn PropertyConverter<T>>
    where
        T: FromStr + 'static,
    {
        let erased = self
            .discovered
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!("隐式发现类型转换器: {}", type_name::<T>());
                let converter: Arc<dyn PropertyConverter<T>> =
                    Arc::new(FromStrConverter::<T>::default());
                Arc::new(converter)
            })
            .clone();
        match erased.downcast_ref::<Arc<dyn PropertyConverter<T>>>() {
            Some(converter) => Arc::clone(converter),
            None => Arc::new(FromStrConverter::<T>::default()),
        }
    }

    fn try_all<T: 'static>(
        converters: &[Arc<dyn PropertyConverter<T>>],
        key: &str,
        raw: &str,
    ) -> ConfigResult<T> {
        converters
            .iter()
            .find_map(|converter| converter.convert(raw))
            .ok_or_else(|| {
                debug!(
                    "类型转换失败: key={}, value={}, 目标类型={}, 转换器数量={}",
                    key,
                    raw,
                    type_name::<T>(),
                    converters.len()
                );
                ConfigError::conversion_failed(key, raw, type_name::<T>())
            })
    }

    /// 注册默认转换器
    pub fn register_defaults(&mut self) {
        self.register::<String, _>(|raw: &str| Some(raw.to_string()));
        self.register::<bool, _>(parse_bool);
        register_integers!(self, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
        self.register::<f32, _>(|raw: &str| raw.trim().parse::<f32>().ok());
        self.register::<f64, _>(|raw: &str| raw.trim().parse::<f64>().ok());
        self.register::<char, _>(parse_char);
        self.register::<PathBuf, _>(|raw: &str| {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        });
        self.register::<Duration, _>(parse_duration);
        self.register::<Vec<String>, _>(parse_list);
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("registered_types", &self.registered_types())
            .field("discovered", &self.discovered.len())
            .finish()
    }
}

/// 基于 [`FromStr`] 合成的转换器
struct FromStrConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for FromStrConverter<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: FromStr> PropertyConverter<T> for FromStrConverter<T> {
    fn convert(&self, raw: &str) -> Option<T> {
        raw.parse().ok()
    }
}

/// 解析整数：忽略首尾空白，支持 `0x`/`#` 十六进制以及 `min`/`max` 关键字
fn parse_integer<T>(
    raw: &str,
    min: T,
    max: T,
    from_radix: impl Fn(&str, u32) -> Option<T>,
) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("min") {
        return Some(min);
    }
    if trimmed.eq_ignore_ascii_case("max") {
        return Some(max);
    }
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let hex = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
        .or_else(|| body.strip_prefix('#'));
    let (digits, radix) = match hex {
        Some(digits) => (digits, 16),
        None => (body, 10),
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    if negative {
        from_radix(&format!("-{}", digits), radix)
    } else {
        from_radix(digits, radix)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_char(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// 解析时长：`<n>ms`、`<n>s`、`<n>m`、`<n>h`，纯数字按毫秒处理
fn parse_duration(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim().to_ascii_lowercase();
    let (number, unit_ms) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = trimmed.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (trimmed.as_str(), 1)
    };
    let value: u64 = number.trim().parse().ok()?;
    value.checked_mul(unit_ms).map(Duration::from_millis)
}

fn parse_list(raw: &str) -> Option<Vec<String>> {
    if raw.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(raw.split(',').map(|item| item.trim().to_string()).collect())
}
