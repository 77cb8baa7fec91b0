//! 属性源抽象接口

use crate::value::PropertyValue;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// 默认序数
pub const DEFAULT_ORDINAL: i32 = 0;

/// 属性源可通过定义该键覆盖声明的序数
pub const ORDINAL_KEY: &str = "strata.ordinal";

/// 向下转型支持
///
/// 对所有 `'static + Send + Sync` 类型自动实现，实现者无需关心。
pub trait AsAny: Any + Send + Sync {
    /// 以 `&dyn Any` 访问
    fn as_any(&self) -> &dyn Any;

    /// 转换为 `Arc<dyn Any>`，用于按具体类型向下转型
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 属性源 trait
///
/// 由外部后端（文件、环境变量、远程存储、内存映射）实现。
/// 读取可能阻塞，解析器不做任何并发控制，超时策略属于实现者。
pub trait PropertySource: AsAny + fmt::Debug {
    /// 属性源名称
    fn name(&self) -> &str;

    /// 声明的序数，越大优先级越高
    fn ordinal(&self) -> i32 {
        DEFAULT_ORDINAL
    }

    /// 是否可以枚举完整的键集合
    fn is_scannable(&self) -> bool {
        true
    }

    /// 读取单个属性
    fn get(&self, key: &str) -> Option<PropertyValue>;

    /// 读取全部属性；不可扫描的属性源可以返回部分结果
    fn properties(&self) -> HashMap<String, PropertyValue>;
}

/// 计算属性源的有效序数
///
/// 属性源自身定义了 [`ORDINAL_KEY`] 且可以解析为整数时使用该值，否则使用声明的序数。
pub fn ordinal_of(source: &dyn PropertySource) -> i32 {
    let declared = source.get(ORDINAL_KEY);
    match declared.as_ref().and_then(PropertyValue::value) {
        Some(raw) => match raw.trim().parse::<i32>() {
            Ok(ordinal) => ordinal,
            Err(e) => {
                warn!(
                    "属性源 {} 的序数配置无效: {}={}, 原因: {}",
                    source.name(),
                    ORDINAL_KEY,
                    raw,
                    e
                );
                source.ordinal()
            }
        },
        None => source.ordinal(),
    }
}

/// 比较两个属性源是否为同一实例
pub fn same_source(a: &Arc<dyn PropertySource>, b: &Arc<dyn PropertySource>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
