//! 属性过滤器抽象接口

use crate::value::PropertyValue;

/// 属性过滤器 trait
///
/// 在合并之后、类型转换之前按注册顺序执行。返回 `None` 表示否决该键，
/// 结果中视同属性源从未定义过它。
pub trait PropertyFilter: Send + Sync {
    /// 过滤属性值
    fn filter(&self, value: PropertyValue) -> Option<PropertyValue>;

    /// 过滤器名称
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 基于闭包的过滤器
pub struct FnFilter<F> {
    name: String,
    func: F,
}

impl<F> FnFilter<F>
where
    F: Fn(PropertyValue) -> Option<PropertyValue> + Send + Sync,
{
    /// 创建命名的闭包过滤器
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> PropertyFilter for FnFilter<F>
where
    F: Fn(PropertyValue) -> Option<PropertyValue> + Send + Sync,
{
    fn filter(&self, value: PropertyValue) -> Option<PropertyValue> {
        (self.func)(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish()
    }
}
