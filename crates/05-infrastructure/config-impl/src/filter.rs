//! 过滤器链与线程级过滤器

use config_abstractions::{PropertyFilter, PropertyValue};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, trace};

/// 依次应用过滤器
///
/// 每个过滤器接收上一个过滤器的输出；任一过滤器返回 `None`（或缺失值）即否决该属性，
/// 后续过滤器不再执行。
pub fn apply_filters(
    filters: &[Arc<dyn PropertyFilter>],
    value: PropertyValue,
) -> Option<PropertyValue> {
    let mut current = value;
    for filter in filters {
        match filter.filter(current) {
            Some(next) if next.is_present() => current = next,
            _ => {
                trace!("属性被过滤器否决: filter={}", filter.name());
                return None;
            }
        }
    }
    Some(current)
}

thread_local! {
    static THREAD_FILTERS: RefCell<Vec<Arc<dyn PropertyFilter>>> = RefCell::new(Vec::new());
}

/// 当前线程的过滤器列表
///
/// 只对调用线程可见。需要生效时，把 [`ThreadLocalFilter`] 加入配置上下文的过滤器链。
pub struct ThreadFilterContext;

impl ThreadFilterContext {
    /// 追加过滤器
    pub fn add_filter(filter: Arc<dyn PropertyFilter>) {
        debug!("添加线程级过滤器: {}", filter.name());
        THREAD_FILTERS.with(|filters| filters.borrow_mut().push(filter));
    }

    /// 在指定位置插入过滤器，越界时追加到末尾
    pub fn insert_filter(position: usize, filter: Arc<dyn PropertyFilter>) {
        THREAD_FILTERS.with(|filters| {
            let mut filters = filters.borrow_mut();
            let position = position.min(filters.len());
            filters.insert(position, filter);
        });
    }

    /// 移除指定位置的过滤器
    pub fn remove_filter_at(position: usize) -> Option<Arc<dyn PropertyFilter>> {
        THREAD_FILTERS.with(|filters| {
            let mut filters = filters.borrow_mut();
            (position < filters.len()).then(|| filters.remove(position))
        })
    }

    /// 清空当前线程的过滤器
    pub fn clear_filters() {
        THREAD_FILTERS.with(|filters| filters.borrow_mut().clear());
    }

    /// 替换当前线程的全部过滤器
    pub fn set_filters(new_filters: impl IntoIterator<Item = Arc<dyn PropertyFilter>>) {
        let new_filters: Vec<_> = new_filters.into_iter().collect();
        THREAD_FILTERS.with(|filters| *filters.borrow_mut() = new_filters);
    }

    /// 当前线程过滤器的副本
    pub fn filters() -> Vec<Arc<dyn PropertyFilter>> {
        THREAD_FILTERS.with(|filters| filters.borrow().clone())
    }

    /// 对值应用当前线程的过滤器
    pub fn apply(value: PropertyValue) -> Option<PropertyValue> {
        // 先复制列表，过滤器内部可以再次修改线程过滤器
        let filters = Self::filters();
        apply_filters(&filters, value)
    }
}

/// 把 [`ThreadFilterContext`] 接入上下文过滤器链的适配器
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadLocalFilter;

impl PropertyFilter for ThreadLocalFilter {
    fn filter(&self, value: PropertyValue) -> Option<PropertyValue> {
        ThreadFilterContext::apply(value)
    }

    fn name(&self) -> &str {
        "thread-local"
    }
}
