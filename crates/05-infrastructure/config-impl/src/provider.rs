//! 当前配置上下文的发布

use crate::configuration::Configuration;
use crate::context::{ConfigurationContext, ConfigurationContextBuilder};
use arc_swap::ArcSwap;
use config_common::ConfigResult;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use tracing::info;

static GLOBAL_CONTEXT: Lazy<Arc<ContextHolder>> = Lazy::new(|| {
    Arc::new(ContextHolder::new(
        ConfigurationContext::with_default_converters(),
    ))
});

/// 当前配置上下文的持有者
///
/// 读取无锁；发布是整体替换，读者要么看到旧上下文，要么看到新上下文。
pub struct ContextHolder {
    current: ArcSwap<ConfigurationContext>,
}

impl ContextHolder {
    /// 以初始上下文创建
    pub fn new(context: ConfigurationContext) -> Self {
        Self {
            current: ArcSwap::from_pointee(context),
        }
    }

    /// 当前上下文
    pub fn context(&self) -> Arc<ConfigurationContext> {
        self.current.load_full()
    }

    /// 基于当前上下文的配置门面
    pub fn configuration(&self) -> Configuration {
        Configuration::new(self.context())
    }

    /// 以当前上下文为起点的构建器
    pub fn builder(&self) -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::from_context(&self.context())
    }

    /// 发布新上下文，返回被替换的上下文
    pub fn publish(&self, context: ConfigurationContext) -> Arc<ConfigurationContext> {
        let count = context.sources().len();
        let previous = self.current.swap(Arc::new(context));
        info!("发布新的配置上下文: {} 个属性源", count);
        previous
    }

    /// 基于当前上下文计算并发布新上下文
    ///
    /// 计算期间若有其他发布发生，会基于最新的上下文重新计算。
    /// 计算失败时不发布，保留原有上下文。
    pub fn update<F>(&self, mut rebuild: F) -> ConfigResult<Arc<ConfigurationContext>>
    where
        F: FnMut(&ConfigurationContext) -> ConfigResult<ConfigurationContext>,
    {
        loop {
            let current = self.current.load_full();
            let next = Arc::new(rebuild(&current)?);
            let previous = self.current.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&*previous, &current) {
                info!("发布新的配置上下文: {} 个属性源", next.sources().len());
                return Ok(next);
            }
        }
    }
}

impl fmt::Debug for ContextHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHolder")
            .field("current", &self.current.load())
            .finish()
    }
}

/// 进程级配置入口
///
/// 初始上下文没有属性源，只包含默认转换器。
pub struct ConfigurationProvider;

impl ConfigurationProvider {
    /// 进程级上下文持有者
    pub fn holder() -> Arc<ContextHolder> {
        Arc::clone(&GLOBAL_CONTEXT)
    }

    /// 当前上下文
    pub fn context() -> Arc<ConfigurationContext> {
        GLOBAL_CONTEXT.context()
    }

    /// 当前配置
    pub fn configuration() -> Configuration {
        GLOBAL_CONTEXT.configuration()
    }

    /// 以当前上下文为起点的构建器
    pub fn builder() -> ConfigurationContextBuilder {
        GLOBAL_CONTEXT.builder()
    }

    /// 替换进程级上下文
    pub fn set_context(context: ConfigurationContext) -> Arc<ConfigurationContext> {
        GLOBAL_CONTEXT.publish(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MapPropertySource;
    use config_common::ConfigError;
    use std::thread;

    fn context_with(name: &str, value: &str) -> ConfigurationContext {
        ConfigurationContext::builder()
            .add_source(Arc::new(MapPropertySource::new(name, 0, [("k", value)])))
            .build()
            .unwrap()
    }

    #[test]
    fn test_publish_replaces_atomically() {
        let holder = ContextHolder::new(context_with("a", "1"));
        let before = holder.configuration();
        let previous = holder.publish(context_with("b", "2"));
        assert_eq!(previous.sources()[0].name(), "a");
        assert_eq!(before.get("k").as_deref(), Some("1"));
        assert_eq!(holder.configuration().get("k").as_deref(), Some("2"));
    }

    #[test]
    fn test_concurrent_publishes_hand_back_each_previous_once() {
        let holder = Arc::new(ContextHolder::new(context_with("start", "0")));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let holder = Arc::clone(&holder);
                thread::spawn(move || {
                    let name = format!("p{}", i);
                    holder.publish(context_with(&name, "v")).sources()[0].name().to_string()
                })
            })
            .collect();
        let mut previous: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        previous.push(holder.context().sources()[0].name().to_string());
        previous.sort();
        let mut expected: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();
        expected.push("start".to_string());
        expected.sort();
        assert_eq!(previous, expected);
    }

    #[test]
    fn test_failed_update_keeps_context() {
        let holder = ContextHolder::new(context_with("a", "1"));
        let result = holder.update(|_| Err(ConfigError::context_build_failed("nope")));
        assert!(result.is_err());
        assert_eq!(holder.context().sources()[0].name(), "a");
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let holder = Arc::new(ContextHolder::new(ConfigurationContext::default()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let holder = Arc::clone(&holder);
                thread::spawn(move || {
                    holder
                        .update(|current| {
                            current
                                .to_builder()
                                .add_source(Arc::new(MapPropertySource::new(
                                    format!("s{}", i),
                                    i,
                                    [("k", "v")],
                                )))
                                .build()
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(holder.context().sources().len(), 8);
    }

    #[test]
    fn test_global_starts_with_default_converters() {
        assert!(ConfigurationProvider::context()
            .converters()
            .is_registered::<bool>());
    }
}
