//! 属性源变更后重建配置上下文

use crate::context::ConfigurationContext;
use crate::event_manager::ConfigEventManager;
use crate::provider::{ConfigurationProvider, ContextHolder};
use chrono::Utc;
use config_abstractions::{ConfigEvent, ConfigEventListener, ConfigEventType, ContextChange};
use config_common::{ConfigError, ConfigResult};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// 默认的上下文变更监听器
///
/// 收到 [`ConfigEvent::ContextChanged`] 时，从当前上下文中移除被删除和被替换的属性源、
/// 加入新增和替换后的属性源，构建新上下文并原子地发布。
/// 构建失败时记录警告并保留原有上下文；发布成功后通过事件管理器触发
/// [`ConfigEvent::ContextReplaced`]。
#[derive(Debug)]
pub struct DefaultContextChangeListener {
    holder: Arc<ContextHolder>,
    events: Option<Weak<ConfigEventManager>>,
}

impl DefaultContextChangeListener {
    /// 发布到进程级上下文，并通过进程级事件管理器通知
    pub fn new() -> Self {
        Self::with_holder(ConfigurationProvider::holder())
            .with_event_manager(&ConfigEventManager::global())
    }

    /// 发布到指定的上下文持有者
    pub fn with_holder(holder: Arc<ContextHolder>) -> Self {
        Self {
            holder,
            events: None,
        }
    }

    /// 发布成功后通过指定的事件管理器通知
    pub fn with_event_manager(mut self, events: &Arc<ConfigEventManager>) -> Self {
        self.events = Some(Arc::downgrade(events));
        self
    }

    /// 上下文持有者
    pub fn holder(&self) -> &Arc<ContextHolder> {
        &self.holder
    }

    /// 变更是否会改变上下文：有新增或替换的属性源，或者现有属性源中有被删除的
    fn touches(current: &ConfigurationContext, change: &ContextChange) -> bool {
        !change.added_sources().is_empty()
            || !change.updated_sources().is_empty()
            || current.sources().iter().any(|s| change.is_affected(&**s))
    }

    fn rebuild(
        current: &ConfigurationContext,
        change: &ContextChange,
    ) -> ConfigResult<ConfigurationContext> {
        current
            .to_builder()
            .remove_sources(change.stale_names())
            .add_sources(change.added_sources().iter().cloned())
            .add_sources(change.updated_sources().iter().cloned())
            .build()
    }

    /// 应用属性源变更并发布新上下文
    pub fn apply(&self, change: &ContextChange) -> ConfigResult<Arc<ConfigurationContext>> {
        let current = self.holder.context();
        if !Self::touches(&current, change) {
            debug!("属性源变更 {} 不影响当前上下文，跳过", change.version());
            return Ok(current);
        }
        let published = self
            .holder
            .update(|current| Self::rebuild(current, change))
            .map_err(|e| {
                warn!("应用属性源变更 {} 失败，保留原有配置上下文: {}", change.version(), e);
                ConfigError::reconfiguration_failed(e.to_string())
            })?;
        info!("属性源变更 {} 已应用", change.version());

        if let Some(events) = self.events.as_ref().and_then(Weak::upgrade) {
            events.fire_event(&ConfigEvent::ContextReplaced {
                version: change.version().to_string(),
                timestamp: Utc::now(),
            });
        }
        Ok(published)
    }
}

impl Default for DefaultContextChangeListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigEventListener for DefaultContextChangeListener {
    fn on_config_event(&self, event: &ConfigEvent) -> ConfigResult<()> {
        match event {
            ConfigEvent::ContextChanged(change) => self.apply(change).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "DefaultContextChangeListener"
    }

    fn interested_event_types(&self) -> Vec<ConfigEventType> {
        vec![ConfigEventType::ContextChanged]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MapPropertySource;
    use config_abstractions::{FnListener, PropertySource};
    use parking_lot::Mutex;

    fn map(name: &str, ordinal: i32, entries: &[(&str, &str)]) -> Arc<dyn PropertySource> {
        Arc::new(MapPropertySource::new(name, ordinal, entries.iter().copied()))
    }

    fn holder() -> Arc<ContextHolder> {
        Arc::new(ContextHolder::new(
            ConfigurationContext::builder()
                .add_source(map("file", 100, &[("a", "1"), ("b", "2")]))
                .add_source(map("env", 200, &[("a", "9")]))
                .build()
                .unwrap(),
        ))
    }

    #[test]
    fn test_removed_source_is_dropped() {
        let holder = holder();
        let listener = DefaultContextChangeListener::with_holder(Arc::clone(&holder));
        let change = ContextChange::builder().removed(map("env", 200, &[])).build();
        listener
            .on_config_event(&ConfigEvent::from(change))
            .unwrap();
        let config = holder.configuration();
        assert_eq!(config.get("a").as_deref(), Some("1"));
        assert_eq!(holder.context().sources().len(), 1);
    }

    #[test]
    fn test_updated_source_replaces_same_name() {
        let holder = holder();
        let listener = DefaultContextChangeListener::with_holder(Arc::clone(&holder));
        let change = ContextChange::builder()
            .updated(map("env", 200, &[("a", "42")]))
            .added(map("remote", 50, &[("c", "3")]))
            .build();
        listener.apply(&change).unwrap();
        let config = holder.configuration();
        assert_eq!(config.get("a").as_deref(), Some("42"));
        assert_eq!(config.get("c").as_deref(), Some("3"));
        assert_eq!(holder.context().sources().len(), 3);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_context() {
        let holder = holder();
        let before = holder.context();
        let listener = DefaultContextChangeListener::with_holder(Arc::clone(&holder));
        let change = ContextChange::builder().added(map("", 1, &[])).build();
        assert!(matches!(
            listener.apply(&change),
            Err(ConfigError::ReconfigurationFailed { .. })
        ));
        assert!(Arc::ptr_eq(&before, &holder.context()));
    }

    #[test]
    fn test_replaced_event_fired_through_manager() {
        let manager = Arc::new(ConfigEventManager::new());
        let holder = holder();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        manager.add_listener(Arc::new(
            DefaultContextChangeListener::with_holder(Arc::clone(&holder))
                .with_event_manager(&manager),
        ));
        manager.add_listener(Arc::new(FnListener::new("recorder", move |event: &ConfigEvent| {
            recorder.lock().push(event.event_type());
            Ok(())
        })));

        let change = ContextChange::builder()
            .removed(map("env", 200, &[]))
            .with_version("c1")
            .build();
        let report = manager.fire_event(&change.into());
        assert!(report.is_success());
        assert_eq!(
            *seen.lock(),
            vec![ConfigEventType::ContextReplaced, ConfigEventType::ContextChanged]
        );
        assert_eq!(holder.configuration().get("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_unaffected_change_keeps_context_and_stays_silent() {
        let manager = Arc::new(ConfigEventManager::new());
        let holder = holder();
        let before = holder.context();
        let replaced = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&replaced);
        manager.add_listener(Arc::new(
            DefaultContextChangeListener::with_holder(Arc::clone(&holder))
                .with_event_manager(&manager),
        ));
        manager.add_listener(Arc::new(FnListener::new("counter", move |event: &ConfigEvent| {
            if event.event_type() == ConfigEventType::ContextReplaced {
                *counter.lock() += 1;
            }
            Ok(())
        })));

        let change = ContextChange::builder().removed(map("remote", 10, &[])).build();
        assert!(manager.fire_event(&change.into()).is_success());
        assert!(Arc::ptr_eq(&before, &holder.context()));
        assert_eq!(*replaced.lock(), 0);

        let empty = ContextChange::builder().build();
        assert!(manager.fire_event(&empty.into()).is_success());
        assert!(Arc::ptr_eq(&before, &holder.context()));
        assert_eq!(*replaced.lock(), 0);
    }
}
