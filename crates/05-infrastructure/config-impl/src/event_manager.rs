//! 配置事件管理器实现

use arc_swap::ArcSwap;
use config_abstractions::{ChangeKind, ConfigEvent, ConfigEventListener, ConfigEventType};
use config_common::ConfigError;
use once_cell::sync::Lazy;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

static GLOBAL_EVENT_MANAGER: Lazy<Arc<ConfigEventManager>> =
    Lazy::new(|| Arc::new(ConfigEventManager::new()));

/// 监听器注册标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    listener: Arc<dyn ConfigEventListener>,
}

/// 单个监听器的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// 监听器名称
    pub listener: String,
    /// 失败原因（错误信息或 panic 内容）
    pub message: String,
    /// 是否由 panic 引起
    pub panicked: bool,
}

impl ListenerFailure {
    /// 转换为错误
    pub fn to_error(&self) -> ConfigError {
        ConfigError::listener_failed(self.listener.clone(), self.message.clone())
    }
}

/// 一次事件分发的结果
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// 事件类型
    pub event_type: ConfigEventType,
    /// 事件版本
    pub version: String,
    /// 成功处理的监听器数量
    pub delivered: usize,
    /// 因未启用或不感兴趣而跳过的监听器数量
    pub skipped: usize,
    /// 失败的监听器
    pub failures: Vec<ListenerFailure>,
}

impl DispatchReport {
    /// 所有接收事件的监听器都成功
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 配置事件管理器
///
/// 监听器列表采用写时复制：注册和移除替换整个列表，分发时读取当时的列表快照，
/// 因此分发过程中可以安全地注册、移除监听器或再次触发事件。
/// 分发在调用线程上同步执行；单个监听器的错误或 panic 只会被记录和汇报。
pub struct ConfigEventManager {
    listeners: ArcSwap<Vec<Registration>>,
    next_id: AtomicU64,
}

impl ConfigEventManager {
    /// 创建独立的事件管理器
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 进程级事件管理器
    pub fn global() -> Arc<ConfigEventManager> {
        Arc::clone(&GLOBAL_EVENT_MANAGER)
    }

    /// 注册事件监听器
    pub fn add_listener(&self, listener: Arc<dyn ConfigEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!("注册配置事件监听器: {} ({})", listener.name(), id);
        let registration = Registration { id, listener };
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(registration.clone());
            next
        });
        id
    }

    /// 按注册标识移除监听器
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let previous = self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|r| r.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|r| r.id == id);
        if removed {
            info!("移除配置事件监听器: {}", id);
        }
        removed
    }

    /// 按名称移除监听器，返回移除的数量
    pub fn remove_listener_named(&self, name: &str) -> usize {
        let previous = self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|r| r.listener.name() != name)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().filter(|r| r.listener.name() == name).count();
        if removed > 0 {
            info!("移除配置事件监听器: {} ({} 个)", name, removed);
        }
        removed
    }

    /// 移除全部监听器
    pub fn clear(&self) {
        self.listeners.store(Arc::new(Vec::new()));
        info!("已清空配置事件监听器");
    }

    /// 监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.load().len()
    }

    /// 所有监听器名称（注册顺序）
    pub fn listener_names(&self) -> Vec<String> {
        self.listeners
            .load()
            .iter()
            .map(|r| r.listener.name().to_string())
            .collect()
    }

    /// 同步分发事件
    pub fn fire_event(&self, event: &ConfigEvent) -> DispatchReport {
        let event_type = event.event_type();
        let listeners = self.listeners.load_full();
        debug!(
            "分发配置事件: {:?} (版本 {}) 到 {} 个监听器",
            event_type,
            event.version(),
            listeners.len()
        );

        let mut report = DispatchReport {
            event_type,
            version: event.version().to_string(),
            delivered: 0,
            skipped: 0,
            failures: Vec::new(),
        };

        for registration in listeners.iter() {
            let listener = &registration.listener;
            if !listener.is_enabled() {
                report.skipped += 1;
                continue;
            }
            let interested = listener.interested_event_types();
            if !interested.is_empty() && !interested.contains(&event_type) {
                report.skipped += 1;
                continue;
            }

            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_config_event(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    error!("监听器 {} 处理事件失败: {}", listener.name(), e);
                    report.failures.push(ListenerFailure {
                        listener: listener.name().to_string(),
                        message: e.to_string(),
                        panicked: false,
                    });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("监听器 {} 处理事件时 panic: {}", listener.name(), message);
                    report.failures.push(ListenerFailure {
                        listener: listener.name().to_string(),
                        message,
                        panicked: true,
                    });
                }
            }
        }
        report
    }
}

impl Default for ConfigEventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigEventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEventManager")
            .field("listeners", &self.listener_names())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<unknown panic>".to_string()
    }
}

/// 日志记录事件监听器
///
/// 将所有配置事件记录到日志中
pub struct LoggingConfigEventListener {
    name: String,
    enabled: AtomicBool,
    interested_events: Vec<ConfigEventType>,
}

impl LoggingConfigEventListener {
    /// 创建新的日志记录监听器
    pub fn new() -> Self {
        Self {
            name: "LoggingConfigEventListener".to_string(),
            enabled: AtomicBool::new(true),
            interested_events: Vec::new(),
        }
    }

    /// 设置是否启用
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// 设置感兴趣的事件类型
    pub fn with_interested_events(mut self, events: Vec<ConfigEventType>) -> Self {
        self.interested_events = events;
        self
    }
}

impl Default for LoggingConfigEventListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigEventListener for LoggingConfigEventListener {
    fn on_config_event(&self, event: &ConfigEvent) -> Result<(), ConfigError> {
        match event {
            ConfigEvent::Change(change) => {
                info!("配置变更: {}", change);
                for (key, entry) in change.entries() {
                    match entry.kind() {
                        ChangeKind::Added => {
                            info!("配置创建: {} = {:?}", key, entry.new_value());
                        }
                        ChangeKind::Updated => {
                            info!(
                                "配置更新: {}: {:?} -> {:?}",
                                key,
                                entry.old_value(),
                                entry.new_value()
                            );
                        }
                        ChangeKind::Removed => {
                            warn!("配置删除: {} (原值 {:?})", key, entry.old_value());
                        }
                    }
                }
            }
            ConfigEvent::ContextChanged(change) => {
                for source in change.added_sources() {
                    info!("属性源新增: {} at {}", source.name(), change.timestamp());
                }
                for source in change.updated_sources() {
                    info!("属性源更新: {} at {}", source.name(), change.timestamp());
                }
                for source in change.removed_sources() {
                    warn!("属性源删除: {} at {}", source.name(), change.timestamp());
                }
            }
            ConfigEvent::ContextReplaced { version, timestamp } => {
                info!("配置上下文已切换: {} at {}", version, timestamp);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn interested_event_types(&self) -> Vec<ConfigEventType> {
        self.interested_events.clone()
    }
}
