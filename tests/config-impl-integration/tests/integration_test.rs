//! Centralized integration tests for config-impl
use anyhow::Result;
use config_abstractions::{
    ChangeKind, ConfigEvent, ConfigEventType, ContextChange, FnFilter, FnListener, FrozenSnapshot,
    PropertyFilter, PropertySource, PropertyValue,
};
use config_common::ConfigError;
use config_impl::sources::{DynamicPropertySource, EnvironmentPropertySource, MapPropertySource, TomlPropertySource};
use config_impl::{
    diff, diff_configuration, ConfigEventManager, Configuration, ConfigurationContext,
    ContextHolder, ContextSettings, ConfigurationContextBuilder, DefaultContextChangeListener,
    ThreadFilterContext, ThreadLocalFilter,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

fn map(name: &str, ordinal: i32, entries: &[(&str, &str)]) -> Arc<dyn PropertySource> {
    Arc::new(MapPropertySource::new(name, ordinal, entries.iter().copied()))
}

fn configuration(sources: Vec<Arc<dyn PropertySource>>) -> Result<Configuration> {
    Ok(ConfigurationContext::builder()
        .with_default_converters()
        .add_sources(sources)
        .build()?
        .into_configuration())
}

/// 高序数胜出，与注册顺序无关
#[test]
fn test_override_law() -> Result<()> {
    let a = map("A", 1, &[("k", "a1")]);
    let b = map("B", 2, &[("k", "b")]);
    let forward = configuration(vec![a.clone(), b.clone()])?;
    let backward = configuration(vec![b, a])?;
    assert_eq!(forward.get("k").as_deref(), Some("b"));
    assert_eq!(backward.get("k").as_deref(), Some("b"));
    Ok(())
}

/// 序数相同时后注册者胜出
#[test]
fn test_tie_break_law() -> Result<()> {
    let first = map("first", 5, &[("k", "first")]);
    let second = map("second", 5, &[("k", "second")]);
    assert_eq!(
        configuration(vec![first.clone(), second.clone()])?.get("k").as_deref(),
        Some("second")
    );
    assert_eq!(
        configuration(vec![second, first])?.get("k").as_deref(),
        Some("first")
    );
    Ok(())
}

/// 被过滤器否决的键在单键读取和全量读取中都不存在
#[test]
fn test_filter_veto_law() -> Result<()> {
    let veto: Arc<dyn PropertyFilter> = Arc::new(FnFilter::new("drop-k", |v: PropertyValue| {
        (v.key() != "k").then_some(v)
    }));
    let config: Configuration = ConfigurationContext::builder()
        .add_source(map("s", 0, &[("k", "v"), ("other", "x")]))
        .add_filter(veto)
        .build()?
        .into();
    assert!(config.get("k").is_none());
    assert!(!config.properties().contains_key("k"));
    assert_eq!(config.properties().len(), 1);
    Ok(())
}

/// 默认转换器可以还原格式化后的值
#[test]
fn test_conversion_round_trip() -> Result<()> {
    let config = configuration(vec![map(
        "s",
        0,
        &[
            ("i", i64::MIN.to_string().as_str()),
            ("u", u32::MAX.to_string().as_str()),
            ("f", 2.5f64.to_string().as_str()),
            ("b", false.to_string().as_str()),
            ("c", 'z'.to_string().as_str()),
        ],
    )])?;
    assert_eq!(config.get_typed::<i64>("i")?, Some(i64::MIN));
    assert_eq!(config.get_typed::<u32>("u")?, Some(u32::MAX));
    assert_eq!(config.get_typed::<f64>("f")?, Some(2.5));
    assert_eq!(config.get_typed::<bool>("b")?, Some(false));
    assert_eq!(config.get_typed::<char>("c")?, Some('z'));
    Ok(())
}

/// 转换失败的错误携带键、原始值和目标类型
#[test]
fn test_conversion_failure_is_distinct_from_absence() -> Result<()> {
    let config = configuration(vec![map("s", 0, &[("port", "eighty")])])?;
    assert_eq!(config.get_typed::<u16>("missing")?, None);
    match config.get_typed::<u16>("port") {
        Err(ConfigError::ConversionFailed { key, value, target_type }) => {
            assert_eq!(key, "port");
            assert_eq!(value, "eighty");
            assert_eq!(target_type, "u16");
        }
        other => panic!("unexpected: {:?}", other),
    }
    Ok(())
}

/// 相同快照的差异为空，反向差异对称
#[test]
fn test_diff_idempotence_and_symmetry() {
    let a = Arc::new(FrozenSnapshot::from_properties(
        "a",
        0,
        [("x", "1"), ("y", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    ));
    let b = Arc::new(FrozenSnapshot::from_properties(
        "b",
        0,
        [("y", "2"), ("z", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    ));
    assert!(diff(&a, &a).is_empty());
    let forward = diff(&a, &b);
    let backward = diff(&b, &a);
    assert_eq!(forward.added_count(), backward.removed_count());
    assert_eq!(forward.removed_count(), backward.added_count());
    assert_eq!(forward.updated_count(), backward.updated_count());
}

/// 快照之后属性源的修改不会反映到快照中
#[test]
fn test_snapshot_immutability() {
    let dynamic = Arc::new(DynamicPropertySource::new("dyn", 0));
    dynamic.set("a", "1");
    let as_source: Arc<dyn PropertySource> = dynamic.clone();
    let snapshot = FrozenSnapshot::of(&as_source);
    dynamic.set("a", "2");
    dynamic.set("b", "3");
    assert_eq!(snapshot.value("a"), Some("1"));
    assert_eq!(snapshot.len(), 1);

    let again: Arc<dyn PropertySource> = snapshot.clone();
    assert!(Arc::ptr_eq(&snapshot, &FrozenSnapshot::of(&again)));
}

/// 文件 + 环境变量场景：移除环境变量属性源后只有一个更新条目
#[test]
fn test_file_and_environment_scenario() -> Result<()> {
    let file = map("file", 100, &[("a", "1"), ("b", "2")]);
    let env = map("env", 200, &[("a", "9")]);
    let holder = Arc::new(ContextHolder::new(
        ConfigurationContext::builder()
            .add_source(file)
            .add_source(env.clone())
            .build()?,
    ));

    let before = holder.configuration();
    assert_eq!(
        before.properties(),
        [("a", "9"), ("b", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>()
    );
    let before_snapshot = Arc::new(before.snapshot());

    let listener = DefaultContextChangeListener::with_holder(Arc::clone(&holder));
    listener.apply(&ContextChange::builder().removed(env).build())?;

    let after = holder.configuration();
    assert_eq!(after.get("a").as_deref(), Some("1"));
    assert_eq!(after.get("b").as_deref(), Some("2"));

    let change = diff_configuration(&before_snapshot, &after.snapshot());
    assert_eq!(change.len(), 1);
    let entry = change.entry("a").expect("a 应该被更新");
    assert_eq!(entry.kind(), ChangeKind::Updated);
    assert_eq!((entry.old_value(), entry.new_value()), (Some("9"), Some("1")));
    Ok(())
}

/// 发布过程中并发读取只会看到完整的旧上下文或新上下文
#[test]
fn test_concurrent_reads_during_publication() -> Result<()> {
    let context_of = |value: &str| -> Result<ConfigurationContext> {
        Ok(ConfigurationContext::builder()
            .add_source(map("low", 1, &[("x", value), ("y", value)]))
            .build()?)
    };
    let holder = Arc::new(ContextHolder::new(context_of("old")?));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let holder = Arc::clone(&holder);
            thread::spawn(move || {
                for _ in 0..500 {
                    let properties = holder.configuration().properties();
                    assert_eq!(properties.get("x"), properties.get("y"));
                }
            })
        })
        .collect();

    for round in 0..50 {
        holder.publish(context_of(&format!("v{}", round))?);
    }
    for reader in readers {
        reader.join().expect("读取线程不应该失败");
    }
    Ok(())
}

/// 并发读取动态属性源
#[test]
fn test_concurrent_reads_of_dynamic_source() -> Result<()> {
    let dynamic = Arc::new(DynamicPropertySource::new("dyn", 0));
    let as_source: Arc<dyn PropertySource> = dynamic.clone();
    let config = configuration(vec![as_source])?;

    let writer = {
        let dynamic = Arc::clone(&dynamic);
        thread::spawn(move || {
            for i in 0..200 {
                dynamic.set("n", i.to_string());
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let config = config.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    if let Some(value) = config.get_typed::<u32>("n").expect("值始终可以转换") {
                        assert!(value < 200);
                    }
                }
            })
        })
        .collect();
    writer.join().expect("写入线程不应该失败");
    for reader in readers {
        reader.join().expect("读取线程不应该失败");
    }
    assert_eq!(config.get_typed::<u32>("n")?, Some(199));
    Ok(())
}

/// 事件管理器隔离失败的监听器，并在上下文替换后发出通知
#[test]
fn test_event_manager_end_to_end() -> Result<()> {
    let manager = Arc::new(ConfigEventManager::new());
    let holder = Arc::new(ContextHolder::new(
        ConfigurationContext::builder()
            .add_source(map("file", 100, &[("a", "1")]))
            .build()?,
    ));
    let seen = Arc::new(Mutex::new(Vec::new()));

    manager.add_listener(Arc::new(FnListener::new("broken", |_e: &ConfigEvent| {
        Err(ConfigError::reconfiguration_failed("always"))
    })));
    manager.add_listener(Arc::new(
        DefaultContextChangeListener::with_holder(Arc::clone(&holder)).with_event_manager(&manager),
    ));
    let sink = Arc::clone(&seen);
    manager.add_listener(Arc::new(FnListener::new("sink", move |event: &ConfigEvent| {
        sink.lock().push(event.event_type());
        Ok(())
    })));

    let change = ContextChange::builder()
        .added(map("env", 200, &[("a", "2")]))
        .build();
    let report = manager.fire_event(&ConfigEvent::from(change));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].listener, "broken");
    assert_eq!(report.delivered, 2);
    assert_eq!(holder.configuration().get("a").as_deref(), Some("2"));
    assert!(seen.lock().contains(&ConfigEventType::ContextReplaced));
    assert!(seen.lock().contains(&ConfigEventType::ContextChanged));
    Ok(())
}

/// 线程级过滤器只影响注册它的线程
#[test]
fn test_thread_filters_per_thread() -> Result<()> {
    let config: Configuration = ConfigurationContext::builder()
        .add_source(map("s", 0, &[("greeting", "hello")]))
        .add_filter(Arc::new(ThreadLocalFilter))
        .build()?
        .into();

    let shout = config.clone();
    let shouted = thread::spawn(move || {
        ThreadFilterContext::add_filter(Arc::new(FnFilter::new("shout", |v: PropertyValue| {
            let upper = v.value().map(str::to_uppercase)?;
            Some(v.with_value(upper))
        })));
        shout.get("greeting")
    })
    .join()
    .expect("线程不应该失败");

    assert_eq!(shouted.as_deref(), Some("HELLO"));
    assert_eq!(config.get("greeting").as_deref(), Some("hello"));
    Ok(())
}

#[derive(Debug, Deserialize, PartialEq)]
struct Database {
    url: String,
    pool: Pool,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Pool {
    size: u32,
    enabled: bool,
}

/// 引导设置 + TOML 文件 + 环境变量 + 类型化绑定
#[test]
fn test_settings_bootstrap_and_binding() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("db.toml");
    std::fs::write(
        &path,
        "[database]\nurl = \"postgres://localhost\"\n\n[database.pool]\nsize = 4\nenabled = true\n",
    )?;
    let settings = ContextSettings::from_toml_str(&format!(
        "[[files]]\npath = '{}'\nname = \"db\"\n",
        path.display()
    ))?;
    let env = EnvironmentPropertySource::from_vars("APP", "_", [("APP_DATABASE_POOL_SIZE", "32")]);

    let config = ConfigurationContextBuilder::from_settings(&settings)?
        .add_source(Arc::new(env))
        .build()?
        .into_configuration();

    let database: Database = config.bind("database")?;
    assert_eq!(
        database,
        Database {
            url: "postgres://localhost".to_string(),
            pool: Pool {
                size: 32,
                enabled: true
            },
        }
    );
    assert_eq!(
        config.get_property_value("database.pool.size").map(|v| v.source().to_string()),
        Some("environment:APP".to_string())
    );
    Ok(())
}

/// TOML 属性源通过序数覆盖键调整优先级
#[test]
fn test_ordinal_override_from_document() -> Result<()> {
    let boosted: Arc<dyn PropertySource> = Arc::new(TomlPropertySource::from_toml_str(
        "boosted",
        "strata.ordinal = 1000\nk = \"boosted\"\n",
    )?);
    let config = configuration(vec![boosted, map("env", 300, &[("k", "env")])])?;
    assert_eq!(config.get("k").as_deref(), Some("boosted"));
    Ok(())
}
