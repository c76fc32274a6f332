extern crate classloader;

mod runtime_util;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use classloader::runner::api::Runtime;
use classloader::runner::config::RuntimeConfig;
use classloader::runner::ds::class::ClassDef;
use classloader::runner::ds::error::LoadError;
use classloader::runner::ds::frame::Routine;
use classloader::runner::ds::type_name::TypeName;
use classloader::runner::ds::value::Value;
use classloader::runner::intercept::ErrorCode;
use classloader::runner::loader::native::NativeUnits;
use classloader::runner::loader::UnitSource;
use runtime_util::{captured, expect_diagnostic, runtime_with, FIXTURES};

fn t(name: &str) -> TypeName {
    TypeName::parse(name).unwrap()
}

/// A unit defining `Slow`, which counts its loads and takes a while to load.
fn slow_unit(loads: Arc<AtomicUsize>) -> NativeUnits {
    NativeUnits::new().unit(t("Slow"), move |ctx| {
        loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        ctx.define_class(
            ClassDef::new(t("Slow")).add_method("ping", |_ctx, _this, _args| Ok(Value::from("pong"))),
        );
        Ok(())
    })
}

// ── Native loading ───────────────────────────────────────────────────

#[test]
fn test_native_unit_loads_on_first_call() {
    let loads = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with(Box::new(slow_unit(Arc::clone(&loads))));
    let mut ctx = runtime.context();

    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.call_class("Slow", "ping", vec![]).unwrap(), Value::from("pong"));
    assert_eq!(ctx.call_class("Slow", "ping", vec![]).unwrap(), Value::from("pong"));
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    let units = runtime.loaded_units();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].loader, "native");
    assert_eq!(units[0].source, UnitSource::Native);
}

#[test]
fn test_native_class_requires_its_parents() {
    let units = NativeUnits::new()
        .class(t("Animal"), || {
            ClassDef::new(t("Animal")).add_method("sound", |_ctx, _this, _args| Ok(Value::from("...")))
        })
        .class(t("Dog"), || {
            ClassDef::new(t("Dog"))
                .extends(t("Animal"))
                .add_method("name", |_ctx, _this, _args| Ok(Value::from("dog")))
        });
    let runtime = runtime_with(Box::new(units));
    let mut ctx = runtime.context();

    assert_eq!(ctx.call_class("Dog", "sound", vec![]).unwrap(), Value::from("..."));
    assert!(runtime.classes().has_class(&t("Animal")));
}

#[test]
fn test_native_init_failure_is_a_load_failure() {
    let units = NativeUnits::new().unit(t("Flaky"), |_ctx| {
        Err(LoadError::native("database unavailable at init.rs line 3."))
    });
    let runtime = runtime_with(Box::new(units));
    let mut ctx = runtime.context();

    let d = expect_diagnostic(ctx.call_class("Flaky", "new", vec![]), ErrorCode::LoadFailed);
    assert_eq!(d.cause(), Some("database unavailable"));
}

#[test]
fn test_native_method_calls_are_framed() {
    let units = NativeUnits::new().class(t("Relay"), || {
        ClassDef::new(t("Relay")).add_method("forward", |ctx, _this, _args| {
            ctx.call_class("Nowhere", "go", vec![])
        })
    });
    let runtime = runtime_with(Box::new(units));
    let mut ctx = runtime.context();

    let d = expect_diagnostic(ctx.call_class("Relay", "forward", vec![]), ErrorCode::LoadFailed);
    let frames = d.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].routine, Routine::Eval);
    assert_eq!(
        frames[1].routine,
        Routine::Method {
            class: t("Relay"),
            method: "forward".to_string()
        }
    );
    assert!(frames[1].native);
    assert!(frames[1].pos.file.ends_with("test_native_units.rs"));
}

#[test]
fn test_native_units_and_search_path_combined() {
    let units = NativeUnits::new().class(t("Clock"), || {
        ClassDef::new(t("Clock")).add_method("now", |_ctx, _this, _args| Ok(Value::Int(42)))
    });
    let config = RuntimeConfig::new().with_env_path(false).with_search_dir(FIXTURES);
    let runtime = Runtime::builder().config(config).loader(Box::new(units)).build();
    let (mut ctx, out) = captured(&runtime);

    ctx.run_script("print Clock->now ~ \" \" ~ Present->new(\"p\")->name;", "main.script")
        .unwrap();
    assert_eq!(out.contents(), "42 p\n");

    let d = expect_diagnostic(ctx.call_class("Missing", "new", vec![]), ErrorCode::LoadFailed);
    assert_eq!(
        d.cause(),
        Some("Can't locate Missing.unit in search path (search path contains: (native) tests/fixtures/lib)")
    );
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn test_concurrent_first_touch_loads_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let runtime = runtime_with(Box::new(slow_unit(Arc::clone(&loads))));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || {
                let mut ctx = runtime.context();
                ctx.call_class("Slow", "ping", vec![])
                    .map(|v| v.to_string())
                    .map_err(|e| e.to_string())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok("pong".to_string()));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(runtime.stats().loads, 1);
}

#[test]
fn test_concurrent_failures_stay_per_type() {
    let runtime = runtime_util::fixture_runtime();

    let handles: Vec<_> = ["A", "B", "Missing", "Present"]
        .iter()
        .map(|name| {
            let runtime = Arc::clone(&runtime);
            let name = name.to_string();
            thread::spawn(move || {
                let mut ctx = runtime.context();
                ctx.call_class(&name, "xxx", vec![])
                    .err()
                    .and_then(|e| e.diagnostic().map(|d| d.code()))
            })
        })
        .collect();

    let codes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        codes,
        vec![
            Some(ErrorCode::MethodMissing),
            Some(ErrorCode::MethodMissing),
            Some(ErrorCode::LoadFailed),
            Some(ErrorCode::MethodMissing),
        ]
    );
}

#[test]
fn test_half_loaded_class_is_not_callable_from_other_threads() {
    let started = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&started);
    let units = NativeUnits::new().unit(t("Half"), move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.define_class(
            ClassDef::new(t("Half")).add_method("ping", |_ctx, _this, _args| Ok(Value::from("pong"))),
        );
        // The defining chain sees its own class while loading.
        assert!(ctx.can(&t("Half"), "ping"));
        thread::sleep(Duration::from_millis(200));
        Err(LoadError::native("gave up"))
    });
    let runtime = runtime_with(Box::new(units));

    let first = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || {
            let mut ctx = runtime.context();
            ctx.call_class("Half", "ping", vec![])
                .err()
                .and_then(|e| e.diagnostic().map(|d| d.code()))
        })
    };
    while started.load(Ordering::SeqCst) == 0 {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!runtime.classes().can(&t("Half"), "ping"));

    let mut ctx = runtime.context();
    let d = expect_diagnostic(ctx.call_class("Half", "ping", vec![]), ErrorCode::LoadFailed);
    assert_eq!(d.cause(), Some("gave up"));

    assert_eq!(first.join().unwrap(), Some(ErrorCode::LoadFailed));
    // The second caller waited for the first load, then tried again itself.
    assert_eq!(started.load(Ordering::SeqCst), 2);
    let stats = runtime.stats();
    assert_eq!((stats.loads, stats.load_failures), (0, 2));
    assert!(runtime.guards().is_empty());
}
