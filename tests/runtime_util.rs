#![allow(dead_code)]

extern crate classloader;

use std::sync::Arc;

use classloader::runner::api::{CapturedOutput, EvalContext, Runtime};
use classloader::runner::config::RuntimeConfig;
use classloader::runner::ds::error::RuntimeError;
use classloader::runner::intercept::{Diagnostic, ErrorCode};
use classloader::runner::loader::ModuleLoader;

pub const FIXTURES: &str = "tests/fixtures/lib";

/// Config pointing at the fixture units only, ignoring `CLASSLOADER_PATH`.
pub fn fixture_config() -> RuntimeConfig {
    RuntimeConfig::new()
        .with_env_path(false)
        .with_search_dir(FIXTURES)
}

pub fn fixture_runtime() -> Arc<Runtime> {
    Runtime::from_config(fixture_config())
}

pub fn runtime_with(loader: Box<dyn ModuleLoader>) -> Arc<Runtime> {
    Runtime::builder()
        .config(RuntimeConfig::new().with_env_path(false))
        .loader(loader)
        .build()
}

/// A context whose `print` output is captured.
pub fn captured(runtime: &Arc<Runtime>) -> (EvalContext, CapturedOutput) {
    let out = CapturedOutput::new();
    let ctx = runtime.context().with_output(Box::new(out.clone()));
    (ctx, out)
}

/// Unwrap a classloader diagnostic, failing on any other outcome.
pub fn expect_diagnostic<T: std::fmt::Debug>(
    result: Result<T, RuntimeError>,
    code: ErrorCode,
) -> Diagnostic {
    match result {
        Err(RuntimeError::ClassLoader(d)) => {
            assert_eq!(d.code(), code, "unexpected diagnostic:\n{}", d);
            *d
        }
        Err(other) => panic!("expected {}, got error: {}", code, other),
        Ok(v) => panic!("expected {}, got value: {:?}", code, v),
    }
}
