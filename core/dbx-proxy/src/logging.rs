//! Subscriber setup for the proxy's `tracing` events
//!
//! 모든 이벤트는 [`TARGET`] 아래에서 발생한다:
//! - `info`: 스키마 구성, 테이블 등록
//! - `debug`: statement 컴파일, 캐시 비우기, 스토어 열기
//! - `trace`: 행 핸들 생성과 무효화, id 지정 insert
//!
//! A bare level such as `"debug"` is scoped to [`TARGET`] so the host
//! application's own crates keep their filter.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// `tracing` target of every event the proxy emits
pub const TARGET: &str = "dbx_proxy";

/// Filter override read by [`init`], checked before `RUST_LOG`
pub const ENV_LOG: &str = "DBX_PROXY_LOG";

/// Turn `level` into an `EnvFilter` directive.
///
/// `"debug"` becomes `"dbx_proxy=debug"`; anything that already names a
/// target (`"dbx_proxy=trace,rusqlite=warn"`) passes through unchanged.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return format!("{TARGET}=info");
    }
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{TARGET}={level}")
    }
}

/// Install a global subscriber at `info`.
///
/// `DBX_PROXY_LOG` wins over `RUST_LOG`, which wins over the default.
///
/// # Example
/// ```rust
/// dbx_proxy::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    let level = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    init_with_level(&level)
}

/// Install a global subscriber for `level`. A second call is a no-op.
///
/// ```rust
/// dbx_proxy::logging::init_with_level("debug");
/// ```
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter_directive(level)))
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Trace-level subscriber writing through the test harness capture.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter_directive("trace")))
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
