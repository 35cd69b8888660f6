use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;

const PERF_UNSET: u8 = 0;
const PERF_ON: u8 = 1;
const PERF_OFF: u8 = 2;

static PERF_STATE: AtomicU8 = AtomicU8::new(PERF_UNSET);
static PERF_FORCED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static PERF_DEPTH: Cell<u32> = Cell::new(0);
    static EVAL_COUNT: Cell<u64> = Cell::new(0);
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 性能日志开关
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭（可通过环境变量开启）
/// - `LAND_ELIGIBILITY_PERF=1` 强制开启
pub fn perf_enabled() -> bool {
    if PERF_FORCED.load(Ordering::Relaxed) {
        return true;
    }
    match PERF_STATE.load(Ordering::Relaxed) {
        PERF_ON => true,
        PERF_OFF => false,
        _ => {
            let enabled = match std::env::var("LAND_ELIGIBILITY_PERF") {
                Ok(v) => is_true(&v),
                Err(_) => cfg!(debug_assertions),
            };
            PERF_STATE.store(if enabled { PERF_ON } else { PERF_OFF }, Ordering::Relaxed);
            enabled
        }
    }
}

/// 强制开启性能日志（测试用）
pub fn force_enable() {
    PERF_FORCED.store(true, Ordering::Relaxed);
}

/// 记录一次空间引擎调用（计入当前 Guard 的 engine_calls）
pub fn count_engine_call() {
    let active = PERF_DEPTH.with(|d| d.get() > 0);
    if active {
        EVAL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 性能统计 Guard：记录 elapsed_ms + 空间引擎调用数
///
/// 使用方式：
/// ```ignore
/// let _perf = land_eligibility::perf::PerfGuard::new("exclude_criterion").with_detail("forests");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    detail: Option<String>,
    start: Instant,
    calls_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        let calls_start = EVAL_COUNT.with(|c| c.get());
        Self {
            op,
            detail: None,
            start: Instant::now(),
            calls_start,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        if perf_enabled() {
            let elapsed_ms = self.start.elapsed().as_millis() as u64;
            let calls_end = EVAL_COUNT.with(|c| c.get());
            let engine_calls = calls_end.saturating_sub(self.calls_start);

            tracing::info!(
                target: "perf",
                op = self.op,
                detail = self.detail.as_deref().unwrap_or(""),
                elapsed_ms,
                engine_calls,
                "done"
            );
        }

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
