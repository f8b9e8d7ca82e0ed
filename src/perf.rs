// ==========================================
// 托盘结构情景测算 - 耗时统计
// ==========================================
// PerfGuard 在 drop 时记录 elapsed_ms; 超过慢操作阈值时升级为 warn
// 阈值: PALLET_MIX_SLOW_OP_MS (默认 debug 500ms / release 2000ms)
// ==========================================

use std::time::Instant;

fn slow_threshold_ms() -> u64 {
    std::env::var("PALLET_MIX_SLOW_OP_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 500 } else { 2_000 })
}

/// 性能统计 Guard
///
/// 使用方式：
/// ```ignore
/// let _perf = pallet_mix_modeller::perf::PerfGuard::new("optimise_inputs");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        if elapsed_ms >= slow_threshold_ms() {
            tracing::warn!(target: "perf", op = self.op, elapsed_ms, "slow op");
        } else {
            tracing::info!(target: "perf", op = self.op, elapsed_ms, "done");
        }
    }
}
