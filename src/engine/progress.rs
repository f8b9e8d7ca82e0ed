// ==========================================
// 托盘结构情景测算 - 优化进度与取消
// ==========================================
// 职责: 定义进度上报 trait 与协作式取消标记
// 说明: 引擎只依赖 trait, 宿主 (CLI / 前端桥接) 提供实现
// ==========================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

// ==========================================
// 进度上报 Trait
// ==========================================

/// 优化进度上报者
///
/// `fraction` 取值 [0.0, 1.0]，由已处理外层迭代数 / 预估总迭代数得出
pub trait OptimiseProgress: Send + Sync {
    fn report(&self, fraction: f64);
}

/// 空操作上报者（单元测试 / 阻塞调用）
#[derive(Debug, Clone, Default)]
pub struct NoOpProgress;

impl OptimiseProgress for NoOpProgress {
    fn report(&self, fraction: f64) {
        tracing::trace!(fraction, "NoOpProgress: 跳过进度上报");
    }
}

/// 基于 watch 通道的上报者，接收端只保留最新进度
#[derive(Debug)]
pub struct WatchProgress {
    sender: watch::Sender<f64>,
}

impl WatchProgress {
    pub fn channel() -> (Self, watch::Receiver<f64>) {
        let (sender, receiver) = watch::channel(0.0);
        (Self { sender }, receiver)
    }
}

impl OptimiseProgress for WatchProgress {
    fn report(&self, fraction: f64) {
        // 接收端已关闭时忽略
        let _ = self.sender.send(fraction.clamp(0.0, 1.0));
    }
}

// ==========================================
// CancellationFlag - 协作式取消
// ==========================================
// 只在外层迭代之间的检查点生效
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_flag_shared_between_clones() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_watch_progress_keeps_latest_value() {
        let (progress, receiver) = WatchProgress::channel();
        progress.report(0.25);
        progress.report(1.5);
        assert_eq!(*receiver.borrow(), 1.0);
    }
}
