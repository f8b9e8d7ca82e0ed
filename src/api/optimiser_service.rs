// ==========================================
// 托盘结构情景测算 - 优化任务服务
// ==========================================
// 职责: 包装约束优化器, 保证同一时刻至多一个优化任务在运行
// 红线: 第二个请求直接拒绝 (OptimisationInProgress), 不排队
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::rates::RateTable;
use crate::domain::volume::VolumeAssignment;
use crate::engine::optimizer::{ConstrainedOptimizer, OptimiseOutcome, OptimiserSettings};
use crate::engine::progress::{CancellationFlag, OptimiseProgress};
use crate::perf::PerfGuard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 运行中标记守卫，drop 时释放
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// ==========================================
// OptimiserService
// ==========================================
pub struct OptimiserService {
    optimizer: ConstrainedOptimizer,
    in_flight: Arc<AtomicBool>,
}

impl OptimiserService {
    pub fn new(settings: OptimiserSettings) -> Self {
        Self {
            optimizer: ConstrainedOptimizer::new(settings),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// 占用运行槽位
    pub fn try_acquire(&self) -> ApiResult<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ApiError::OptimisationInProgress)?;
        Ok(InFlightGuard {
            flag: Arc::clone(&self.in_flight),
        })
    }

    /// 运行一次优化
    pub async fn optimise(
        &self,
        rates: &RateTable,
        current: &VolumeAssignment,
        progress: &dyn OptimiseProgress,
        cancel: &CancellationFlag,
    ) -> ApiResult<OptimiseOutcome> {
        let _guard = self.try_acquire().map_err(|e| {
            tracing::warn!("优化请求被拒绝: 已有任务在运行");
            e
        })?;
        let _perf = PerfGuard::new("optimise_inputs");

        Ok(self.optimizer.optimise(rates, current, progress, cancel).await?)
    }
}

impl Default for OptimiserService {
    fn default() -> Self {
        Self::new(OptimiserSettings::default())
    }
}
