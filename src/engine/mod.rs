// ==========================================
// 托盘结构情景测算 - 引擎层
// ==========================================
// 职责: 实现分摊、评估、再平衡、优化、多收入流汇总规则
// 红线: Engine 不做 IO, 不访问数据库与网络; 纯函数可任意频率调用
// ==========================================

pub mod allocation;
pub mod error;
pub mod evaluator;
pub mod flow_constraint;
pub mod multi_stream;
pub mod optimizer;
pub mod progress;
pub mod rebalance;

// 重导出核心引擎
pub use allocation::{AllocationEngine, AllocationReport, AllocationResult};
pub use error::{AllocationError, FlowConstraintError, OptimiseError};
pub use evaluator::{Objective, ScenarioEvaluator};
pub use flow_constraint::{compute_stock_bounds, compute_variance_pct_max, validate_stock_constraint};
pub use multi_stream::{ConcentrationReport, MultiStreamAggregator};
pub use optimizer::{
    feasibility_band, grid_step, Candidate, ConstrainedOptimizer, GridSearch, OptimiseOutcome,
    OptimiserSettings,
};
pub use progress::{CancellationFlag, NoOpProgress, OptimiseProgress, WatchProgress};
pub use rebalance::TotalsRebalancer;
