// ==========================================
// 托盘结构情景测算 - 核心库
// ==========================================
// 系统定位: 单位经济情景测算 (托盘结构 → 收入/成本/毛利)
// 技术栈: Rust + SQLite + tokio
// 分层: domain → engine → repository / importer / config → api → app
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 业务规则（纯计算）
pub mod engine;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 耗时统计
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AllocationInputs, MultiStreamInputs, PalletField, PalletVolume, PerType, RateTable, RatesSnapshot,
    ScenarioResult, StreamRow, TypeRates, VolumeAssignment, WorkType,
};

// 引擎
pub use engine::{
    AllocationEngine, ConstrainedOptimizer, MultiStreamAggregator, ScenarioEvaluator, TotalsRebalancer,
};

// API
pub use api::{ApiError, ApiResult, ScenarioStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "托盘结构情景测算";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
