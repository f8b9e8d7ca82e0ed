// ==========================================
// 托盘结构情景测算 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 输入缺失与不可行是两类不同错误, 不得混用
// ==========================================

use thiserror::Error;

/// 分摊引擎错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    /// 计算所需字段缺失或非有限数值
    #[error("输入不完整: calculation={calculation}, missing=[{}]", missing.join(", "))]
    IncompleteInput {
        calculation: &'static str,
        missing: Vec<String>,
    },

    /// 构造费率表时单托值分母为 0
    #[error("分母为零, 单托值未定义: {quantity}")]
    DegenerateDivision { quantity: String },
}

/// 优化器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimiseError {
    #[error("无可行解: {reason}")]
    Infeasible { reason: String },

    #[error("优化已取消")]
    Cancelled,
}

/// 库存流量约束错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowConstraintError {
    #[error("variance_pct={variance_pct} 超过上限 variance_pct_max={variance_pct_max}")]
    VarianceAboveMax {
        variance_pct: f64,
        variance_pct_max: f64,
    },

    #[error("库存出托 {stock_out} 超出允许区间 [{lower}, {upper}]")]
    StockOutOfBounds { stock_out: u64, lower: u64, upper: u64 },
}
