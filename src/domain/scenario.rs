// ==========================================
// 托盘结构情景测算 - 情景结果领域模型
// ==========================================
// 生命周期: 派生数据, 托盘量或费率变化时整体重算, 不做局部更新
// ==========================================

use crate::domain::types::PerType;
use serde::{Deserialize, Serialize};

// ==========================================
// ScenarioTypeResult - 单作业类型测算结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTypeResult {
    pub pallets_in: u64,
    pub pallets_out: u64,

    // ===== 仓储 (按进托) =====
    pub wh_revenue: f64,
    pub wh_cost: f64,
    pub wh_margin: f64,

    // ===== 运输 (按出托) =====
    pub trans_revenue: f64,
    pub trans_cost: f64,
    pub trans_margin: f64,

    // ===== 合计 =====
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_margin: f64,

    // ===== 单托指标 =====
    pub wh_margin_per_in_pallet: f64,     // 静态
    pub trans_margin_per_out_pallet: f64, // 静态
    /// 混合单托毛利 = total_margin / (进托 + 出托)，分母为 0 时为 None
    #[serde(default, alias = "blended_margin_per_total_pallets")]
    pub margin_per_pallet: Option<f64>,
}

// ==========================================
// ScenarioTotals - 汇总
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioTotals {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_margin: f64,
    /// total_margin / total_revenue，收入非正时为 0
    pub overall_margin_pct: f64,
}

// ==========================================
// ScenarioResult - 情景测算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    #[serde(default)]
    pub scope_id: String,
    #[serde(default)]
    pub scope_label: String,
    pub per_type: PerType<ScenarioTypeResult>,
    pub totals: ScenarioTotals,
}
