// ==========================================
// 托盘结构情景测算 - 情景评估器
// ==========================================
// 规则:
// - 仓储收入/成本 = 进托 × 单托费率
// - 运输收入/成本 = 出托 × 单托费率
// - 混合单托毛利 = 毛利 / (进托 + 出托)，分母为 0 时未定义
// - 总毛利率 = 总毛利 / 总收入，收入非正时为 0
// 红线: 纯函数, 无副作用, 可任意频率调用
// ==========================================

use crate::domain::rates::{RateTable, RatesSnapshot};
use crate::domain::scenario::{ScenarioResult, ScenarioTotals, ScenarioTypeResult};
use crate::domain::types::WorkType;
use crate::domain::volume::VolumeAssignment;

/// 优化目标（仅汇总，避免构造完整结果）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub total_revenue: f64,
    pub total_margin: f64,
}

impl Objective {
    /// 收入为正时的毛利率
    pub fn margin_pct(&self) -> Option<f64> {
        if self.total_revenue > 0.0 {
            Some(self.total_margin / self.total_revenue)
        } else {
            None
        }
    }
}

// ==========================================
// ScenarioEvaluator - 情景评估器
// ==========================================
pub struct ScenarioEvaluator {
    // 无状态引擎
}

impl ScenarioEvaluator {
    pub fn new() -> Self {
        Self {}
    }

    /// 完整评估
    pub fn evaluate(&self, rates: &RateTable, assignment: &VolumeAssignment) -> ScenarioResult {
        let per_type = rates.map(|wt, rate| {
            let volume = assignment[wt];
            let pallets_in = volume.pallets_in as f64;
            let pallets_out = volume.pallets_out as f64;

            let wh_revenue = pallets_in * rate.wh_rev_per_in_pallet;
            let wh_cost = pallets_in * rate.wh_cost_per_in_pallet;
            let trans_revenue = pallets_out * rate.trans_rev_per_out_pallet;
            let trans_cost = pallets_out * rate.trans_cost_per_out_pallet;

            let total_revenue = wh_revenue + trans_revenue;
            let total_cost = wh_cost + trans_cost;
            let total_margin = total_revenue - total_cost;

            let pallets_total = volume.pallets_in + volume.pallets_out;
            let margin_per_pallet = if pallets_total > 0 {
                Some(total_margin / pallets_total as f64)
            } else {
                None
            };

            ScenarioTypeResult {
                pallets_in: volume.pallets_in,
                pallets_out: volume.pallets_out,
                wh_revenue,
                wh_cost,
                wh_margin: wh_revenue - wh_cost,
                trans_revenue,
                trans_cost,
                trans_margin: trans_revenue - trans_cost,
                total_revenue,
                total_cost,
                total_margin,
                wh_margin_per_in_pallet: rate.wh_margin_per_in_pallet(),
                trans_margin_per_out_pallet: rate.trans_margin_per_out_pallet(),
                margin_per_pallet,
            }
        });

        let total_revenue: f64 = per_type.iter().map(|(_, r)| r.total_revenue).sum();
        let total_cost: f64 = per_type.iter().map(|(_, r)| r.total_cost).sum();
        let total_margin: f64 = per_type.iter().map(|(_, r)| r.total_margin).sum();
        let overall_margin_pct = if total_revenue > 0.0 {
            total_margin / total_revenue
        } else {
            0.0
        };

        ScenarioResult {
            scope_id: String::new(),
            scope_label: String::new(),
            per_type,
            totals: ScenarioTotals {
                total_revenue,
                total_cost,
                total_margin,
                overall_margin_pct,
            },
        }
    }

    /// 带口径信息的评估
    pub fn evaluate_snapshot(&self, snapshot: &RatesSnapshot, assignment: &VolumeAssignment) -> ScenarioResult {
        let mut result = self.evaluate(&snapshot.types, assignment);
        result.scope_id = snapshot.scope_id.clone();
        result.scope_label = snapshot.scope_label.clone();
        result
    }

    /// 优化目标（与 evaluate 同口径的汇总值）
    pub fn objective(&self, rates: &RateTable, assignment: &VolumeAssignment) -> Objective {
        let mut total_revenue = 0.0;
        let mut total_cost = 0.0;
        for wt in WorkType::ALL {
            let rate = &rates[wt];
            let pallets_in = assignment[wt].pallets_in as f64;
            let pallets_out = assignment[wt].pallets_out as f64;
            total_revenue += pallets_in * rate.wh_rev_per_in_pallet + pallets_out * rate.trans_rev_per_out_pallet;
            total_cost += pallets_in * rate.wh_cost_per_in_pallet + pallets_out * rate.trans_cost_per_out_pallet;
        }
        Objective {
            total_revenue,
            total_margin: total_revenue - total_cost,
        }
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for ScenarioEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
