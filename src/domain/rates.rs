// ==========================================
// 托盘结构情景测算 - 费率领域模型
// ==========================================
// 口径: 单托收入/成本为口径 (scope) 内的固定常量
// 红线: 一次测算期间费率表不可变
// ==========================================

use crate::domain::types::PerType;
use serde::{Deserialize, Serialize};

// ==========================================
// TypeRates - 单作业类型单托费率
// ==========================================
// 字段名与费率接口保持一致 (wh_rev_per_in_pallet 等)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeRates {
    #[serde(alias = "wh_rev_per_in")]
    pub wh_rev_per_in_pallet: f64, // 仓储收入 / 进托
    #[serde(alias = "wh_cost_per_in")]
    pub wh_cost_per_in_pallet: f64, // 仓储成本 / 进托
    #[serde(alias = "trans_rev_per_out")]
    pub trans_rev_per_out_pallet: f64, // 运输收入 / 出托
    #[serde(alias = "trans_cost_per_out")]
    pub trans_cost_per_out_pallet: f64, // 运输成本 / 出托
}

impl TypeRates {
    pub fn new(wh_rev: f64, wh_cost: f64, trans_rev: f64, trans_cost: f64) -> Self {
        Self {
            wh_rev_per_in_pallet: wh_rev,
            wh_cost_per_in_pallet: wh_cost,
            trans_rev_per_out_pallet: trans_rev,
            trans_cost_per_out_pallet: trans_cost,
        }
    }

    /// 仓储单托毛利（静态）
    pub fn wh_margin_per_in_pallet(&self) -> f64 {
        self.wh_rev_per_in_pallet - self.wh_cost_per_in_pallet
    }

    /// 运输单托毛利（静态）
    pub fn trans_margin_per_out_pallet(&self) -> f64 {
        self.trans_rev_per_out_pallet - self.trans_cost_per_out_pallet
    }

    /// 所有费率均为有限非负数
    pub fn is_valid(&self) -> bool {
        [
            self.wh_rev_per_in_pallet,
            self.wh_cost_per_in_pallet,
            self.trans_rev_per_out_pallet,
            self.trans_cost_per_out_pallet,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// 费率表（三个作业类型）
pub type RateTable = PerType<TypeRates>;

// ==========================================
// ScopeItem - 口径列表项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeItem {
    pub id: String,
    pub label: String,
}

// ==========================================
// RatesSnapshot - 某口径下的费率快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesSnapshot {
    pub scope_id: String,
    pub scope_label: String,
    pub types: RateTable,
}

// ==========================================
// RatesView - 带静态毛利的费率视图（对外展示）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeRatesView {
    #[serde(flatten)]
    pub rates: TypeRates,
    pub wh_margin_per_in_pallet: f64,
    pub trans_margin_per_out_pallet: f64,
}

impl From<TypeRates> for TypeRatesView {
    fn from(rates: TypeRates) -> Self {
        Self {
            rates,
            wh_margin_per_in_pallet: rates.wh_margin_per_in_pallet(),
            trans_margin_per_out_pallet: rates.trans_margin_per_out_pallet(),
        }
    }
}

impl RatesSnapshot {
    pub fn view(&self) -> PerType<TypeRatesView> {
        self.types.map(|_, r| TypeRatesView::from(*r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_accept_api_payload_with_margins() {
        let raw = r#"{
            "scope_id": "p1_p9_avg",
            "scope_label": "P1-P9 average",
            "types": {
                "consolidation": {"wh_rev_per_in_pallet": 0.0, "wh_cost_per_in_pallet": 1.5,
                    "trans_rev_per_out_pallet": 20.0, "trans_cost_per_out_pallet": 14.0,
                    "wh_margin_per_in_pallet": -1.5, "trans_margin_per_out_pallet": 6.0},
                "groupage": {"wh_rev_per_in_pallet": 8.0, "wh_cost_per_in_pallet": 5.0,
                    "trans_rev_per_out_pallet": 16.0, "trans_cost_per_out_pallet": 10.0},
                "stock": {"wh_rev_per_in_pallet": 12.0, "wh_cost_per_in_pallet": 7.0,
                    "trans_rev_per_out_pallet": 18.0, "trans_cost_per_out_pallet": 11.0}
            }
        }"#;
        let snapshot: RatesSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.types.groupage.wh_rev_per_in_pallet, 8.0);
        assert_eq!(snapshot.view().consolidation.trans_margin_per_out_pallet, 6.0);
        assert!(snapshot.types.stock.is_valid());
    }
}
