// ==========================================
// 托盘结构情景测算 - 分摊输入模型 (Q1 / Q2)
// ==========================================
// 红线: 每个字段均可缺失; 派生计算所需字段不全时报告"不完整", 不以 0 代替
// 说明: 字段名即持久化/导入时使用的键名 (serde 平铺)
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// AllocationInputs - Q1 汇总输入（40 个字段）
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocationInputs {
    // ===== 运输收入 / 出托量 =====
    pub trans_revenue_consol: Option<f64>,
    pub trans_revenue_groupage: Option<f64>,
    pub trans_revenue_stock: Option<f64>,
    pub pallets_out_consol: Option<f64>,
    pub pallets_out_groupage: Option<f64>,
    pub pallets_out_stock: Option<f64>,

    // ===== 运输成本 =====
    pub trans_direct_cost_consol: Option<f64>,
    pub trans_direct_cost_groupage: Option<f64>,
    pub trans_direct_cost_stock: Option<f64>,
    pub trans_indirect_total: Option<f64>,
    pub trans_indirect_ewt: Option<f64>, // 不参与分摊的 EWT 间接成本
    pub trans_central_total: Option<f64>,
    pub stock_transfer_cost: Option<f64>, // 库存专属调拨成本, 不分摊

    // ===== 进托量 (按站点) =====
    pub pallets_in_consol_site_a: Option<f64>,
    pub pallets_in_consol_site_b: Option<f64>,
    pub pallets_in_groupage_site_a: Option<f64>,
    pub pallets_in_groupage_site_b: Option<f64>,
    pub pallets_in_stock_site_a: Option<f64>,
    pub pallets_in_stock_site_b: Option<f64>,

    // ===== 仓储收入 =====
    pub rhd_revenue: Option<f64>, // RH&D / levy
    pub secondary_storage_revenue: Option<f64>,
    pub breakdown_revenue: Option<f64>, // 拆托/重码

    // ===== 仓储成本: RH&D =====
    pub rhd_direct_site_a: Option<f64>,
    pub rhd_indirect_site_a: Option<f64>,
    pub rhd_central_site_a: Option<f64>,
    pub rhd_direct_site_b: Option<f64>,
    pub rhd_indirect_site_b: Option<f64>,
    pub rhd_central_site_b: Option<f64>,

    // ===== 仓储成本: 二级存储 =====
    pub secondary_direct_site_a: Option<f64>,
    pub secondary_indirect_site_a: Option<f64>,
    pub secondary_central_site_a: Option<f64>,
    pub secondary_direct_site_b: Option<f64>,
    pub secondary_indirect_site_b: Option<f64>,
    pub secondary_central_site_b: Option<f64>,

    // ===== 仓储成本: 拆托/重码 =====
    pub breakdown_direct_site_a: Option<f64>,
    pub breakdown_indirect_site_a: Option<f64>,
    pub breakdown_central_site_a: Option<f64>,
    pub breakdown_direct_site_b: Option<f64>,
    pub breakdown_indirect_site_b: Option<f64>,
    pub breakdown_central_site_b: Option<f64>,
}

// ==========================================
// DirectStreamInput - 直接录入的收入流 (Express / QC)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectStreamInput {
    pub revenue: Option<f64>,
    pub direct_cost: Option<f64>,
    pub indirect_cost: Option<f64>,
    pub central_cost: Option<f64>,
}

// ==========================================
// MultiStreamInputs - Q2/Q3 工作簿输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiStreamInputs {
    pub q1: AllocationInputs,
    pub express: DirectStreamInput,
    pub qc: DirectStreamInput,
}

// ==========================================
// CostTriple - 直接/间接/总部成本三元组
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostTriple {
    pub direct: f64,
    pub indirect: f64,
    pub central: f64,
}

impl CostTriple {
    pub fn new(direct: f64, indirect: f64, central: f64) -> Self {
        Self {
            direct,
            indirect,
            central,
        }
    }

    pub fn total(&self) -> f64 {
        self.direct + self.indirect + self.central
    }
}

impl std::ops::Add for CostTriple {
    type Output = CostTriple;

    fn add(self, rhs: CostTriple) -> CostTriple {
        CostTriple {
            direct: self.direct + rhs.direct,
            indirect: self.indirect + rhs.indirect,
            central: self.central + rhs.central,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_rejected() {
        let raw = r#"{"rhd_revenue": 10.0, "not_a_field": 1.0}"#;
        assert!(serde_json::from_str::<AllocationInputs>(raw).is_err());
    }

    #[test]
    fn test_missing_fields_default_to_unset() {
        let inputs: AllocationInputs = serde_json::from_str(r#"{"rhd_revenue": 10.0}"#).unwrap();
        assert_eq!(inputs.rhd_revenue, Some(10.0));
        assert_eq!(inputs.breakdown_revenue, None);
    }
}
