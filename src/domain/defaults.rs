// ==========================================
// 托盘结构情景测算 - 种子默认值
// ==========================================
// 用途: 本地快照缺失或解析失败时的兜底输入
// ==========================================

use crate::domain::allocation::{AllocationInputs, DirectStreamInput, MultiStreamInputs};
use crate::domain::types::PerType;
use crate::domain::volume::{PalletVolume, VolumeAssignment};

/// 默认口径
pub const DEFAULT_SCOPE_ID: &str = "p1_p9_avg";

/// 当前实际托盘量（情景起点）
pub fn current_volumes() -> VolumeAssignment {
    PerType::new(
        PalletVolume::new(35_448, 49_940),
        PalletVolume::new(48_438, 51_333),
        PalletVolume::new(103_585, 90_453),
    )
}

/// Q1 种子输入
pub fn seed_allocation_inputs() -> AllocationInputs {
    AllocationInputs {
        trans_revenue_consol: Some(1_048_740.0),
        trans_revenue_groupage: Some(949_660.0),
        trans_revenue_stock: Some(1_537_700.0),
        pallets_out_consol: Some(49_940.0),
        pallets_out_groupage: Some(51_333.0),
        pallets_out_stock: Some(90_453.0),

        trans_direct_cost_consol: Some(720_000.0),
        trans_direct_cost_groupage: Some(655_000.0),
        trans_direct_cost_stock: Some(1_010_000.0),
        trans_indirect_total: Some(410_000.0),
        trans_indirect_ewt: Some(35_000.0),
        trans_central_total: Some(265_000.0),
        stock_transfer_cost: Some(120_000.0),

        pallets_in_consol_site_a: Some(20_000.0),
        pallets_in_consol_site_b: Some(15_448.0),
        pallets_in_groupage_site_a: Some(30_000.0),
        pallets_in_groupage_site_b: Some(18_438.0),
        pallets_in_stock_site_a: Some(60_000.0),
        pallets_in_stock_site_b: Some(43_585.0),

        rhd_revenue: Some(1_450_000.0),
        secondary_storage_revenue: Some(380_000.0),
        breakdown_revenue: Some(95_000.0),

        rhd_direct_site_a: Some(520_000.0),
        rhd_indirect_site_a: Some(140_000.0),
        rhd_central_site_a: Some(90_000.0),
        rhd_direct_site_b: Some(360_000.0),
        rhd_indirect_site_b: Some(95_000.0),
        rhd_central_site_b: Some(60_000.0),

        secondary_direct_site_a: Some(150_000.0),
        secondary_indirect_site_a: Some(40_000.0),
        secondary_central_site_a: Some(25_000.0),
        secondary_direct_site_b: Some(90_000.0),
        secondary_indirect_site_b: Some(25_000.0),
        secondary_central_site_b: Some(15_000.0),

        breakdown_direct_site_a: Some(38_000.0),
        breakdown_indirect_site_a: Some(9_000.0),
        breakdown_central_site_a: Some(6_000.0),
        breakdown_direct_site_b: Some(26_000.0),
        breakdown_indirect_site_b: Some(6_000.0),
        breakdown_central_site_b: Some(4_000.0),
    }
}

/// Q2 种子输入
pub fn seed_multi_stream_inputs() -> MultiStreamInputs {
    MultiStreamInputs {
        q1: seed_allocation_inputs(),
        express: DirectStreamInput {
            revenue: Some(310_000.0),
            direct_cost: Some(190_000.0),
            indirect_cost: Some(42_000.0),
            central_cost: Some(21_000.0),
        },
        qc: DirectStreamInput {
            revenue: Some(85_000.0),
            direct_cost: Some(61_000.0),
            indirect_cost: Some(12_000.0),
            central_cost: Some(6_500.0),
        },
    }
}
