// ==========================================
// 托盘结构情景测算 - 托盘量领域模型
// ==========================================
// 红线: 托盘量为非负整数, 统一取整并钳制到 [0, MAX_PALLETS]
// 用途: 用户编辑与优化搜索的基本单元
// ==========================================

use crate::domain::types::{PalletField, PerType, WorkType};
use serde::{Deserialize, Serialize};

/// 托盘量上限（与前端安全整数上限一致）
pub const MAX_PALLETS: u64 = 9_007_199_254_740_991;

/// 将任意数值规范为合法托盘量
///
/// - 非有限值视为 0
/// - 四舍五入到整托
/// - 钳制到 [0, MAX_PALLETS]
pub fn clamp_pallets(value: f64) -> u64 {
    if !value.is_finite() {
        return 0;
    }
    let rounded = value.round();
    if rounded <= 0.0 {
        0
    } else if rounded >= MAX_PALLETS as f64 {
        MAX_PALLETS
    } else {
        rounded as u64
    }
}

// ==========================================
// PalletVolume - 单作业类型的进/出托盘量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PalletVolume {
    pub pallets_in: u64,
    pub pallets_out: u64,
}

impl PalletVolume {
    pub fn new(pallets_in: u64, pallets_out: u64) -> Self {
        Self {
            pallets_in,
            pallets_out,
        }
    }

    pub fn get(&self, field: PalletField) -> u64 {
        match field {
            PalletField::PalletsIn => self.pallets_in,
            PalletField::PalletsOut => self.pallets_out,
        }
    }

    pub fn set(&mut self, field: PalletField, value: u64) {
        match field {
            PalletField::PalletsIn => self.pallets_in = value,
            PalletField::PalletsOut => self.pallets_out = value,
        }
    }
}

/// 托盘量分配（三个作业类型）
pub type VolumeAssignment = PerType<PalletVolume>;

impl PerType<PalletVolume> {
    pub fn total_in(&self) -> u64 {
        self.iter().map(|(_, v)| v.pallets_in).sum()
    }

    pub fn total_out(&self) -> u64 {
        self.iter().map(|(_, v)| v.pallets_out).sum()
    }

    /// 抽取某一字段的三元组
    pub fn field_values(&self, field: PalletField) -> PerType<u64> {
        self.map(|_, v| v.get(field))
    }

    /// 用三元组覆盖某一字段，另一字段保持不变
    pub fn with_field_values(&self, field: PalletField, values: &PerType<u64>) -> Self {
        self.map(|wt, v| {
            let mut next = *v;
            next.set(field, values[wt]);
            next
        })
    }

    /// 与另一分配的欧氏距离平方
    pub fn distance_sq(&self, other: &VolumeAssignment) -> u128 {
        WorkType::ALL
            .iter()
            .map(|&wt| {
                let din = self[wt].pallets_in.abs_diff(other[wt].pallets_in) as u128;
                let dout = self[wt].pallets_out.abs_diff(other[wt].pallets_out) as u128;
                din * din + dout * dout
            })
            .sum()
    }
}
