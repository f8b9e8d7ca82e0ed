// ==========================================
// 托盘结构情景测算 - 领域类型定义
// ==========================================
// 作业类型: 集拼 (consolidation) / 拼箱 (groupage) / 库存 (stock)
// 红线: 作业类型是封闭集合, 顺序固定 (决定优化器平局时的确定性)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

// ==========================================
// 作业类型 (Work Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    #[serde(alias = "consol")]
    Consolidation, // 集拼
    Groupage, // 拼箱
    Stock,    // 库存
}

impl WorkType {
    /// 固定顺序的全部作业类型
    pub const ALL: [WorkType; 3] = [WorkType::Consolidation, WorkType::Groupage, WorkType::Stock];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Consolidation => "consolidation",
            WorkType::Groupage => "groupage",
            WorkType::Stock => "stock",
        }
    }

    /// 除自身外的两个作业类型（保持固定顺序）
    pub fn others(&self) -> [WorkType; 2] {
        match self {
            WorkType::Consolidation => [WorkType::Groupage, WorkType::Stock],
            WorkType::Groupage => [WorkType::Consolidation, WorkType::Stock],
            WorkType::Stock => [WorkType::Consolidation, WorkType::Groupage],
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consolidation" | "consol" => Ok(WorkType::Consolidation),
            "groupage" => Ok(WorkType::Groupage),
            "stock" => Ok(WorkType::Stock),
            other => Err(format!("未知作业类型: {}", other)),
        }
    }
}

// ==========================================
// 托盘字段 (进/出)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PalletField {
    PalletsIn,
    PalletsOut,
}

impl fmt::Display for PalletField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PalletField::PalletsIn => write!(f, "pallets_in"),
            PalletField::PalletsOut => write!(f, "pallets_out"),
        }
    }
}

// ==========================================
// PerType - 按作业类型索引的三元组
// ==========================================
// 序列化为 {consolidation, groupage, stock}，与费率接口的 JSON 结构一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerType<T> {
    #[serde(alias = "consol")]
    pub consolidation: T,
    pub groupage: T,
    pub stock: T,
}

impl<T> PerType<T> {
    pub fn new(consolidation: T, groupage: T, stock: T) -> Self {
        Self {
            consolidation,
            groupage,
            stock,
        }
    }

    pub fn from_fn(mut f: impl FnMut(WorkType) -> T) -> Self {
        Self {
            consolidation: f(WorkType::Consolidation),
            groupage: f(WorkType::Groupage),
            stock: f(WorkType::Stock),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(WorkType, &T) -> U) -> PerType<U> {
        PerType {
            consolidation: f(WorkType::Consolidation, &self.consolidation),
            groupage: f(WorkType::Groupage, &self.groupage),
            stock: f(WorkType::Stock, &self.stock),
        }
    }

    /// 按固定顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (WorkType, &T)> {
        WorkType::ALL.into_iter().map(move |wt| (wt, &self[wt]))
    }
}

impl<T> Index<WorkType> for PerType<T> {
    type Output = T;

    fn index(&self, work_type: WorkType) -> &T {
        match work_type {
            WorkType::Consolidation => &self.consolidation,
            WorkType::Groupage => &self.groupage,
            WorkType::Stock => &self.stock,
        }
    }
}

impl<T> IndexMut<WorkType> for PerType<T> {
    fn index_mut(&mut self, work_type: WorkType) -> &mut T {
        match work_type {
            WorkType::Consolidation => &mut self.consolidation,
            WorkType::Groupage => &mut self.groupage,
            WorkType::Stock => &mut self.stock,
        }
    }
}

impl PerType<u64> {
    pub fn sum(&self) -> u64 {
        self.consolidation + self.groupage + self.stock
    }
}

impl PerType<f64> {
    pub fn sum(&self) -> f64 {
        self.consolidation + self.groupage + self.stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_type_serde_accepts_consol_alias() {
        let wt: WorkType = serde_json::from_str("\"consol\"").unwrap();
        assert_eq!(wt, WorkType::Consolidation);
        assert_eq!(serde_json::to_string(&wt).unwrap(), "\"consolidation\"");
    }

    #[test]
    fn test_others_keeps_fixed_order() {
        assert_eq!(
            WorkType::Groupage.others(),
            [WorkType::Consolidation, WorkType::Stock]
        );
    }

    #[test]
    fn test_per_type_index_and_sum() {
        let mut values = PerType::new(1u64, 2, 3);
        values[WorkType::Stock] = 10;
        assert_eq!(values.sum(), 13);
        let order: Vec<WorkType> = values.iter().map(|(wt, _)| wt).collect();
        assert_eq!(order, WorkType::ALL.to_vec());
    }
}
