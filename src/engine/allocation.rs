// ==========================================
// 托盘结构情景测算 - 分摊引擎
// ==========================================
// 职责: 将少量汇总财务/托盘量输入分摊为各作业类型的收入、成本及单托值
// 规则:
// 1) 运输单托收入 = 类型收入 / 类型出托
// 2) RH&D 收入仅在拼箱与库存之间按进托占比分摊（集拼不参与）
// 3) 二级存储、拆托/重码 收入与成本 100% 归库存
// 4) 运输间接成本 (扣除 EWT) 与总部成本按出托占比分摊到三类
// 5) 仓储 RH&D 成本 (两站点合计) 按进托占比分摊到三类
// 红线: 分母为 0 时单托值为 None, 分子按 0 份额计入; 不修改调用方数据
// ==========================================

use crate::domain::allocation::{AllocationInputs, CostTriple};
use crate::domain::rates::{RateTable, TypeRates};
use crate::domain::types::{PerType, WorkType};
use crate::engine::error::AllocationError;
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub type AllocationResult<T> = Result<T, AllocationError>;

/// 从输入中读取字段（字段名即键名）
macro_rules! field {
    ($reader:expr, $inputs:expr, $name:ident) => {
        $reader.take(stringify!($name), $inputs.$name)
    };
}

// ==========================================
// FieldReader - 必填字段收集器
// ==========================================
// 缺失字段读为 0.0 占位, finish() 时统一报告
pub(crate) struct FieldReader {
    calculation: &'static str,
    missing: Vec<String>,
}

impl FieldReader {
    pub(crate) fn new(calculation: &'static str) -> Self {
        Self {
            calculation,
            missing: Vec::new(),
        }
    }

    pub(crate) fn take(&mut self, name: &str, value: Option<f64>) -> f64 {
        match value {
            Some(v) if v.is_finite() => v,
            _ => {
                self.missing.push(name.to_string());
                0.0
            }
        }
    }

    pub(crate) fn finish(self) -> AllocationResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(AllocationError::IncompleteInput {
                calculation: self.calculation,
                missing: self.missing,
            })
        }
    }
}

/// 占比；总量非正时份额为 0
pub fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

/// 单托值；托盘量非正时未定义
pub fn per_pallet(amount: f64, pallets: f64) -> Option<f64> {
    if pallets > 0.0 {
        Some(amount / pallets)
    } else {
        None
    }
}

// ==========================================
// 分摊结果
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportRevenueShare {
    pub revenue: f64,
    pub pallets_out: f64,
    pub revenue_per_pallet: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarehouseRevenueShare {
    pub pallets_in: f64,
    pub rhd_revenue: f64,
    pub secondary_revenue: f64,
    pub breakdown_revenue: f64,
    pub total_revenue: f64,
    pub revenue_per_pallet: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportCostShare {
    pub direct: f64,
    pub indirect: f64,
    pub central: f64,
    pub transfer: f64,
    pub total: f64,
    pub cost_per_pallet: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarehouseCostShare {
    pub rhd: f64,
    pub secondary: f64,
    pub breakdown: f64,
    pub total: f64,
    pub cost_per_pallet: Option<f64>,
}

/// 仓储三类成本流（两站点合计）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WarehouseStreamCosts {
    pub rhd: CostTriple,
    pub secondary: CostTriple,
    pub breakdown: CostTriple,
}

/// 运输成本分摊的中间量（Q2 复用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportCostBasis {
    pub direct: PerType<f64>,
    pub indirect_pool: f64,
    pub central_pool: f64,
    pub transfer: f64,
    pub pallets_out: PerType<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub transport_revenue: PerType<TransportRevenueShare>,
    pub warehouse_revenue: PerType<WarehouseRevenueShare>,
    pub transport_cost: PerType<TransportCostShare>,
    pub warehouse_cost: PerType<WarehouseCostShare>,
}

impl AllocationReport {
    /// 由分摊结果构造单托费率表
    ///
    /// 任一单托值未定义时返回 DegenerateDivision
    pub fn rate_table(&self) -> AllocationResult<RateTable> {
        let mut rates = RateTable::default();
        for wt in WorkType::ALL {
            let require = |value: Option<f64>, name: &str| {
                value.ok_or_else(|| AllocationError::DegenerateDivision {
                    quantity: format!("{}.{}", wt, name),
                })
            };
            rates[wt] = TypeRates::new(
                require(self.warehouse_revenue[wt].revenue_per_pallet, "wh_rev_per_in_pallet")?,
                require(self.warehouse_cost[wt].cost_per_pallet, "wh_cost_per_in_pallet")?,
                require(self.transport_revenue[wt].revenue_per_pallet, "trans_rev_per_out_pallet")?,
                require(self.transport_cost[wt].cost_per_pallet, "trans_cost_per_out_pallet")?,
            );
        }
        Ok(rates)
    }
}

// ==========================================
// AllocationEngine - 分摊引擎
// ==========================================
pub struct AllocationEngine {
    // 无状态引擎
}

impl AllocationEngine {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 运输收入分摊
    pub fn allocate_transport_revenue(
        &self,
        inputs: &AllocationInputs,
    ) -> AllocationResult<PerType<TransportRevenueShare>> {
        let mut reader = FieldReader::new("transport_revenue");
        let revenue = PerType::new(
            field!(reader, inputs, trans_revenue_consol),
            field!(reader, inputs, trans_revenue_groupage),
            field!(reader, inputs, trans_revenue_stock),
        );
        let pallets_out = read_pallets_out(&mut reader, inputs);
        reader.finish()?;

        Ok(PerType::from_fn(|wt| TransportRevenueShare {
            revenue: revenue[wt],
            pallets_out: pallets_out[wt],
            revenue_per_pallet: per_pallet(revenue[wt], pallets_out[wt]),
        }))
    }

    /// 仓储收入分摊
    ///
    /// 集拼无仓储收入; RH&D 收入只在拼箱/库存之间按进托占比拆分
    pub fn allocate_warehouse_revenue(
        &self,
        inputs: &AllocationInputs,
    ) -> AllocationResult<PerType<WarehouseRevenueShare>> {
        let mut reader = FieldReader::new("warehouse_revenue");
        let pallets_in = read_pallets_in(&mut reader, inputs);
        let rhd_revenue = field!(reader, inputs, rhd_revenue);
        let secondary_revenue = field!(reader, inputs, secondary_storage_revenue);
        let breakdown_revenue = field!(reader, inputs, breakdown_revenue);
        reader.finish()?;

        let rhd_basis = pallets_in.groupage + pallets_in.stock;

        Ok(PerType::from_fn(|wt| {
            let (rhd, secondary, breakdown) = match wt {
                WorkType::Consolidation => (0.0, 0.0, 0.0),
                WorkType::Groupage => (rhd_revenue * share(pallets_in.groupage, rhd_basis), 0.0, 0.0),
                WorkType::Stock => (
                    rhd_revenue * share(pallets_in.stock, rhd_basis),
                    secondary_revenue,
                    breakdown_revenue,
                ),
            };
            let total_revenue = rhd + secondary + breakdown;
            WarehouseRevenueShare {
                pallets_in: pallets_in[wt],
                rhd_revenue: rhd,
                secondary_revenue: secondary,
                breakdown_revenue: breakdown,
                total_revenue,
                revenue_per_pallet: per_pallet(total_revenue, pallets_in[wt]),
            }
        }))
    }

    /// 读取运输成本分摊基数
    pub fn transport_cost_basis(&self, inputs: &AllocationInputs) -> AllocationResult<TransportCostBasis> {
        let mut reader = FieldReader::new("transport_cost");
        let direct = PerType::new(
            field!(reader, inputs, trans_direct_cost_consol),
            field!(reader, inputs, trans_direct_cost_groupage),
            field!(reader, inputs, trans_direct_cost_stock),
        );
        let indirect_total = field!(reader, inputs, trans_indirect_total);
        let indirect_ewt = field!(reader, inputs, trans_indirect_ewt);
        let central_pool = field!(reader, inputs, trans_central_total);
        let transfer = field!(reader, inputs, stock_transfer_cost);
        let pallets_out = read_pallets_out(&mut reader, inputs);
        reader.finish()?;

        Ok(TransportCostBasis {
            direct,
            indirect_pool: indirect_total - indirect_ewt,
            central_pool,
            transfer,
            pallets_out,
        })
    }

    /// 运输成本分摊
    ///
    /// 间接 (扣除 EWT) 与总部成本按出托占比分摊; 库存额外计入调拨成本
    pub fn allocate_transport_cost(
        &self,
        inputs: &AllocationInputs,
    ) -> AllocationResult<PerType<TransportCostShare>> {
        let basis = self.transport_cost_basis(inputs)?;
        let total_out = basis.pallets_out.sum();

        Ok(PerType::from_fn(|wt| {
            let out_share = share(basis.pallets_out[wt], total_out);
            let direct = basis.direct[wt];
            let indirect = basis.indirect_pool * out_share;
            let central = basis.central_pool * out_share;
            let transfer = if wt == WorkType::Stock { basis.transfer } else { 0.0 };
            let total = direct + indirect + central + transfer;
            TransportCostShare {
                direct,
                indirect,
                central,
                transfer,
                total,
                cost_per_pallet: per_pallet(total, basis.pallets_out[wt]),
            }
        }))
    }

    /// 仓储三类成本流（两站点直接/间接/总部合计）
    pub fn warehouse_stream_costs(&self, inputs: &AllocationInputs) -> AllocationResult<WarehouseStreamCosts> {
        let mut reader = FieldReader::new("warehouse_stream_costs");
        let costs = read_warehouse_stream_costs(&mut reader, inputs);
        reader.finish()?;
        Ok(costs)
    }

    /// 仓储成本分摊
    ///
    /// RH&D 成本按进托占比分摊到三类; 二级存储与拆托/重码 100% 归库存
    pub fn allocate_warehouse_cost(
        &self,
        inputs: &AllocationInputs,
    ) -> AllocationResult<PerType<WarehouseCostShare>> {
        let mut reader = FieldReader::new("warehouse_cost");
        let pallets_in = read_pallets_in(&mut reader, inputs);
        let streams = read_warehouse_stream_costs(&mut reader, inputs);
        reader.finish()?;

        let total_in = pallets_in.sum();
        let rhd_total = streams.rhd.total();

        Ok(PerType::from_fn(|wt| {
            let rhd = rhd_total * share(pallets_in[wt], total_in);
            let (secondary, breakdown) = if wt == WorkType::Stock {
                (streams.secondary.total(), streams.breakdown.total())
            } else {
                (0.0, 0.0)
            };
            let total = rhd + secondary + breakdown;
            WarehouseCostShare {
                rhd,
                secondary,
                breakdown,
                total,
                cost_per_pallet: per_pallet(total, pallets_in[wt]),
            }
        }))
    }

    /// 全量分摊
    ///
    /// 四项子分摊全部完整才产出结果; 缺失字段合并报告
    #[instrument(skip(self, inputs))]
    pub fn allocate(&self, inputs: &AllocationInputs) -> AllocationResult<AllocationReport> {
        let transport_revenue = self.allocate_transport_revenue(inputs);
        let warehouse_revenue = self.allocate_warehouse_revenue(inputs);
        let transport_cost = self.allocate_transport_cost(inputs);
        let warehouse_cost = self.allocate_warehouse_cost(inputs);

        let mut missing: Vec<String> = Vec::new();
        for err in [
            transport_revenue.as_ref().err(),
            warehouse_revenue.as_ref().err(),
            transport_cost.as_ref().err(),
            warehouse_cost.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        {
            if let AllocationError::IncompleteInput { missing: fields, .. } = err {
                for f in fields {
                    if !missing.contains(f) {
                        missing.push(f.clone());
                    }
                }
            }
        }

        if !missing.is_empty() {
            tracing::debug!(missing_count = missing.len(), "分摊输入不完整");
            return Err(AllocationError::IncompleteInput {
                calculation: "allocation",
                missing,
            });
        }

        Ok(AllocationReport {
            transport_revenue: transport_revenue?,
            warehouse_revenue: warehouse_revenue?,
            transport_cost: transport_cost?,
            warehouse_cost: warehouse_cost?,
        })
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn read_pallets_out(reader: &mut FieldReader, inputs: &AllocationInputs) -> PerType<f64> {
    PerType::new(
        field!(reader, inputs, pallets_out_consol),
        field!(reader, inputs, pallets_out_groupage),
        field!(reader, inputs, pallets_out_stock),
    )
}

/// 进托量 = 两站点小计之和
fn read_pallets_in(reader: &mut FieldReader, inputs: &AllocationInputs) -> PerType<f64> {
    PerType::new(
        field!(reader, inputs, pallets_in_consol_site_a) + field!(reader, inputs, pallets_in_consol_site_b),
        field!(reader, inputs, pallets_in_groupage_site_a) + field!(reader, inputs, pallets_in_groupage_site_b),
        field!(reader, inputs, pallets_in_stock_site_a) + field!(reader, inputs, pallets_in_stock_site_b),
    )
}

fn read_warehouse_stream_costs(reader: &mut FieldReader, inputs: &AllocationInputs) -> WarehouseStreamCosts {
    let rhd = CostTriple::new(
        field!(reader, inputs, rhd_direct_site_a),
        field!(reader, inputs, rhd_indirect_site_a),
        field!(reader, inputs, rhd_central_site_a),
    ) + CostTriple::new(
        field!(reader, inputs, rhd_direct_site_b),
        field!(reader, inputs, rhd_indirect_site_b),
        field!(reader, inputs, rhd_central_site_b),
    );
    let secondary = CostTriple::new(
        field!(reader, inputs, secondary_direct_site_a),
        field!(reader, inputs, secondary_indirect_site_a),
        field!(reader, inputs, secondary_central_site_a),
    ) + CostTriple::new(
        field!(reader, inputs, secondary_direct_site_b),
        field!(reader, inputs, secondary_indirect_site_b),
        field!(reader, inputs, secondary_central_site_b),
    );
    let breakdown = CostTriple::new(
        field!(reader, inputs, breakdown_direct_site_a),
        field!(reader, inputs, breakdown_indirect_site_a),
        field!(reader, inputs, breakdown_central_site_a),
    ) + CostTriple::new(
        field!(reader, inputs, breakdown_direct_site_b),
        field!(reader, inputs, breakdown_indirect_site_b),
        field!(reader, inputs, breakdown_central_site_b),
    );
    WarehouseStreamCosts {
        rhd,
        secondary,
        breakdown,
    }
}
