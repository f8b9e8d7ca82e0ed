// ==========================================
// 托盘结构情景测算 - 多收入流汇总 (Q2 / Q3)
// ==========================================
// Q2: 由 Q1 输入派生运输三类 + 仓储三流, 加上直接录入的 Express / QC
//     - 运输: 直接成本 (库存含调拨成本) + 按出托占比分摊的间接/总部成本
//     - 仓储: RH&D / 二级存储 / 拆托重码, 成本按两站点合计 (不按作业类型拆分)
// Q2 胜出: margin_pct 最大 → 1e-9 内比 margin_value → label 字典序
// Q3: 成本占比 / 收入占比 = 失衡比值; 比值降序前三标记为高失衡
// 红线: 结果完全确定, 与输入行顺序无关
// ==========================================

use crate::domain::allocation::{AllocationInputs, DirectStreamInput, MultiStreamInputs};
use crate::domain::stream::{ConcentrationRow, StreamRow, StreamSource};
use crate::domain::types::WorkType;
use crate::engine::allocation::{AllocationEngine, AllocationResult, FieldReader};
use crate::engine::error::AllocationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::instrument;

/// margin_pct 相等判定容差
pub const STREAM_PCT_EPSILON: f64 = 1e-9;

/// 高失衡标记数量
pub const FLAGGED_STREAM_COUNT: usize = 3;

/// Q3 集中度报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationReport {
    /// 按失衡比值降序（未定义比值排最后）
    pub ranked: Vec<ConcentrationRow>,
    /// 按总成本降序的展示顺序
    pub by_cost: Vec<ConcentrationRow>,
}

// ==========================================
// MultiStreamAggregator - 多收入流汇总器
// ==========================================
pub struct MultiStreamAggregator {
    allocation: AllocationEngine,
}

impl MultiStreamAggregator {
    pub fn new() -> Self {
        Self {
            allocation: AllocationEngine::new(),
        }
    }

    /// 构建 Q2 收入流表
    ///
    /// 任一派生/直接录入所需字段缺失时整体报告不完整
    #[instrument(skip(self, inputs))]
    pub fn build_streams(&self, inputs: &MultiStreamInputs) -> AllocationResult<Vec<StreamRow>> {
        let transport = self.transport_streams(&inputs.q1);
        let warehouse = self.warehouse_streams(&inputs.q1);
        let express = direct_stream("express", "Express", &inputs.express);
        let qc = direct_stream("qc", "QC", &inputs.qc);

        let mut missing: Vec<String> = Vec::new();
        for err in [
            transport.as_ref().err(),
            warehouse.as_ref().err(),
            express.as_ref().err(),
            qc.as_ref().err(),
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
            return Err(AllocationError::IncompleteInput {
                calculation: "stream_table",
                missing,
            });
        }

        let mut rows = transport?;
        rows.extend(warehouse?);
        rows.push(express?);
        rows.push(qc?);
        Ok(rows)
    }

    /// 运输三类收入流
    pub fn transport_streams(&self, inputs: &AllocationInputs) -> AllocationResult<Vec<StreamRow>> {
        let revenue = self.allocation.allocate_transport_revenue(inputs)?;
        let cost = self.allocation.allocate_transport_cost(inputs)?;

        Ok(WorkType::ALL
            .iter()
            .map(|&wt| {
                let c = cost[wt];
                StreamRow::new(
                    &format!("transport_{}", wt.as_str()),
                    &format!("Transport - {}", transport_label(wt)),
                    revenue[wt].revenue,
                    c.direct + c.transfer,
                    c.indirect,
                    c.central,
                    StreamSource::Derived,
                )
            })
            .collect())
    }

    /// 仓储三流（两站点合计）
    pub fn warehouse_streams(&self, inputs: &AllocationInputs) -> AllocationResult<Vec<StreamRow>> {
        let mut reader = FieldReader::new("warehouse_streams");
        let rhd_revenue = reader.take("rhd_revenue", inputs.rhd_revenue);
        let secondary_revenue = reader.take("secondary_storage_revenue", inputs.secondary_storage_revenue);
        let breakdown_revenue = reader.take("breakdown_revenue", inputs.breakdown_revenue);
        let costs = self.allocation.warehouse_stream_costs(inputs);

        // 收入与成本字段缺失合并报告
        let costs = match (reader.finish(), costs) {
            (Ok(()), Ok(costs)) => costs,
            (Err(e), Ok(_)) | (Ok(()), Err(e)) => return Err(e),
            (
                Err(AllocationError::IncompleteInput { mut missing, .. }),
                Err(AllocationError::IncompleteInput { missing: more, .. }),
            ) => {
                missing.extend(more);
                return Err(AllocationError::IncompleteInput {
                    calculation: "warehouse_streams",
                    missing,
                });
            }
            (Err(e), Err(_)) => return Err(e),
        };

        let rows = [
            ("warehouse_rhd", "Warehouse - RH&D", rhd_revenue, costs.rhd),
            ("warehouse_secondary", "Warehouse - Secondary storage", secondary_revenue, costs.secondary),
            ("warehouse_breakdown", "Warehouse - Breakdown", breakdown_revenue, costs.breakdown),
        ];
        Ok(rows
            .into_iter()
            .map(|(id, label, revenue, cost)| {
                StreamRow::new(id, label, revenue, cost.direct, cost.indirect, cost.central, StreamSource::Derived)
            })
            .collect())
    }

    /// Q2 胜出收入流（无定义 margin_pct 的行不参与）
    pub fn winner<'a>(&self, rows: &'a [StreamRow]) -> Option<&'a StreamRow> {
        rows.iter()
            .filter(|row| row.margin_pct.is_some())
            .min_by(|a, b| compare_by_margin(a, b))
    }

    /// 按 margin 排名（与胜出规则同序, 未定义 margin_pct 排最后）
    pub fn rank_by_margin(&self, rows: &[StreamRow]) -> Vec<StreamRow> {
        let mut ranked = rows.to_vec();
        ranked.sort_by(compare_by_margin);
        ranked
    }

    /// Q3 成本/收入集中度
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn concentration(&self, rows: &[StreamRow]) -> ConcentrationReport {
        let total_cost: f64 = rows.iter().map(|r| r.total_cost).sum();
        let total_revenue: f64 = rows.iter().map(|r| r.revenue).sum();

        let mut ranked: Vec<ConcentrationRow> = rows
            .iter()
            .map(|row| {
                let cost_share = fraction(row.total_cost, total_cost);
                let revenue_share = fraction(row.revenue, total_revenue);
                let cost_rev_ratio = match (cost_share, revenue_share) {
                    (Some(c), Some(r)) if r > 0.0 => Some(c / r),
                    _ => None,
                };
                ConcentrationRow {
                    stream: row.clone(),
                    cost_share_pct: cost_share.map(|s| s * 100.0),
                    revenue_share_pct: revenue_share.map(|s| s * 100.0),
                    cost_rev_ratio,
                    flagged: false,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            compare_ratio_desc(a.cost_rev_ratio, b.cost_rev_ratio)
                .then_with(|| a.stream.label.cmp(&b.stream.label))
        });
        for row in ranked
            .iter_mut()
            .filter(|r| r.cost_rev_ratio.is_some())
            .take(FLAGGED_STREAM_COUNT)
        {
            row.flagged = true;
        }

        let mut by_cost = ranked.clone();
        by_cost.sort_by(|a, b| {
            b.stream
                .total_cost
                .partial_cmp(&a.stream.total_cost)
                .unwrap_or(Ordering::Equal)
                .then_with(|| compare_ratio_desc(a.cost_rev_ratio, b.cost_rev_ratio))
                .then_with(|| a.stream.label.cmp(&b.stream.label))
        });

        tracing::debug!(
            flagged = ranked.iter().filter(|r| r.flagged).count(),
            "集中度排名完成"
        );

        ConcentrationReport { ranked, by_cost }
    }
}

impl Default for MultiStreamAggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn transport_label(wt: WorkType) -> &'static str {
    match wt {
        WorkType::Consolidation => "Consolidation",
        WorkType::Groupage => "Groupage",
        WorkType::Stock => "Stock",
    }
}

/// 直接录入的收入流，四个字段均必填
fn direct_stream(id: &str, label: &str, input: &DirectStreamInput) -> AllocationResult<StreamRow> {
    let mut reader = FieldReader::new("direct_stream");
    let revenue = reader.take(&format!("{}.revenue", id), input.revenue);
    let direct = reader.take(&format!("{}.direct_cost", id), input.direct_cost);
    let indirect = reader.take(&format!("{}.indirect_cost", id), input.indirect_cost);
    let central = reader.take(&format!("{}.central_cost", id), input.central_cost);
    reader.finish()?;
    Ok(StreamRow::new(id, label, revenue, direct, indirect, central, StreamSource::Direct))
}

/// 占比；总量非正时未定义
fn fraction(part: f64, whole: f64) -> Option<f64> {
    if whole > 0.0 {
        Some(part / whole)
    } else {
        None
    }
}

/// 胜出排序: margin_pct 降序 (1e-9 容差) → margin_value 降序 → label 升序
fn compare_by_margin(a: &StreamRow, b: &StreamRow) -> Ordering {
    let pct_order = match (a.margin_pct, b.margin_pct) {
        (Some(x), Some(y)) if (x - y).abs() <= STREAM_PCT_EPSILON => Ordering::Equal,
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    pct_order
        .then_with(|| b.margin_value.partial_cmp(&a.margin_value).unwrap_or(Ordering::Equal))
        .then_with(|| a.label.cmp(&b.label))
}

/// 比值降序, 未定义排最后
fn compare_ratio_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocation::tests::sample_inputs;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row(label: &str, revenue: f64, total_cost: f64) -> StreamRow {
        StreamRow::new(label, label, revenue, total_cost, 0.0, 0.0, StreamSource::Direct)
    }

    fn sample_multi_inputs() -> MultiStreamInputs {
        MultiStreamInputs {
            q1: sample_inputs(),
            express: DirectStreamInput {
                revenue: Some(500.0),
                direct_cost: Some(300.0),
                indirect_cost: Some(50.0),
                central_cost: Some(50.0),
            },
            qc: DirectStreamInput {
                revenue: Some(0.0),
                direct_cost: Some(40.0),
                indirect_cost: Some(0.0),
                central_cost: Some(0.0),
            },
        }
    }

    #[test]
    fn test_build_streams_from_sample() {
        let rows = MultiStreamAggregator::new().build_streams(&sample_multi_inputs()).unwrap();
        assert_eq!(rows.len(), 8);

        // 库存运输: 直接 1200 + 调拨 300, 间接 500×0.4, 总部 250×0.4
        let stock = rows.iter().find(|r| r.id == "transport_stock").unwrap();
        assert!(approx(stock.direct_cost, 1500.0));
        assert!(approx(stock.indirect_cost, 200.0));
        assert!(approx(stock.central_cost, 100.0));
        assert!(approx(stock.margin_value, 1200.0));

        // RH&D 成本 = 两站点合计
        let rhd = rows.iter().find(|r| r.id == "warehouse_rhd").unwrap();
        assert!(approx(rhd.direct_cost, 150.0));
        assert!(approx(rhd.total_cost, 200.0));
        assert_eq!(rhd.source, StreamSource::Derived);

        let qc = rows.iter().find(|r| r.id == "qc").unwrap();
        assert_eq!(qc.margin_pct, None);
        assert_eq!(qc.source, StreamSource::Direct);
    }

    #[test]
    fn test_build_streams_reports_missing_direct_fields() {
        let mut inputs = sample_multi_inputs();
        inputs.express.central_cost = None;
        inputs.q1.rhd_revenue = None;
        match MultiStreamAggregator::new().build_streams(&inputs) {
            Err(AllocationError::IncompleteInput { missing, .. }) => {
                assert!(missing.contains(&"express.central_cost".to_string()));
                assert!(missing.contains(&"rhd_revenue".to_string()));
            }
            other => panic!("应报告输入不完整, 实际: {:?}", other),
        }
    }

    #[test]
    fn test_winner_highest_margin_pct() {
        let aggregator = MultiStreamAggregator::new();
        let rows = aggregator.build_streams(&sample_multi_inputs()).unwrap();
        let winner = aggregator.winner(&rows).unwrap();
        assert_eq!(winner.id, "warehouse_rhd");
    }

    #[test]
    fn test_winner_equal_pct_prefers_larger_margin_value() {
        let rows = vec![row("Alpha", 100.0, 60.0), row("Beta", 200.0, 120.0)];
        let winner = MultiStreamAggregator::new().winner(&rows).unwrap();
        assert_eq!(winner.label, "Beta");
    }

    #[test]
    fn test_winner_full_tie_prefers_earlier_label() {
        let rows = vec![row("Zulu", 100.0, 60.0), row("Alpha", 100.0, 60.0)];
        let winner = MultiStreamAggregator::new().winner(&rows).unwrap();
        assert_eq!(winner.label, "Alpha");
    }

    #[test]
    fn test_winner_ignores_undefined_margin() {
        let rows = vec![row("NoRevenue", 0.0, 10.0)];
        assert!(MultiStreamAggregator::new().winner(&rows).is_none());
    }

    #[test]
    fn test_concentration_ratio_ordering() {
        // 成本占比 40%/20%/40%, 收入占比 10%/15%/75%
        let rows = vec![
            row("Low", 15.0, 20.0),
            row("High", 10.0, 40.0),
            row("Bulk", 75.0, 40.0),
        ];
        let report = MultiStreamAggregator::new().concentration(&rows);

        assert_eq!(report.ranked[0].stream.label, "High");
        assert!(approx(report.ranked[0].cost_rev_ratio.unwrap(), 4.0));
        assert_eq!(report.ranked[1].stream.label, "Low");
        assert!(approx(report.ranked[1].cost_rev_ratio.unwrap(), 0.2 / 0.15));
        assert!(approx(report.ranked[0].cost_share_pct.unwrap(), 40.0));
        // 不超过 3 个有定义比值时全部标记
        assert!(report.ranked.iter().all(|r| r.flagged));
    }

    #[test]
    fn test_concentration_flags_top_three_only() {
        let rows = vec![
            row("A", 10.0, 40.0),
            row("B", 20.0, 30.0),
            row("C", 30.0, 20.0),
            row("D", 40.0, 10.0),
            row("E", 0.0, 5.0),
        ];
        let report = MultiStreamAggregator::new().concentration(&rows);
        let flagged: Vec<&str> = report
            .ranked
            .iter()
            .filter(|r| r.flagged)
            .map(|r| r.stream.label.as_str())
            .collect();
        assert_eq!(flagged, vec!["A", "B", "C"]);

        // 零收入 → 比值未定义, 排最后且不标记
        let last = report.ranked.last().unwrap();
        assert_eq!(last.stream.label, "E");
        assert_eq!(last.cost_rev_ratio, None);
        assert!(!last.flagged);
    }

    #[test]
    fn test_concentration_display_order_by_total_cost() {
        let rows = vec![row("Small", 50.0, 10.0), row("Big", 50.0, 90.0)];
        let report = MultiStreamAggregator::new().concentration(&rows);
        assert_eq!(report.by_cost[0].stream.label, "Big");
        assert!(report.by_cost[0].flagged);
    }
}
