// ==========================================
// 托盘结构情景测算 - 工作簿 API (Q1 / Q2 / Q3)
// ==========================================
// 职责: 读取已保存的表单输入, 调用分摊引擎与多收入流汇总器
// 红线: API 层不重写规则, 只负责装配与持久化
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::allocation::{AllocationInputs, MultiStreamInputs};
use crate::domain::rates::RateTable;
use crate::domain::stream::StreamRow;
use crate::engine::allocation::{AllocationEngine, AllocationReport};
use crate::engine::multi_stream::{ConcentrationReport, MultiStreamAggregator};
use crate::importer::{AllocationImportSummary, AllocationInputsImporter};
use crate::repository::InputSnapshotRepository;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 导入目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputsTarget {
    /// Q1 情景工作簿
    Allocation,
    /// Q2/Q3 工作簿中的 Q1 部分
    MultiStream,
}

/// Q2/Q3 汇总结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamTable {
    pub rows: Vec<StreamRow>,
    pub ranked_by_margin: Vec<StreamRow>,
    pub winner: Option<StreamRow>,
    pub concentration: ConcentrationReport,
}

// ==========================================
// WorkbookApi
// ==========================================
pub struct WorkbookApi {
    snapshots: Arc<InputSnapshotRepository>,
    allocation: AllocationEngine,
    aggregator: MultiStreamAggregator,
    importer: AllocationInputsImporter,
}

impl WorkbookApi {
    pub fn new(snapshots: Arc<InputSnapshotRepository>) -> Self {
        Self {
            snapshots,
            allocation: AllocationEngine::new(),
            aggregator: MultiStreamAggregator::new(),
            importer: AllocationInputsImporter::new(),
        }
    }

    // ===== Q1 =====

    pub fn allocation_inputs(&self) -> ApiResult<AllocationInputs> {
        Ok(self.snapshots.load_allocation_inputs()?)
    }

    pub fn save_allocation_inputs(&self, inputs: &AllocationInputs) -> ApiResult<()> {
        Ok(self.snapshots.save_allocation_inputs(inputs)?)
    }

    /// Q1 分摊报告
    pub fn allocation_report(&self) -> ApiResult<AllocationReport> {
        let inputs = self.allocation_inputs()?;
        Ok(self.allocation.allocate(&inputs)?)
    }

    /// 由 Q1 输入派生的单托费率表
    pub fn derived_rate_table(&self) -> ApiResult<RateTable> {
        Ok(self.allocation_report()?.rate_table()?)
    }

    // ===== Q2 / Q3 =====

    pub fn multi_stream_inputs(&self) -> ApiResult<MultiStreamInputs> {
        Ok(self.snapshots.load_multi_stream_inputs()?)
    }

    pub fn save_multi_stream_inputs(&self, inputs: &MultiStreamInputs) -> ApiResult<()> {
        Ok(self.snapshots.save_multi_stream_inputs(inputs)?)
    }

    /// Q2 收入流表 + Q3 集中度
    pub fn stream_table(&self) -> ApiResult<StreamTable> {
        let inputs = self.multi_stream_inputs()?;
        let rows = self.aggregator.build_streams(&inputs)?;
        let winner = self.aggregator.winner(&rows).cloned();
        let ranked_by_margin = self.aggregator.rank_by_margin(&rows);
        let concentration = self.aggregator.concentration(&rows);
        Ok(StreamTable {
            rows,
            ranked_by_margin,
            winner,
            concentration,
        })
    }

    // ===== 导入 =====

    /// 从 field,value 文件导入 Q1 输入并保存
    pub fn import_inputs<P: AsRef<Path>>(&self, path: P, target: InputsTarget) -> ApiResult<AllocationImportSummary> {
        match target {
            InputsTarget::Allocation => {
                let base = self.allocation_inputs()?;
                let summary = self.importer.import_file(path, &base)?;
                self.save_allocation_inputs(&summary.inputs)?;
                Ok(summary)
            }
            InputsTarget::MultiStream => {
                let mut workbook = self.multi_stream_inputs()?;
                let summary = self.importer.import_file(path, &workbook.q1)?;
                workbook.q1 = summary.inputs.clone();
                self.save_multi_stream_inputs(&workbook)?;
                Ok(summary)
            }
        }
    }
}
