// ==========================================
// 托盘结构情景测算 - 情景状态仓
// ==========================================
// 职责: 持有情景编辑状态, 以 reducer 风格的动作修改
// 动作: set_scope_id / set_lock_total_in / set_lock_total_out / update_pallets
//       fetch_scopes / fetch_rates / run_scenario / cross_check / optimise_inputs
// 红线:
// - 锁定总量时修改单项必须再平衡, 总量严格不变
// - 费率加载失败时保留旧费率, 仅记录错误
// - 优化失败或取消时托盘量保持原样
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::optimiser_service::OptimiserService;
use crate::api::rates_source::{RatesSource, RemoteScenario};
use crate::domain::defaults::{current_volumes, DEFAULT_SCOPE_ID};
use crate::domain::rates::{RatesSnapshot, ScopeItem};
use crate::domain::scenario::ScenarioResult;
use crate::domain::types::{PalletField, WorkType};
use crate::domain::volume::{clamp_pallets, VolumeAssignment};
use crate::engine::evaluator::ScenarioEvaluator;
use crate::engine::flow_constraint::{compute_variance_pct_max, validate_stock_constraint};
use crate::engine::optimizer::OptimiseOutcome;
use crate::engine::progress::{CancellationFlag, OptimiseProgress};
use crate::engine::rebalance::TotalsRebalancer;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 交叉核对相对容差
pub const CROSS_CHECK_TOLERANCE: f64 = 1e-6;

// ==========================================
// ScenarioState - 情景状态（可序列化快照）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioState {
    pub scope_id: String,
    pub scopes: Vec<ScopeItem>,
    pub rates: Option<RatesSnapshot>,
    pub inputs: VolumeAssignment,
    pub lock_total_in: bool,
    pub lock_total_out: bool,
    pub results: Option<ScenarioResult>,
    pub error: Option<String>,
    /// 最近一次优化的进度 [0, 1]
    pub progress: f64,
}

impl Default for ScenarioState {
    fn default() -> Self {
        Self {
            scope_id: DEFAULT_SCOPE_ID.to_string(),
            scopes: Vec::new(),
            rates: None,
            inputs: current_volumes(),
            lock_total_in: true,
            lock_total_out: true,
            results: None,
            error: None,
            progress: 0.0,
        }
    }
}

/// 交叉核对差异项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckMismatch {
    pub metric: String,
    pub local: f64,
    pub remote: f64,
}

/// 交叉核对报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckReport {
    pub scope_id: String,
    pub mismatches: Vec<CrossCheckMismatch>,
}

impl CrossCheckReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

// ==========================================
// ScenarioStore - 情景状态仓
// ==========================================
pub struct ScenarioStore {
    state: ScenarioState,
    evaluator: ScenarioEvaluator,
    rebalancer: TotalsRebalancer,
}

impl ScenarioStore {
    pub fn new() -> Self {
        Self::with_state(ScenarioState::default())
    }

    pub fn with_state(state: ScenarioState) -> Self {
        Self {
            state,
            evaluator: ScenarioEvaluator::new(),
            rebalancer: TotalsRebalancer::new(),
        }
    }

    pub fn state(&self) -> &ScenarioState {
        &self.state
    }

    pub fn into_state(self) -> ScenarioState {
        self.state
    }

    // ==========================================
    // 同步动作
    // ==========================================

    pub fn set_scope_id(&mut self, scope_id: &str) {
        self.state.scope_id = scope_id.to_string();
    }

    pub fn set_lock_total_in(&mut self, locked: bool) {
        self.state.lock_total_in = locked;
    }

    pub fn set_lock_total_out(&mut self, locked: bool) {
        self.state.lock_total_out = locked;
    }

    /// 整体替换托盘量（导入 / 恢复快照）
    pub fn set_inputs(&mut self, inputs: VolumeAssignment) {
        self.state.inputs = inputs;
    }

    /// 修改单项托盘量
    ///
    /// 数值先取整钳制; 对应总量锁定时, 新值不超过锁定总量, 其余两类再平衡
    pub fn update_pallets(&mut self, work_type: WorkType, field: PalletField, value: f64) {
        let clamped = clamp_pallets(value);
        let locked = match field {
            PalletField::PalletsIn => self.state.lock_total_in,
            PalletField::PalletsOut => self.state.lock_total_out,
        };

        if !locked {
            self.state.inputs[work_type].set(field, clamped);
            return;
        }

        let current = self.state.inputs.field_values(field);
        let fixed_total = current.sum();
        let rebalanced = self.rebalancer.rebalance(&current, work_type, clamped, fixed_total);
        self.state.inputs = self.state.inputs.with_field_values(field, &rebalanced);

        tracing::debug!(
            work_type = %work_type,
            field = %field,
            requested = clamped,
            fixed_total,
            "锁定总量再平衡"
        );
    }

    /// 库存流量校验
    ///
    /// 偏差上限取当前总进托/总出托的相对差; `variance_pct` 超过上限或库存出托越界时报 InvalidInput
    pub fn check_stock_flow(&self, variance_pct: f64) -> ApiResult<()> {
        let inputs = &self.state.inputs;
        let variance_pct_max = compute_variance_pct_max(inputs.total_in(), inputs.total_out());
        validate_stock_constraint(
            inputs.stock.pallets_in,
            inputs.stock.pallets_out,
            variance_pct,
            variance_pct_max,
        )?;
        Ok(())
    }

    /// 本地情景评估
    ///
    /// # 返回
    /// - RatesUnavailable: 尚未加载费率
    pub fn run_scenario(&mut self) -> ApiResult<&ScenarioResult> {
        let rates = self
            .state
            .rates
            .as_ref()
            .ok_or_else(|| ApiError::RatesUnavailable(self.state.scope_id.clone()))?;
        let result = self.evaluator.evaluate_snapshot(rates, &self.state.inputs);
        self.state.error = None;
        Ok(self.state.results.insert(result))
    }

    // ==========================================
    // 异步动作
    // ==========================================

    /// 加载口径列表
    pub async fn fetch_scopes(&mut self, source: &dyn RatesSource) -> ApiResult<()> {
        match source.list_scopes().await {
            Ok(scopes) => {
                self.state.scopes = scopes;
                Ok(())
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 加载当前口径的费率
    ///
    /// 失败时保留旧费率并记录错误
    #[instrument(skip(self, source), fields(scope_id = %self.state.scope_id))]
    pub async fn fetch_rates(&mut self, source: &dyn RatesSource) -> ApiResult<()> {
        match source.get_rates(&self.state.scope_id).await {
            Ok(rates) => {
                self.state.rates = Some(rates);
                self.state.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "费率加载失败，保留旧费率");
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 并发加载口径列表与费率
    pub async fn refresh(&mut self, source: &dyn RatesSource) -> ApiResult<()> {
        let scope_id = self.state.scope_id.clone();
        let joined = futures::future::try_join(source.list_scopes(), source.get_rates(&scope_id)).await;
        match joined {
            Ok((scopes, rates)) => {
                self.state.scopes = scopes;
                self.state.rates = Some(rates);
                self.state.error = None;
                Ok(())
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 与远程情景计算交叉核对
    ///
    /// 差异只记录告警, 本地结果为准
    pub async fn cross_check(&mut self, remote: &dyn RemoteScenario) -> ApiResult<CrossCheckReport> {
        let local = self.run_scenario()?.clone();
        let remote_result = remote.run_scenario(&self.state.scope_id, &self.state.inputs).await?;

        let mismatches = compare_results(&local, &remote_result);
        for m in &mismatches {
            tracing::warn!(metric = %m.metric, local = m.local, remote = m.remote, "本地与远程情景结果不一致");
        }

        Ok(CrossCheckReport {
            scope_id: self.state.scope_id.clone(),
            mismatches,
        })
    }

    /// 约束优化当前托盘量
    ///
    /// 成功时以最优解替换托盘量并重新评估; 失败时托盘量不变
    pub async fn optimise_inputs(
        &mut self,
        service: &OptimiserService,
        progress: &dyn OptimiseProgress,
        cancel: &CancellationFlag,
    ) -> ApiResult<OptimiseOutcome> {
        let rates = self
            .state
            .rates
            .as_ref()
            .ok_or_else(|| ApiError::RatesUnavailable(self.state.scope_id.clone()))?
            .types;

        self.state.progress = 0.0;
        match service.optimise(&rates, &self.state.inputs, progress, cancel).await {
            Ok(outcome) => {
                self.state.inputs = outcome.assignment;
                self.state.progress = 1.0;
                self.run_scenario()?;
                Ok(outcome)
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl Default for ScenarioStore {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn close_enough(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= CROSS_CHECK_TOLERANCE * scale
}

fn compare_results(local: &ScenarioResult, remote: &ScenarioResult) -> Vec<CrossCheckMismatch> {
    let mut checks: Vec<(String, f64, f64)> = vec![
        ("totals.total_revenue".to_string(), local.totals.total_revenue, remote.totals.total_revenue),
        ("totals.total_cost".to_string(), local.totals.total_cost, remote.totals.total_cost),
        ("totals.total_margin".to_string(), local.totals.total_margin, remote.totals.total_margin),
        (
            "totals.overall_margin_pct".to_string(),
            local.totals.overall_margin_pct,
            remote.totals.overall_margin_pct,
        ),
    ];
    for wt in WorkType::ALL {
        let l = &local.per_type[wt];
        let r = &remote.per_type[wt];
        checks.push((format!("{}.wh_margin", wt), l.wh_margin, r.wh_margin));
        checks.push((format!("{}.trans_margin", wt), l.trans_margin, r.trans_margin));
        checks.push((format!("{}.total_margin", wt), l.total_margin, r.total_margin));
    }

    checks
        .into_iter()
        .filter(|(_, local, remote)| !close_enough(*local, *remote))
        .map(|(metric, local, remote)| CrossCheckMismatch { metric, local, remote })
        .collect()
}
