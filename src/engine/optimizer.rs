// ==========================================
// 托盘结构情景测算 - 约束优化器
// ==========================================
// 目标: 在固定总进托 / 总出托下, 搜索各作业类型的整数 (进托, 出托) 组合,
//       使总毛利率最大; 毛利率相同 (1e-9 内) 时取距当前分配欧氏距离最小者
// 约束: 每类出托 ∈ [ceil(0.9·进托), floor(1.1·进托)]
// 搜索: 步长网格枚举 in_A / in_B (in_C 隐含), 每个进托组合下枚举 out_A / out_B
//       (out_C 隐含), out_C 越界立即剪枝
// 步长: max(100, round(max(总进托, 总出托) / 400)); 最大值 ≤ 1000 时为 50
// 运行: 单线程协作式; 外层迭代之间按节流间隔上报进度 / 让出执行权 / 检查取消
// 红线: 中断或部分搜索状态绝不作为有效结果返回
// ==========================================

use crate::domain::rates::RateTable;
use crate::domain::types::PerType;
use crate::domain::volume::{PalletVolume, VolumeAssignment};
use crate::engine::error::OptimiseError;
use crate::engine::evaluator::ScenarioEvaluator;
use crate::engine::progress::{CancellationFlag, OptimiseProgress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::instrument;
use uuid::Uuid;

/// 毛利率相等判定容差
pub const MARGIN_PCT_EPSILON: f64 = 1e-9;

/// 小规模网格步长（最大总量 ≤ 1000 时）
pub const SMALL_GRID_STEP: u64 = 50;

/// 大规模网格最小步长
pub const MIN_GRID_STEP: u64 = 100;

/// 网格目标分辨率
pub const GRID_RESOLUTION: u64 = 400;

/// 每类出托相对进托的可行区间 [ceil(0.9·in), floor(1.1·in)]
pub fn feasibility_band(pallets_in: u64) -> (u64, u64) {
    let lower = (pallets_in * 9).div_ceil(10);
    let upper = pallets_in * 11 / 10;
    (lower, upper)
}

/// 网格步长
pub fn grid_step(total_in: u64, total_out: u64) -> u64 {
    let max_total = total_in.max(total_out);
    if max_total <= 1000 {
        SMALL_GRID_STEP
    } else {
        let rounded = (max_total + GRID_RESOLUTION / 2) / GRID_RESOLUTION;
        rounded.max(MIN_GRID_STEP)
    }
}

/// 不小于 value 的最小网格点
fn ceil_to_step(value: u64, step: u64) -> u64 {
    value.div_ceil(step) * step
}

// ==========================================
// OptimiserSettings - 协作调度参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimiserSettings {
    /// 进度上报最小间隔
    pub progress_interval: Duration,
    /// 让出执行权最小间隔
    pub yield_interval: Duration,
}

impl Default for OptimiserSettings {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(80),
            yield_interval: Duration::from_millis(120),
        }
    }
}

// ==========================================
// 搜索结果
// ==========================================

/// 候选解
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub assignment: VolumeAssignment,
    pub margin_pct: f64,
    pub distance_sq: u128,
}

/// 一次优化的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimiseOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub assignment: VolumeAssignment,
    pub margin_pct: f64,
    pub distance_sq: u128,
    pub step: u64,
    pub iterations: u64,
    pub candidates_evaluated: u64,
    pub elapsed_ms: u64,
}

// ==========================================
// GridSearch - 可步进的网格搜索
// ==========================================
// 每次 step() 处理一个外层迭代 (一个 (in_A, in_B) 网格点及其出托枚举)
pub struct GridSearch<'a> {
    rates: &'a RateTable,
    current: &'a VolumeAssignment,
    evaluator: ScenarioEvaluator,

    total_in: u64,
    total_out: u64,
    step: u64,

    // 游标
    in_a: u64,
    in_b: u64,
    exhausted: bool,

    processed: u64,
    total_iterations: u64,
    candidates_evaluated: u64,
    best: Option<Candidate>,
}

impl<'a> GridSearch<'a> {
    /// 创建搜索
    ///
    /// 总量取自当前分配并在搜索期间保持不变; 全局区间预检失败直接返回 Infeasible
    pub fn new(rates: &'a RateTable, current: &'a VolumeAssignment) -> Result<Self, OptimiseError> {
        let total_in = current.total_in();
        let total_out = current.total_out();

        if total_in == 0 && total_out == 0 {
            return Err(OptimiseError::Infeasible {
                reason: "总进托与总出托均为 0".to_string(),
            });
        }

        let (lower, upper) = feasibility_band(total_in);
        if total_out < lower || total_out > upper {
            return Err(OptimiseError::Infeasible {
                reason: format!(
                    "总出托 {} 超出总进托 {} 的 ±10% 区间 [{}, {}]",
                    total_out, total_in, lower, upper
                ),
            });
        }

        let step = grid_step(total_in, total_out);
        let total_iterations = count_iterations(total_in, step);

        Ok(Self {
            rates,
            current,
            evaluator: ScenarioEvaluator::new(),
            total_in,
            total_out,
            step,
            in_a: 0,
            in_b: 0,
            exhausted: false,
            processed: 0,
            total_iterations,
            candidates_evaluated: 0,
            best: None,
        })
    }

    pub fn step_size(&self) -> u64 {
        self.step
    }

    pub fn total_iterations(&self) -> u64 {
        self.total_iterations
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn candidates_evaluated(&self) -> u64 {
        self.candidates_evaluated
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// 已处理外层迭代占比
    pub fn progress(&self) -> f64 {
        if self.total_iterations == 0 {
            return 1.0;
        }
        (self.processed as f64 / self.total_iterations as f64).min(1.0)
    }

    /// 处理一个外层迭代
    ///
    /// # 返回
    /// - `true`: 已处理一个迭代
    /// - `false`: 网格已穷尽
    pub fn step(&mut self) -> bool {
        if self.exhausted {
            return false;
        }

        let in_a = self.in_a;
        let in_b = self.in_b;
        let in_c = self.total_in - in_a - in_b;
        self.search_outputs(PerType::new(in_a, in_b, in_c));
        self.processed += 1;

        // 推进游标
        self.in_b += self.step;
        if self.in_a + self.in_b > self.total_in {
            self.in_a += self.step;
            self.in_b = 0;
            if self.in_a > self.total_in {
                self.exhausted = true;
            }
        }
        true
    }

    /// 结束搜索，返回最优候选
    pub fn finish(self) -> Result<Candidate, OptimiseError> {
        if !self.exhausted {
            return Err(OptimiseError::Infeasible {
                reason: "搜索未完成".to_string(),
            });
        }
        self.best.ok_or_else(|| OptimiseError::Infeasible {
            reason: format!(
                "步长 {} 的网格内没有满足约束的候选 (总进托={}, 总出托={})",
                self.step, self.total_in, self.total_out
            ),
        })
    }

    /// 给定进托组合，枚举出托组合
    fn search_outputs(&mut self, pallets_in: PerType<u64>) {
        let bands = pallets_in.map(|_, &v| feasibility_band(v));
        let lower_sum = bands.consolidation.0 + bands.groupage.0 + bands.stock.0;
        let upper_sum = bands.consolidation.1 + bands.groupage.1 + bands.stock.1;
        if lower_sum > self.total_out || upper_sum < self.total_out {
            return;
        }

        let step = self.step;
        let total_out = self.total_out;
        let (lo_a, hi_a) = bands.consolidation;
        let (lo_b, hi_b) = bands.groupage;
        let (lo_c, hi_c) = bands.stock;

        let mut out_a = ceil_to_step(lo_a, step);
        while out_a <= hi_a && out_a <= total_out {
            let rest = total_out - out_a;
            // out_C ≤ hi_c 要求 out_B ≥ rest - hi_c
            let min_b = lo_b.max(rest.saturating_sub(hi_c));
            let mut out_b = ceil_to_step(min_b, step);
            while out_b <= hi_b && out_b <= rest {
                let out_c = rest - out_b;
                if out_c < lo_c {
                    // out_B 继续增大只会让 out_C 更小
                    break;
                }
                if out_c <= hi_c {
                    self.consider(pallets_in, PerType::new(out_a, out_b, out_c));
                }
                out_b += step;
            }
            out_a += step;
        }
    }

    fn consider(&mut self, pallets_in: PerType<u64>, pallets_out: PerType<u64>) {
        self.candidates_evaluated += 1;

        let assignment: VolumeAssignment =
            PerType::from_fn(|wt| PalletVolume::new(pallets_in[wt], pallets_out[wt]));
        let objective = self.evaluator.objective(self.rates, &assignment);
        let margin_pct = match objective.margin_pct() {
            Some(pct) => pct,
            None => return,
        };
        let distance_sq = assignment.distance_sq(self.current);

        let better = match &self.best {
            None => true,
            Some(best) => {
                margin_pct > best.margin_pct + MARGIN_PCT_EPSILON
                    || ((margin_pct - best.margin_pct).abs() <= MARGIN_PCT_EPSILON
                        && distance_sq < best.distance_sq)
            }
        };

        if better {
            self.best = Some(Candidate {
                assignment,
                margin_pct,
                distance_sq,
            });
        }
    }
}

/// 预估外层迭代总数：满足 in_A + in_B ≤ 总进托 的网格点对数
fn count_iterations(total_in: u64, step: u64) -> u64 {
    let mut count = 0;
    let mut in_a = 0;
    while in_a <= total_in {
        count += (total_in - in_a) / step + 1;
        in_a += step;
    }
    count
}

// ==========================================
// ConstrainedOptimizer - 约束优化器
// ==========================================
pub struct ConstrainedOptimizer {
    settings: OptimiserSettings,
}

impl ConstrainedOptimizer {
    pub fn new(settings: OptimiserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> OptimiserSettings {
        self.settings
    }

    /// 协作式优化
    ///
    /// 外层迭代之间检查取消标记; 按节流间隔上报进度、让出执行权
    #[instrument(skip(self, rates, current, progress, cancel))]
    pub async fn optimise(
        &self,
        rates: &RateTable,
        current: &VolumeAssignment,
        progress: &dyn OptimiseProgress,
        cancel: &CancellationFlag,
    ) -> Result<OptimiseOutcome, OptimiseError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let mut search = GridSearch::new(rates, current).map_err(|e| {
            tracing::warn!(%run_id, "优化预检失败: {}", e);
            e
        })?;

        tracing::info!(
            %run_id,
            step = search.step_size(),
            total_iterations = search.total_iterations(),
            "开始网格搜索"
        );

        progress.report(0.0);
        let mut last_progress = Instant::now();
        let mut last_yield = Instant::now();

        loop {
            if cancel.is_cancelled() {
                tracing::info!(%run_id, processed = search.processed(), "优化已取消");
                return Err(OptimiseError::Cancelled);
            }
            if !search.step() {
                break;
            }

            let now = Instant::now();
            if now.duration_since(last_progress) >= self.settings.progress_interval {
                progress.report(search.progress());
                last_progress = now;
            }
            if now.duration_since(last_yield) >= self.settings.yield_interval {
                tokio::task::yield_now().await;
                last_yield = Instant::now();
            }
        }

        let outcome = Self::build_outcome(run_id, started_at, start, search)?;
        progress.report(1.0);
        Ok(outcome)
    }

    /// 阻塞式优化（一次跑完，无进度/让出）
    pub fn optimise_blocking(
        &self,
        rates: &RateTable,
        current: &VolumeAssignment,
    ) -> Result<OptimiseOutcome, OptimiseError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let mut search = GridSearch::new(rates, current)?;
        while search.step() {}

        Self::build_outcome(run_id, started_at, start, search)
    }

    fn build_outcome(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        start: Instant,
        search: GridSearch<'_>,
    ) -> Result<OptimiseOutcome, OptimiseError> {
        let step = search.step_size();
        let iterations = search.processed();
        let candidates_evaluated = search.candidates_evaluated();
        let best = search.finish()?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            %run_id,
            margin_pct = best.margin_pct,
            distance_sq = %best.distance_sq,
            candidates_evaluated,
            elapsed_ms,
            "网格搜索完成"
        );

        Ok(OptimiseOutcome {
            run_id,
            started_at,
            assignment: best.assignment,
            margin_pct: best.margin_pct,
            distance_sq: best.distance_sq,
            step,
            iterations,
            candidates_evaluated,
            elapsed_ms,
        })
    }
}

impl Default for ConstrainedOptimizer {
    fn default() -> Self {
        Self::new(OptimiserSettings::default())
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rates::TypeRates;
    use crate::domain::types::WorkType;
    use crate::domain::defaults::current_volumes;
    use crate::engine::progress::NoOpProgress;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    fn assignment(values: [(u64, u64); 3]) -> VolumeAssignment {
        PerType::new(
            PalletVolume::new(values[0].0, values[0].1),
            PalletVolume::new(values[1].0, values[1].1),
            PalletVolume::new(values[2].0, values[2].1),
        )
    }

    fn uniform_rates() -> RateTable {
        let r = TypeRates::new(10.0, 6.0, 20.0, 15.0);
        PerType::new(r, r, r)
    }

    fn stock_favoured_rates() -> RateTable {
        PerType::new(
            TypeRates::new(10.0, 9.0, 10.0, 9.0),
            TypeRates::new(10.0, 9.0, 10.0, 9.0),
            TypeRates::new(10.0, 2.0, 10.0, 2.0),
        )
    }

    fn assert_within_bands(result: &VolumeAssignment) {
        for wt in WorkType::ALL {
            let (lo, hi) = feasibility_band(result[wt].pallets_in);
            assert!(result[wt].pallets_out >= lo && result[wt].pallets_out <= hi, "{} 越界", wt);
        }
    }

    #[test]
    fn test_feasibility_band() {
        assert_eq!(feasibility_band(0), (0, 0));
        assert_eq!(feasibility_band(100), (90, 110));
        assert_eq!(feasibility_band(15), (14, 16));
    }

    #[test]
    fn test_grid_step() {
        assert_eq!(grid_step(1000, 950), 50);
        assert_eq!(grid_step(1001, 950), 100);
        assert_eq!(grid_step(187_471, 191_726), 479);
        assert_eq!(grid_step(400_000, 390_000), 1000);
    }

    #[test]
    fn test_count_iterations() {
        // in_A ∈ {0,50,100}: 3 + 2 + 1
        assert_eq!(count_iterations(100, 50), 6);
    }

    #[test]
    fn test_precheck_rejects_out_of_band_totals() {
        let current = assignment([(500, 250), (300, 150), (200, 100)]);
        let rates = uniform_rates();
        let result = GridSearch::new(&rates, &current);
        assert!(matches!(result, Err(OptimiseError::Infeasible { .. })));
    }

    #[test]
    fn test_precheck_rejects_zero_totals() {
        let current = assignment([(0, 0), (0, 0), (0, 0)]);
        let rates = uniform_rates();
        assert!(matches!(
            ConstrainedOptimizer::default().optimise_blocking(&rates, &current),
            Err(OptimiseError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_zero_revenue_candidates_discarded() {
        let current = assignment([(300, 300), (300, 300), (400, 400)]);
        let rates = PerType::new(TypeRates::default(), TypeRates::default(), TypeRates::default());
        assert!(matches!(
            ConstrainedOptimizer::default().optimise_blocking(&rates, &current),
            Err(OptimiseError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_equal_margin_prefers_current_assignment() {
        let current = assignment([(300, 300), (300, 300), (400, 400)]);
        let outcome = ConstrainedOptimizer::default()
            .optimise_blocking(&uniform_rates(), &current)
            .unwrap();
        assert_eq!(outcome.assignment, current);
        assert_eq!(outcome.distance_sq, 0);
    }

    #[test]
    fn test_equal_margin_prefers_nearest_grid_point() {
        let current = assignment([(310, 300), (290, 300), (400, 400)]);
        let outcome = ConstrainedOptimizer::default()
            .optimise_blocking(&uniform_rates(), &current)
            .unwrap();
        assert_eq!(outcome.assignment, assignment([(300, 300), (300, 300), (400, 400)]));
        assert_eq!(outcome.distance_sq, 200);
    }

    #[test]
    fn test_moves_volume_to_highest_margin_type() {
        let current = assignment([(300, 300), (300, 300), (400, 400)]);
        let outcome = ConstrainedOptimizer::default()
            .optimise_blocking(&stock_favoured_rates(), &current)
            .unwrap();
        assert_eq!(outcome.assignment, assignment([(0, 0), (0, 0), (1000, 1000)]));
        assert!((outcome.margin_pct - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_totals_preserved_and_bands_respected() {
        let currents = [
            assignment([(420, 400), (260, 280), (320, 310)]),
            assignment([(1000, 1050), (2000, 1900), (3000, 3100)]),
            assignment([(4_100, 4_300), (3_800, 3_500), (6_200, 6_600)]),
        ];
        let rates = PerType::new(
            TypeRates::new(0.0, 1.5, 21.0, 14.4),
            TypeRates::new(7.7, 4.9, 18.5, 12.75),
            TypeRates::new(12.1, 6.8, 17.0, 13.2),
        );
        for current in currents {
            let outcome = ConstrainedOptimizer::default()
                .optimise_blocking(&rates, &current)
                .unwrap();
            assert_eq!(outcome.assignment.total_in(), current.total_in());
            assert_eq!(outcome.assignment.total_out(), current.total_out());
            assert_within_bands(&outcome.assignment);
        }
    }

    struct RecordingProgress {
        values: Mutex<Vec<f64>>,
    }

    impl OptimiseProgress for RecordingProgress {
        fn report(&self, fraction: f64) {
            self.values.lock().unwrap().push(fraction);
        }
    }

    #[tokio::test]
    async fn test_async_optimise_reports_monotonic_progress() {
        let optimizer = ConstrainedOptimizer::new(OptimiserSettings {
            progress_interval: Duration::ZERO,
            yield_interval: Duration::ZERO,
        });
        let current = assignment([(300, 300), (300, 300), (400, 400)]);
        let progress = RecordingProgress {
            values: Mutex::new(Vec::new()),
        };

        let outcome = optimizer
            .optimise(&stock_favoured_rates(), &current, &progress, &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(outcome.assignment.stock.pallets_in, 1000);
        assert_eq!(outcome.iterations, count_iterations(1000, 50));

        let values = progress.values.lock().unwrap();
        assert_eq!(values.first(), Some(&0.0));
        assert_eq!(values.last(), Some(&1.0));
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_cancelled_search_returns_no_result() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let current = assignment([(300, 300), (300, 300), (400, 400)]);
        let result = ConstrainedOptimizer::default()
            .optimise(&uniform_rates(), &current, &NoOpProgress, &cancel)
            .await;
        assert_eq!(result.unwrap_err(), OptimiseError::Cancelled);
    }

    struct TimedProgress {
        reports: Mutex<Vec<(Instant, f64)>>,
    }

    impl OptimiseProgress for TimedProgress {
        fn report(&self, fraction: f64) {
            self.reports.lock().unwrap().push((Instant::now(), fraction));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_throttled_progress_and_cooperative_yield() {
        let settings = OptimiserSettings {
            progress_interval: Duration::from_millis(20),
            yield_interval: Duration::from_millis(10),
        };
        let optimizer = ConstrainedOptimizer::new(settings);
        let current = current_volumes();
        let progress = TimedProgress {
            reports: Mutex::new(Vec::new()),
        };

        // 单线程运行时: 只有优化器让出执行权时计数任务才能推进
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        });

        let outcome = optimizer
            .optimise(&uniform_rates(), &current, &progress, &CancellationFlag::new())
            .await
            .unwrap();
        let ticks_during_search = ticks.load(Ordering::SeqCst);
        ticker.abort();

        assert!(ticks_during_search > 0, "搜索期间其他任务应得到执行");
        assert_eq!(outcome.assignment.total_in(), current.total_in());
        assert_eq!(outcome.assignment.total_out(), current.total_out());

        let reports = progress.reports.lock().unwrap();
        assert!(reports.len() >= 3, "长时间搜索应有中间进度, 实际 {} 次", reports.len());
        assert_eq!(reports.first().map(|r| r.1), Some(0.0));
        assert_eq!(reports.last().map(|r| r.1), Some(1.0));
        assert!(reports.windows(2).all(|w| w[0].1 <= w[1].1));

        // 结束时的 1.0 不节流; 其余相邻上报间隔不小于进度间隔 (留 2ms 计时误差)
        let throttled = &reports[..reports.len() - 1];
        let tolerance = Duration::from_millis(2);
        for pair in throttled.windows(2) {
            let gap = pair[1].0.duration_since(pair[0].0);
            assert!(
                gap + tolerance >= settings.progress_interval,
                "进度上报间隔 {:?} 小于 {:?}",
                gap,
                settings.progress_interval
            );
        }
    }
}
