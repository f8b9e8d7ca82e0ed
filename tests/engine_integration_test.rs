// ==========================================
// 引擎集成测试
// ==========================================
// 测试目标: Q1 分摊 → 派生费率 → 情景评估 → 约束优化 全链路
// ==========================================

mod test_helpers;

use pallet_mix_modeller::domain::defaults::{current_volumes, seed_allocation_inputs};
use pallet_mix_modeller::domain::WorkType;
use pallet_mix_modeller::engine::{feasibility_band, AllocationEngine, ConstrainedOptimizer, ScenarioEvaluator};
use test_helpers::assignment;

#[test]
fn test_derived_rates_reproduce_allocated_totals() {
    println!("\n=== 测试: 派生费率回代当前托盘量 ===");

    let inputs = seed_allocation_inputs();
    let report = AllocationEngine::new().allocate(&inputs).expect("种子输入完整");
    let rates = report.rate_table().expect("派生费率表");

    let volumes = current_volumes();
    let result = ScenarioEvaluator::new().evaluate(&rates, &volumes);

    // 进托量按站点合计, 出托量与种子一致时, 回代收入等于分摊收入
    let allocated_revenue: f64 = WorkType::ALL
        .iter()
        .map(|&wt| report.transport_revenue[wt].revenue + report.warehouse_revenue[wt].total_revenue)
        .sum();
    let in_matches = WorkType::ALL
        .iter()
        .all(|&wt| report.warehouse_revenue[wt].pallets_in == volumes[wt].pallets_in as f64);
    let out_matches = WorkType::ALL
        .iter()
        .all(|&wt| report.transport_revenue[wt].pallets_out == volumes[wt].pallets_out as f64);

    if in_matches && out_matches {
        let diff = (result.totals.total_revenue - allocated_revenue).abs();
        assert!(diff < 1e-6 * allocated_revenue.max(1.0), "回代收入应一致, 差额 {}", diff);
    }
    assert!(result.totals.total_revenue > 0.0);
    assert!(
        (result.totals.total_margin - (result.totals.total_revenue - result.totals.total_cost)).abs() < 1e-6,
        "毛利 = 收入 - 成本"
    );
}

#[test]
fn test_optimiser_with_derived_rates() {
    println!("\n=== 测试: 派生费率下的约束优化 ===");

    let report = AllocationEngine::new()
        .allocate(&seed_allocation_inputs())
        .expect("种子输入完整");
    let rates = report.rate_table().expect("派生费率表");

    // 各项均为步长 100 的整数倍, 当前分配本身即是网格候选
    let current = assignment([(300, 300), (400, 400), (1_100, 1_000)]);
    let evaluator = ScenarioEvaluator::new();
    let before = evaluator.objective(&rates, &current);

    let outcome = ConstrainedOptimizer::default()
        .optimise_blocking(&rates, &current)
        .expect("应存在可行解");
    let after = evaluator.objective(&rates, &outcome.assignment);

    assert_eq!(outcome.assignment.total_in(), current.total_in(), "总进托不变");
    assert_eq!(outcome.assignment.total_out(), current.total_out(), "总出托不变");
    for wt in WorkType::ALL {
        let (lo, hi) = feasibility_band(outcome.assignment[wt].pallets_in);
        let out = outcome.assignment[wt].pallets_out;
        assert!(out >= lo && out <= hi, "{} 出托 {} 不在 [{}, {}] 内", wt, out, lo, hi);
    }

    let pct_after = after.margin_pct().expect("最优解收入为正");
    assert!((pct_after - outcome.margin_pct).abs() < 1e-9, "结果毛利率应与评估一致");
    assert_eq!(outcome.step, 100, "最大总量 1800 时步长为 100");
    let pct_before = before.margin_pct().expect("当前分配收入为正");
    assert!(
        pct_after + 1e-9 >= pct_before,
        "最优解毛利率 {} 不应低于当前 {}",
        pct_after,
        pct_before
    );
    println!("  step={} iterations={} margin_pct={:.4}", outcome.step, outcome.iterations, outcome.margin_pct);
}

#[test]
fn test_stock_flow_constraint_on_current_volumes() {
    use pallet_mix_modeller::engine::{compute_stock_bounds, compute_variance_pct_max, validate_stock_constraint};

    let volumes = current_volumes();
    let variance_max = compute_variance_pct_max(volumes.total_in(), volumes.total_out());
    assert!(variance_max > 0.0 && variance_max < 0.1, "当前总量差异应在 10% 以内");

    // 库存出托按总量差异上限放行
    let (lo, hi) = compute_stock_bounds(volumes.stock.pallets_in, variance_max);
    assert!(validate_stock_constraint(volumes.stock.pallets_in, lo, variance_max, variance_max).is_ok());
    assert!(validate_stock_constraint(volumes.stock.pallets_in, hi, variance_max, variance_max).is_ok());
    assert!(validate_stock_constraint(volumes.stock.pallets_in, hi + 1, variance_max, variance_max).is_err());

    // 当前库存出托偏差超过总量差异上限
    assert!(validate_stock_constraint(volumes.stock.pallets_in, volumes.stock.pallets_out, variance_max, variance_max).is_err());
}
