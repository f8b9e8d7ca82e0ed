// ==========================================
// 托盘结构情景测算 - 库存流量约束
// ==========================================
// 规则:
// - variance_pct_max = |总出托 - 总进托| / 总进托 (总进托非正时为 0)
// - 库存出托允许区间 = [floor(进托·(1-v)), ceil(进托·(1+v))], 下限不小于 0
// ==========================================

use crate::engine::error::FlowConstraintError;

/// 由总量计算允许的最大偏差比例
pub fn compute_variance_pct_max(total_in: u64, total_out: u64) -> f64 {
    if total_in == 0 {
        return 0.0;
    }
    total_out.abs_diff(total_in) as f64 / total_in as f64
}

/// 库存出托上下限
pub fn compute_stock_bounds(stock_in: u64, variance_pct: f64) -> (u64, u64) {
    let variance = variance_pct.max(0.0);
    let lower = (stock_in as f64 * (1.0 - variance)).floor();
    let upper = (stock_in as f64 * (1.0 + variance)).ceil();
    (lower.max(0.0) as u64, upper.max(0.0) as u64)
}

/// 校验库存出托是否满足流量约束
pub fn validate_stock_constraint(
    stock_in: u64,
    stock_out: u64,
    variance_pct: f64,
    variance_pct_max: f64,
) -> Result<(), FlowConstraintError> {
    if variance_pct > variance_pct_max {
        return Err(FlowConstraintError::VarianceAboveMax {
            variance_pct,
            variance_pct_max,
        });
    }

    let (lower, upper) = compute_stock_bounds(stock_in, variance_pct);
    if stock_out < lower || stock_out > upper {
        return Err(FlowConstraintError::StockOutOfBounds {
            stock_out,
            lower,
            upper,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_pct_max() {
        assert_eq!(compute_variance_pct_max(0, 10), 0.0);
        assert!((compute_variance_pct_max(187_471, 191_726) - 4_255.0 / 187_471.0).abs() < 1e-12);
    }

    #[test]
    fn test_stock_bounds_rounding() {
        let v = compute_variance_pct_max(187_471, 191_726);
        assert_eq!(compute_stock_bounds(100, v), (97, 103));
        assert_eq!(compute_stock_bounds(100, -0.5), (100, 100));
        assert_eq!(compute_stock_bounds(100, 0.005), (99, 101));
    }

    #[test]
    fn test_validate_stock_constraint() {
        let v = 0.005;
        assert!(validate_stock_constraint(100, 101, v, v).is_ok());
        assert!(matches!(
            validate_stock_constraint(100, 102, v, v),
            Err(FlowConstraintError::StockOutOfBounds { lower: 99, upper: 101, .. })
        ));
        assert!(matches!(
            validate_stock_constraint(100, 100, v + 0.01, v),
            Err(FlowConstraintError::VarianceAboveMax { .. })
        ));
    }
}
