// ==========================================
// 托盘结构情景测算 - 总量锁定再平衡
// ==========================================
// 场景: 锁定进托(或出托)总量时, 某一类型被修改, 其余两类按原占比吸收差额
// 规则:
// 1) remaining = max(0, 总量 - 新值)
// 2) remaining = 0 → 其余两类清零
// 3) 其余两类原值合计为 0 → 向下取整平分, 奇数余量给第二个类型
// 4) 否则按原占比分配, 向下取整后用最大余数法补足差额 (同余数按遍历顺序)
// 红线: 结果三项之和严格等于锁定总量, 且均为非负整数
// ==========================================

use crate::domain::types::{PerType, WorkType};

pub struct TotalsRebalancer {
    // 无状态
}

impl TotalsRebalancer {
    pub fn new() -> Self {
        Self {}
    }

    /// 再平衡
    ///
    /// # 参数
    /// - `current`: 修改前的三类取值
    /// - `changed`: 被修改的类型
    /// - `new_value`: 新值（超过总量时按总量截断）
    /// - `fixed_total`: 锁定总量
    pub fn rebalance(
        &self,
        current: &PerType<u64>,
        changed: WorkType,
        new_value: u64,
        fixed_total: u64,
    ) -> PerType<u64> {
        let new_value = new_value.min(fixed_total);
        let mut result = *current;
        result[changed] = new_value;

        let others = changed.others();
        let remaining = fixed_total - new_value;
        let sum_others: u64 = others.iter().map(|&wt| current[wt]).sum();

        if remaining == 0 {
            result[others[0]] = 0;
            result[others[1]] = 0;
            return result;
        }

        if sum_others == 0 {
            let split = remaining / 2;
            result[others[0]] = split;
            result[others[1]] = remaining - split;
            return result;
        }

        // 精确占比 = prior / sum_others * remaining，用整数运算避免浮点误差
        let mut allocations: Vec<(WorkType, u64, u128)> = others
            .iter()
            .map(|&wt| {
                let numerator = current[wt] as u128 * remaining as u128;
                let floored = (numerator / sum_others as u128) as u64;
                let fraction = numerator % sum_others as u128;
                (wt, floored, fraction)
            })
            .collect();

        let assigned: u64 = allocations.iter().map(|(_, floored, _)| *floored).sum();
        let mut shortfall = remaining - assigned;

        // 稳定排序: 余数相同时保持遍历顺序
        allocations.sort_by(|a, b| b.2.cmp(&a.2));
        for allocation in allocations.iter_mut() {
            if shortfall == 0 {
                break;
            }
            allocation.1 += 1;
            shortfall -= 1;
        }

        for (wt, value, _) in allocations {
            result[wt] = value;
        }

        result
    }
}

impl Default for TotalsRebalancer {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn abc(a: u64, b: u64, c: u64) -> PerType<u64> {
        PerType::new(a, b, c)
    }

    #[test]
    fn test_proportional_split() {
        let result = TotalsRebalancer::new().rebalance(&abc(40, 30, 30), WorkType::Consolidation, 70, 100);
        assert_eq!(result, abc(70, 15, 15));
    }

    #[test]
    fn test_zero_remaining() {
        let result = TotalsRebalancer::new().rebalance(&abc(40, 30, 30), WorkType::Consolidation, 100, 100);
        assert_eq!(result, abc(100, 0, 0));
    }

    #[test]
    fn test_zero_basis_floor_split() {
        let result = TotalsRebalancer::new().rebalance(&abc(50, 0, 0), WorkType::Consolidation, 20, 50);
        assert_eq!(result, abc(20, 15, 15));

        let odd = TotalsRebalancer::new().rebalance(&abc(50, 0, 0), WorkType::Consolidation, 19, 50);
        assert_eq!(odd, abc(19, 15, 16));
    }

    #[test]
    fn test_largest_remainder_gets_shortfall() {
        // remaining=10 按 1:2 → 3.333 / 6.667 → 3 / 7
        let result = TotalsRebalancer::new().rebalance(&abc(10, 20, 70), WorkType::Stock, 90, 100);
        assert_eq!(result, abc(3, 7, 90));
    }

    #[test]
    fn test_equal_remainders_break_by_order() {
        // remaining=5 按 1:1 → 2.5 / 2.5 → 先遍历的拼箱得 3
        let result = TotalsRebalancer::new().rebalance(&abc(10, 10, 10), WorkType::Stock, 95, 100);
        assert_eq!(result, abc(3, 2, 95));
    }

    #[test]
    fn test_sum_invariant_holds() {
        let rebalancer = TotalsRebalancer::new();
        let starts = [abc(40, 30, 30), abc(1, 0, 99), abc(7, 13, 0), abc(0, 0, 0), abc(333, 333, 334)];
        for start in starts {
            for changed in WorkType::ALL {
                for new_value in [0u64, 1, 17, 50, 99, 100, 150] {
                    let result = rebalancer.rebalance(&start, changed, new_value, 100);
                    assert_eq!(result.sum(), 100, "start={:?} changed={} new={}", start, changed, new_value);
                }
            }
        }
    }
}
