// ==========================================
// 托盘结构情景测算 - 收入流领域模型 (Q2 / Q3)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 收入流来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSource {
    Derived, // 由 Q1 输入派生
    Direct,  // 直接录入
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::Derived => write!(f, "derived"),
            StreamSource::Direct => write!(f, "direct"),
        }
    }
}

// ==========================================
// StreamRow - Q2 收入流行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRow {
    pub id: String,
    pub label: String,
    pub revenue: f64,
    pub direct_cost: f64,
    pub indirect_cost: f64,
    pub central_cost: f64,
    pub total_cost: f64,
    pub margin_value: f64,
    /// margin_value / revenue，收入非正时为 None
    pub margin_pct: Option<f64>,
    pub source: StreamSource,
}

impl StreamRow {
    pub fn new(
        id: &str,
        label: &str,
        revenue: f64,
        direct_cost: f64,
        indirect_cost: f64,
        central_cost: f64,
        source: StreamSource,
    ) -> Self {
        let total_cost = direct_cost + indirect_cost + central_cost;
        let margin_value = revenue - total_cost;
        let margin_pct = if revenue > 0.0 {
            Some(margin_value / revenue)
        } else {
            None
        };
        Self {
            id: id.to_string(),
            label: label.to_string(),
            revenue,
            direct_cost,
            indirect_cost,
            central_cost,
            total_cost,
            margin_value,
            margin_pct,
            source,
        }
    }
}

// ==========================================
// ConcentrationRow - Q3 成本/收入集中度行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationRow {
    #[serde(flatten)]
    pub stream: StreamRow,
    /// 成本占比 (百分数)
    pub cost_share_pct: Option<f64>,
    /// 收入占比 (百分数)
    pub revenue_share_pct: Option<f64>,
    /// cost_share / revenue_share，收入占比非正时为 None
    pub cost_rev_ratio: Option<f64>,
    /// 高失衡标记（比值排名前三）
    pub flagged: bool,
}
