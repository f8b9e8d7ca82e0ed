// ==========================================
// 托盘结构情景测算 - 费率来源 Trait
// ==========================================
// 职责: 抽象费率口径来源 (远程 HTTP / 本地 SQLite)
// 说明: ScenarioStore 只依赖 trait, 宿主决定使用哪种来源
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::rates::{RatesSnapshot, ScopeItem};
use crate::domain::scenario::ScenarioResult;
use crate::domain::volume::VolumeAssignment;
use crate::repository::rate_scope_repo::RateScopeRepository;
use async_trait::async_trait;

// ==========================================
// RatesSource Trait
// ==========================================
#[async_trait]
pub trait RatesSource: Send + Sync {
    /// 列出可选口径
    async fn list_scopes(&self) -> ApiResult<Vec<ScopeItem>>;

    /// 读取口径费率
    ///
    /// # 返回
    /// - NotFound: 口径不存在
    async fn get_rates(&self, scope_id: &str) -> ApiResult<RatesSnapshot>;
}

// ==========================================
// RemoteScenario Trait
// ==========================================
// 远程情景计算，仅用于与本地评估结果交叉核对
#[async_trait]
pub trait RemoteScenario: Send + Sync {
    async fn run_scenario(&self, scope_id: &str, inputs: &VolumeAssignment) -> ApiResult<ScenarioResult>;
}

// ==========================================
// 本地 SQLite 费率来源
// ==========================================
#[async_trait]
impl RatesSource for RateScopeRepository {
    async fn list_scopes(&self) -> ApiResult<Vec<ScopeItem>> {
        Ok(RateScopeRepository::list_scopes(self)?)
    }

    async fn get_rates(&self, scope_id: &str) -> ApiResult<RatesSnapshot> {
        Ok(RateScopeRepository::get_rates(self, scope_id)?)
    }
}
