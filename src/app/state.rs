// ==========================================
// 托盘结构情景测算 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 不使用全局单例; 调用方持有 AppState 并按引用传递
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ApiError, ApiResult, HttpRatesClient, OptimiserService, ScenarioState, ScenarioStore, WorkbookApi};
use crate::config::{ConfigManager, ModellerConfigReader};
use crate::db::open_and_migrate;
use crate::repository::{InputSnapshotRepository, RateScopeRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 输入快照仓储
    pub snapshots: Arc<InputSnapshotRepository>,

    /// 本地费率口径仓储（同时作为本地费率来源）
    pub rate_scopes: Arc<RateScopeRepository>,

    /// Q1/Q2/Q3 工作簿API
    pub workbook_api: Arc<WorkbookApi>,

    /// 优化任务服务（单任务）
    pub optimiser: Arc<OptimiserService>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表
    /// 2. 初始化所有Repository
    /// 3. 按配置创建API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = open_and_migrate(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = Arc::new(
            ConfigManager::from_connection(conn.clone()).map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let snapshots = Arc::new(InputSnapshotRepository::from_connection(conn.clone()));
        let rate_scopes = Arc::new(RateScopeRepository::from_connection(conn));

        let settings = config
            .get_optimiser_settings()
            .map_err(|e| format!("无法读取优化器配置: {}", e))?;
        let optimiser = Arc::new(OptimiserService::new(settings));
        let workbook_api = Arc::new(WorkbookApi::new(snapshots.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config,
            snapshots,
            rate_scopes,
            workbook_api,
            optimiser,
        })
    }

    /// 按配置创建费率服务客户端
    pub fn http_rates_client(&self) -> ApiResult<HttpRatesClient> {
        let base_url = self
            .config
            .get_api_base_url()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let timeout = self
            .config
            .get_http_timeout()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        HttpRatesClient::new(base_url, timeout)
    }

    /// 以已保存的托盘量与默认口径创建情景状态仓
    pub fn scenario_store(&self, scope_id: Option<&str>) -> ApiResult<ScenarioStore> {
        let default_scope = self
            .config
            .get_default_scope_id()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let state = ScenarioState {
            scope_id: scope_id.map(str::to_string).unwrap_or(default_scope),
            inputs: self.snapshots.load_scenario_volumes()?,
            ..ScenarioState::default()
        };
        Ok(ScenarioStore::with_state(state))
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 PALLET_MIX_DB_PATH → 用户本地数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("PALLET_MIX_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./pallet_mix_modeller.db");

    if let Some(data_dir) = dirs::data_local_dir() {
        // 开发环境使用独立目录，避免污染正式数据
        let dir = if cfg!(debug_assertions) {
            data_dir.join("pallet-mix-modeller-dev")
        } else {
            data_dir.join("pallet-mix-modeller")
        };

        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("pallet_mix_modeller.db");
        }
    }

    path.to_string_lossy().to_string()
}
