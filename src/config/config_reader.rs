// ==========================================
// 托盘结构情景测算 - 配置读取 Trait
// ==========================================
// 职责: 定义 API 层所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::engine::optimizer::OptimiserSettings;
use std::error::Error;
use std::time::Duration;

// ==========================================
// ModellerConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait ModellerConfigReader: Send + Sync {
    /// 费率服务地址
    ///
    /// # 默认值
    /// - http://localhost:8000 (环境变量 PALLET_MIX_API_BASE 优先)
    fn get_api_base_url(&self) -> Result<String, Box<dyn Error>>;

    /// 启动时选中的费率口径
    ///
    /// # 默认值
    /// - p1_p9_avg
    fn get_default_scope_id(&self) -> Result<String, Box<dyn Error>>;

    /// HTTP 请求超时
    ///
    /// # 默认值
    /// - 30 秒
    fn get_http_timeout(&self) -> Result<Duration, Box<dyn Error>>;

    /// 优化器进度上报 / 让出执行权间隔
    ///
    /// # 默认值
    /// - 80ms / 120ms
    fn get_optimiser_settings(&self) -> Result<OptimiserSettings, Box<dyn Error>>;
}
