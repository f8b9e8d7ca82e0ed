// ==========================================
// 托盘结构情景测算 - API 层
// ==========================================
// 职责: 用例门面 (情景状态仓、优化任务、工作簿) 与费率来源
// ==========================================

pub mod error;
pub mod optimiser_service;
pub mod rates_client;
pub mod rates_source;
pub mod scenario_store;
pub mod workbook_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use optimiser_service::{InFlightGuard, OptimiserService};
pub use rates_client::HttpRatesClient;
pub use rates_source::{RatesSource, RemoteScenario};
pub use scenario_store::{CrossCheckMismatch, CrossCheckReport, ScenarioState, ScenarioStore};
pub use workbook_api::{InputsTarget, StreamTable, WorkbookApi};
