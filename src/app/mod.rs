// ==========================================
// 托盘结构情景测算 - 应用层
// ==========================================
// 职责: 装配仓储、配置、API 实例, 供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
