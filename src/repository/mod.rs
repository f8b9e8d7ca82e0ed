// ==========================================
// 托盘结构情景测算 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod input_snapshot_repo;
pub mod rate_scope_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use input_snapshot_repo::{snapshot_keys, InputSnapshotRepository};
pub use rate_scope_repo::{RateCatalog, RateCatalogEntry, RateScopeRepository};
