// ==========================================
// 托盘结构情景测算 - API层错误类型
// ==========================================
// 职责: 统一引擎/仓储/导入/远程错误，转换为用户可读的错误消息
// 红线: 输入不完整 与 无可行解 必须可区分
// ==========================================

use crate::engine::error::{AllocationError, FlowConstraintError, OptimiseError};
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("输入不完整 ({calculation}): 缺少 {}", missing.join(", "))]
    IncompleteInput { calculation: String, missing: Vec<String> },

    #[error("无可行解: {0}")]
    Infeasible(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("费率未加载: scope_id={0}")]
    RatesUnavailable(String),

    // ==========================================
    // 优化任务错误
    // ==========================================
    #[error("已有优化任务在运行")]
    OptimisationInProgress,

    #[error("优化任务已取消")]
    OptimisationCancelled,

    // ==========================================
    // 外部依赖错误
    // ==========================================
    #[error("远程服务调用失败: {0}")]
    RemoteFailure(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => ApiError::NotFound(format!("{}(id={})不存在", entity, id)),
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::JsonError(msg) => ApiError::InvalidInput(format!("JSON 格式错误: {}", msg)),
            RepositoryError::LockError(msg) => ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg)),
            RepositoryError::DatabaseQueryError(msg) | RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(msg)
            }
            RepositoryError::Other(e) => ApiError::Other(e),
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::IncompleteInput { calculation, missing } => ApiError::IncompleteInput {
                calculation: calculation.to_string(),
                missing,
            },
            AllocationError::DegenerateDivision { quantity } => {
                ApiError::InvalidInput(format!("单托值未定义 (分母为零): {}", quantity))
            }
        }
    }
}

impl From<OptimiseError> for ApiError {
    fn from(err: OptimiseError) -> Self {
        match err {
            OptimiseError::Infeasible { reason } => ApiError::Infeasible(reason),
            OptimiseError::Cancelled => ApiError::OptimisationCancelled,
        }
    }
}

impl From<FlowConstraintError> for ApiError {
    fn from(err: FlowConstraintError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportError(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::RemoteFailure(err.to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::from(RepositoryError::from(err))
    }
}

/// API层Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "rate_scope".to_string(),
            id: "p0".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(msg) if msg.contains("p0")));
    }

    #[test]
    fn test_engine_errors_stay_distinguishable() {
        let incomplete: ApiError = AllocationError::IncompleteInput {
            calculation: "transport_revenue",
            missing: vec!["pallets_out_stock".to_string()],
        }
        .into();
        let infeasible: ApiError = OptimiseError::Infeasible {
            reason: "out of band".to_string(),
        }
        .into();
        assert!(matches!(incomplete, ApiError::IncompleteInput { .. }));
        assert!(matches!(infeasible, ApiError::Infeasible(_)));
        assert!(matches!(ApiError::from(OptimiseError::Cancelled), ApiError::OptimisationCancelled));
    }
}
