// ==========================================
// 托盘结构情景测算 - 费率服务 HTTP 客户端
// ==========================================
// 接口:
// - GET  /api/rates/scopes        → [ScopeItem]
// - GET  /api/rates?scope=...     → RatesSnapshot
// - POST /api/scenario/run        → ScenarioResult (仅用于交叉核对)
// 红线: 非 2xx 与网络失败统一为 RemoteFailure, 携带响应正文
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::rates_source::{RatesSource, RemoteScenario};
use crate::domain::rates::{RatesSnapshot, ScopeItem};
use crate::domain::scenario::ScenarioResult;
use crate::domain::types::PerType;
use crate::domain::volume::{PalletVolume, VolumeAssignment};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// 情景计算请求体
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRunRequest<'a> {
    pub scope_id: &'a str,
    pub inputs: &'a PerType<PalletVolume>,
}

// ==========================================
// HttpRatesClient - 费率服务客户端
// ==========================================
#[derive(Clone)]
pub struct HttpRatesClient {
    client: Client,
    base_url: String,
}

impl HttpRatesClient {
    /// 创建客户端
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::RemoteFailure(format!("HTTP 客户端创建失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 统一处理响应：非 2xx 时读取正文作为错误信息
    async fn handle<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote_failure(status, &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::RemoteFailure(format!("响应解析失败: {}", e)))
    }
}

fn remote_failure(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(if body.is_empty() { status.to_string() } else { body.to_string() });
    }
    let message = if body.trim().is_empty() {
        format!("请求失败 ({})", status)
    } else {
        format!("{} ({})", body.trim(), status)
    };
    ApiError::RemoteFailure(message)
}

#[async_trait]
impl RatesSource for HttpRatesClient {
    #[instrument(skip(self))]
    async fn list_scopes(&self) -> ApiResult<Vec<ScopeItem>> {
        let response = self.client.get(self.url("/api/rates/scopes")).send().await?;
        let scopes: Vec<ScopeItem> = Self::handle(response).await?;
        debug!(scope_count = scopes.len(), "口径列表已获取");
        Ok(scopes)
    }

    #[instrument(skip(self))]
    async fn get_rates(&self, scope_id: &str) -> ApiResult<RatesSnapshot> {
        let response = self
            .client
            .get(self.url("/api/rates"))
            .query(&[("scope", scope_id)])
            .send()
            .await?;
        Self::handle(response).await
    }
}

#[async_trait]
impl RemoteScenario for HttpRatesClient {
    #[instrument(skip(self, inputs))]
    async fn run_scenario(&self, scope_id: &str, inputs: &VolumeAssignment) -> ApiResult<ScenarioResult> {
        let request = ScenarioRunRequest { scope_id, inputs };
        let response = self
            .client
            .post(self.url("/api/scenario/run"))
            .json(&request)
            .send()
            .await?;
        Self::handle(response).await
    }
}
