// ==========================================
// 托盘结构情景测算 - 费率口径仓储
// ==========================================
// 职责: 本地费率口径 (scope) 存取, 支持导入费率目录 JSON
// 目录格式: { scope_id: { label, types: { consolidation|groupage|stock: {...} } } }
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::rates::{RateTable, RatesSnapshot, ScopeItem};
use crate::domain::types::WorkType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// 费率目录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCatalogEntry {
    pub label: String,
    pub types: RateTable,
}

/// 费率目录（按 scope_id 排序）
pub type RateCatalog = BTreeMap<String, RateCatalogEntry>;

// ==========================================
// RateScopeRepository - 费率口径仓储
// ==========================================
pub struct RateScopeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RateScopeRepository {
    /// 从已有连接创建仓储实例（表由 db::ensure_schema 创建）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入/覆盖单个口径
    pub fn upsert(&self, scope_id: &str, entry: &RateCatalogEntry) -> RepositoryResult<()> {
        validate_entry(scope_id, entry)?;
        let rates_json = serde_json::to_string(&entry.types)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO rate_scope (scope_id, label, rates_json) VALUES (?1, ?2, ?3)
            ON CONFLICT(scope_id) DO UPDATE SET label = ?2, rates_json = ?3
            "#,
            params![scope_id, entry.label, rates_json],
        )?;
        Ok(())
    }

    /// 导入费率目录 JSON（单事务）
    ///
    /// # 返回
    /// - 导入的口径数量
    pub fn import_catalog_json(&self, raw: &str) -> RepositoryResult<usize> {
        let catalog: RateCatalog = serde_json::from_str(raw)?;
        for (scope_id, entry) in catalog.iter() {
            validate_entry(scope_id, entry)?;
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for (scope_id, entry) in catalog.iter() {
            tx.execute(
                r#"
                INSERT INTO rate_scope (scope_id, label, rates_json) VALUES (?1, ?2, ?3)
                ON CONFLICT(scope_id) DO UPDATE SET label = ?2, rates_json = ?3
                "#,
                params![scope_id, entry.label, serde_json::to_string(&entry.types)?],
            )?;
        }
        tx.commit()?;

        tracing::info!(scope_count = catalog.len(), "费率目录导入完成");
        Ok(catalog.len())
    }

    /// 列出所有口径
    pub fn list_scopes(&self) -> RepositoryResult<Vec<ScopeItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT scope_id, label FROM rate_scope ORDER BY scope_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ScopeItem {
                id: row.get(0)?,
                label: row.get(1)?,
            })
        })?;

        let mut scopes = Vec::new();
        for row in rows {
            scopes.push(row?);
        }
        Ok(scopes)
    }

    /// 按口径读取费率
    ///
    /// # 返回
    /// - NotFound: 口径不存在
    pub fn get_rates(&self, scope_id: &str) -> RepositoryResult<RatesSnapshot> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT label, rates_json FROM rate_scope WHERE scope_id = ?1",
                params![scope_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let (label, rates_json) = row.ok_or_else(|| RepositoryError::NotFound {
            entity: "rate_scope".to_string(),
            id: scope_id.to_string(),
        })?;
        let types: RateTable = serde_json::from_str(&rates_json)?;

        Ok(RatesSnapshot {
            scope_id: scope_id.to_string(),
            scope_label: label,
            types,
        })
    }
}

fn validate_entry(scope_id: &str, entry: &RateCatalogEntry) -> RepositoryResult<()> {
    if scope_id.trim().is_empty() {
        return Err(RepositoryError::ValidationError("scope_id 不能为空".to_string()));
    }
    for wt in WorkType::ALL {
        if !entry.types[wt].is_valid() {
            return Err(RepositoryError::ValidationError(format!(
                "口径 {} 的 {} 费率必须为有限非负数",
                scope_id, wt
            )));
        }
    }
    Ok(())
}
