// ==========================================
// 托盘结构情景测算 - 输入快照仓储
// ==========================================
// 职责: 保存/读取表单输入 (Q1 汇总输入、Q2/Q3 工作簿输入、情景托盘量)
// 存储: input_snapshot 表 (snapshot_key → payload_json)
// 红线: 缺失或无法解析时回退到种子默认值, 不向上抛出解析错误
// ==========================================

use crate::domain::allocation::{AllocationInputs, MultiStreamInputs};
use crate::domain::defaults::{current_volumes, seed_allocation_inputs, seed_multi_stream_inputs};
use crate::domain::volume::VolumeAssignment;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// 快照键
pub mod snapshot_keys {
    pub const ALLOCATION_INPUTS: &str = "q1_inputs";
    pub const MULTI_STREAM_INPUTS: &str = "q2_q3_inputs";
    pub const SCENARIO_VOLUMES: &str = "scenario_volumes";
}

// ==========================================
// InputSnapshotRepository - 输入快照仓储
// ==========================================
pub struct InputSnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InputSnapshotRepository {
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

    /// 写入快照（覆盖）
    pub fn save<T: Serialize>(&self, key: &str, payload: &T) -> RepositoryResult<()> {
        let payload_json = serde_json::to_string(payload)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO input_snapshot (snapshot_key, payload_json, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(snapshot_key) DO UPDATE SET payload_json = ?2, saved_at = ?3
            "#,
            params![key, payload_json, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(snapshot_key = key, "输入快照已保存");
        Ok(())
    }

    /// 读取原始快照
    pub fn load_raw(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                "SELECT payload_json FROM input_snapshot WHERE snapshot_key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw)
    }

    /// 读取快照；缺失或解析失败时回退
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, fallback: impl FnOnce() -> T) -> RepositoryResult<T> {
        let raw = match self.load_raw(key)? {
            Some(raw) => raw,
            None => return Ok(fallback()),
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(snapshot_key = key, error = %e, "输入快照解析失败，使用默认值");
                Ok(fallback())
            }
        }
    }

    /// 删除快照
    pub fn clear(&self, key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM input_snapshot WHERE snapshot_key = ?1", params![key])?;
        Ok(affected > 0)
    }

    // ===== 具体快照 =====

    pub fn load_allocation_inputs(&self) -> RepositoryResult<AllocationInputs> {
        self.load_or(snapshot_keys::ALLOCATION_INPUTS, seed_allocation_inputs)
    }

    pub fn save_allocation_inputs(&self, inputs: &AllocationInputs) -> RepositoryResult<()> {
        self.save(snapshot_keys::ALLOCATION_INPUTS, inputs)
    }

    pub fn load_multi_stream_inputs(&self) -> RepositoryResult<MultiStreamInputs> {
        self.load_or(snapshot_keys::MULTI_STREAM_INPUTS, seed_multi_stream_inputs)
    }

    pub fn save_multi_stream_inputs(&self, inputs: &MultiStreamInputs) -> RepositoryResult<()> {
        self.save(snapshot_keys::MULTI_STREAM_INPUTS, inputs)
    }

    pub fn load_scenario_volumes(&self) -> RepositoryResult<VolumeAssignment> {
        self.load_or(snapshot_keys::SCENARIO_VOLUMES, current_volumes)
    }

    pub fn save_scenario_volumes(&self, volumes: &VolumeAssignment) -> RepositoryResult<()> {
        self.save(snapshot_keys::SCENARIO_VOLUMES, volumes)
    }
}
