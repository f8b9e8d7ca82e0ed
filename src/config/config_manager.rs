// ==========================================
// 托盘结构情景测算 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope, 当前只使用 global)
// ==========================================

use crate::config::config_reader::ModellerConfigReader;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::defaults::DEFAULT_SCOPE_ID;
use crate::engine::optimizer::OptimiserSettings;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 费率服务地址环境变量
pub const API_BASE_ENV: &str = "PALLET_MIX_API_BASE";

/// 默认费率服务地址
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::debug!(config_key = key, "配置已写入");
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置；格式错误时告警并回退默认值
    fn get_u64_or_default(&self, key: &str, default: u64) -> Result<u64, Box<dyn Error>> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "配置格式错误，使用默认值");
            default
        }))
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 返回
    /// - Ok(String): 配置快照的JSON字符串
    /// - Err: 获取失败
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        // 查询所有global scope的配置
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        // 序列化为JSON
        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会覆盖现有的global配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        // 解析JSON
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            let affected = tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
            count += affected;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// ModellerConfigReader Trait 实现
// ==========================================
impl ModellerConfigReader for ConfigManager {
    fn get_api_base_url(&self) -> Result<String, Box<dyn Error>> {
        if let Ok(value) = std::env::var(API_BASE_ENV) {
            if !value.trim().is_empty() {
                return Ok(value.trim().trim_end_matches('/').to_string());
            }
        }
        let value = self.get_config_or_default(config_keys::API_BASE_URL, DEFAULT_API_BASE_URL)?;
        Ok(value.trim().trim_end_matches('/').to_string())
    }

    fn get_default_scope_id(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::DEFAULT_SCOPE_ID, DEFAULT_SCOPE_ID)
    }

    fn get_http_timeout(&self) -> Result<Duration, Box<dyn Error>> {
        let secs = self.get_u64_or_default(config_keys::HTTP_TIMEOUT_SECS, 30)?;
        Ok(Duration::from_secs(secs))
    }

    fn get_optimiser_settings(&self) -> Result<OptimiserSettings, Box<dyn Error>> {
        let defaults = OptimiserSettings::default();
        let progress_ms = self.get_u64_or_default(
            config_keys::OPTIMISER_PROGRESS_INTERVAL_MS,
            defaults.progress_interval.as_millis() as u64,
        )?;
        let yield_ms = self.get_u64_or_default(
            config_keys::OPTIMISER_YIELD_INTERVAL_MS,
            defaults.yield_interval.as_millis() as u64,
        )?;
        Ok(OptimiserSettings {
            progress_interval: Duration::from_millis(progress_ms),
            yield_interval: Duration::from_millis(yield_ms),
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 费率服务
    pub const API_BASE_URL: &str = "api_base_url";
    pub const HTTP_TIMEOUT_SECS: &str = "http_timeout_secs";

    // 情景默认值
    pub const DEFAULT_SCOPE_ID: &str = "default_scope_id";

    // 优化器调度
    pub const OPTIMISER_PROGRESS_INTERVAL_MS: &str = "optimiser_progress_interval_ms";
    pub const OPTIMISER_YIELD_INTERVAL_MS: &str = "optimiser_yield_interval_ms";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_rows() {
        let config = in_memory();
        assert_eq!(config.get_default_scope_id().unwrap(), "p1_p9_avg");
        assert_eq!(config.get_http_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.get_optimiser_settings().unwrap(), OptimiserSettings::default());
    }

    #[test]
    fn test_bad_number_falls_back_to_default() {
        let config = in_memory();
        config
            .set_global_config_value(config_keys::OPTIMISER_PROGRESS_INTERVAL_MS, "fast")
            .unwrap();
        config
            .set_global_config_value(config_keys::OPTIMISER_YIELD_INTERVAL_MS, "10")
            .unwrap();
        let settings = config.get_optimiser_settings().unwrap();
        assert_eq!(settings.progress_interval, Duration::from_millis(80));
        assert_eq!(settings.yield_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_snapshot_round_trip_skips_meta_keys() {
        let source = in_memory();
        source.set_global_config_value(config_keys::DEFAULT_SCOPE_ID, "p10_avg").unwrap();
        let snapshot = source.get_config_snapshot().unwrap();

        let target = in_memory();
        let mut map: HashMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        map.insert("__meta_note".to_string(), "ignored".to_string());
        let restored = target
            .restore_config_from_snapshot(&serde_json::to_string(&map).unwrap())
            .unwrap();

        assert_eq!(restored, 1);
        assert_eq!(target.get_default_scope_id().unwrap(), "p10_avg");
        assert_eq!(target.get_global_config_value("__meta_note").unwrap(), None);
    }
}
