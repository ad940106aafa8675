// ==========================================
// CSV 批量导入 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表加载导入选项，缺省时回退默认值
// 存储: config_kv 表 (scope_id + key → value)
// ==========================================

use crate::config::import_options::ImportOptions;
use crate::db::{open_sqlite_connection, table_exists};
use crate::repository::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// ImportOptionsReader Trait
// ==========================================
// 用途: 导入调用方读取持久化的默认选项
// 实现者: ConfigManager
pub trait ImportOptionsReader {
    /// 加载导入选项
    ///
    /// # 返回
    /// - Ok(ImportOptions): 未配置的项取默认值
    /// - Err: 数据库错误或配置值格式错误
    fn load_import_options(&self) -> StoreResult<ImportOptions>;
}

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
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在（含 config_kv 表不存在）
    pub fn get_config_value(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;

        if !table_exists(&conn, "config_kv")? {
            return Ok(None);
        }

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（表不存在时创建）
    pub fn set_config_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            )
            "#,
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }
}

impl ImportOptionsReader for ConfigManager {
    fn load_import_options(&self) -> StoreResult<ImportOptions> {
        let mut options = ImportOptions::default();

        if let Some(raw) = self.get_config_value(config_keys::PARTIAL_SAVE)? {
            options.partial_save = parse_flag(config_keys::PARTIAL_SAVE, &raw)?;
        }

        if let Some(raw) = self.get_config_value(config_keys::SOURCE_ENCODING)? {
            let label = raw.trim();
            if !label.is_empty() {
                options.source_encoding = Some(label.to_string());
            }
        }

        debug!(
            partial_save = options.partial_save,
            source_encoding = ?options.source_encoding,
            "导入选项加载完成"
        );
        Ok(options)
    }
}

/// 解析布尔配置（接受 JSON 布尔值及 1/0）
fn parse_flag(key: &str, raw: &str) -> StoreResult<bool> {
    match raw.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => serde_json::from_str::<bool>(other).map_err(|e| StoreError::ConfigValueError {
            key: key.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        }),
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 部分提交
    pub const PARTIAL_SAVE: &str = "csv_import/partial_save";

    // 源文件编码
    pub const SOURCE_ENCODING: &str = "csv_import/source_encoding";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn create_manager() -> ConfigManager {
        ConfigManager::from_connection(Arc::new(Mutex::new(open_in_memory().unwrap())))
    }

    #[test]
    fn test_defaults_without_config_table() {
        let manager = create_manager();
        let options = manager.load_import_options().unwrap();
        assert_eq!(options, ImportOptions::default());
    }

    #[test]
    fn test_load_stored_options() {
        let manager = create_manager();
        manager
            .set_config_value(config_keys::PARTIAL_SAVE, "true")
            .unwrap();
        manager
            .set_config_value(config_keys::SOURCE_ENCODING, "windows-1252")
            .unwrap();

        let options = manager.load_import_options().unwrap();
        assert!(options.partial_save);
        assert_eq!(options.source_encoding.as_deref(), Some("windows-1252"));
    }

    #[test]
    fn test_numeric_flag() {
        let manager = create_manager();
        manager.set_config_value(config_keys::PARTIAL_SAVE, "1").unwrap();
        assert!(manager.load_import_options().unwrap().partial_save);
    }

    #[test]
    fn test_malformed_flag_is_error() {
        let manager = create_manager();
        manager
            .set_config_value(config_keys::PARTIAL_SAVE, "sometimes")
            .unwrap();

        let result = manager.load_import_options();
        assert!(matches!(result, Err(StoreError::ConfigValueError { .. })));
    }
}
