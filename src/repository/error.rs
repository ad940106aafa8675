// ==========================================
// CSV 批量导入 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 区分: 基础设施错误 (StoreError) / 实体校验失败 (ValidationErrors)
// ==========================================

use crate::domain::humanize;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    // ===== 数据库错误 =====
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 配置错误 =====
    #[error("非法的表名或列名: {0}")]
    InvalidIdentifier(String),

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    StoreError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    StoreError::ForeignKeyViolation(msg)
                } else {
                    StoreError::DatabaseQueryError(msg)
                }
            }
            _ => StoreError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type StoreResult<T> = Result<T, StoreError>;

// ==========================================
// ValidationErrors - 实体校验失败明细
// ==========================================
// 按字段记录失败原因，保持插入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    entries: Vec<(String, String)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录字段 `field` 的一条失败原因
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.entries.push((field.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 某字段的全部失败原因
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    /// 带字段标签的完整消息，例如 `Name can't be blank`
    pub fn full_messages(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(field, message)| format!("{} {}", humanize(field), message))
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

// ==========================================
// SaveError - 保存失败
// ==========================================
#[derive(Error, Debug)]
pub enum SaveError {
    /// 实体未通过校验（行级错误，仅放弃当前行）
    #[error("{0}")]
    Invalid(ValidationErrors),

    /// 存储层故障（批次级错误，整批回滚）
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_messages_use_display_label() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "can't be blank");
        errors.add("unit_price", "must be positive");

        assert_eq!(
            errors.full_messages(),
            vec!["Name can't be blank", "Unit price must be positive"]
        );
        assert_eq!(errors.on("name"), vec!["can't be blank"]);
        assert_eq!(errors.to_string(), "Name can't be blank, Unit price must be positive");
    }

    #[test]
    fn test_unique_violation_mapping() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(2067),
            Some("UNIQUE constraint failed: items.sku".to_string()),
        );
        assert!(matches!(
            StoreError::from(err),
            StoreError::UniqueConstraintViolation(_)
        ));
    }
}
