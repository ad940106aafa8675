// ==========================================
// CSV 批量导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: 文件级 (ParseError) / 行级 (TransformError, 实体校验)
//       / 批次级 (AggregateImportError)
// ==========================================

use crate::importer::template::{csv_writer, into_string};
use crate::repository::error::{StoreError, ValidationErrors};
use serde::Serialize;
use thiserror::Error;

// ==========================================
// 文件级错误：中止整个导入，不处理任何行
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid character encountered in row {row}, column {column} in the CSV file: {message}")]
    Encoding {
        row: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid CSV format: {0}")]
    MalformedFormat(String),
}

// ==========================================
// 行级错误：仅放弃当前行
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// header 为文件中该列的原始表头文本
    #[error("Failed to import column '{header}': {message}")]
    ColumnTransform { header: String, message: String },

    #[error("Unable to find referred record of value {0}")]
    ReferenceNotFound(String),

    /// find_existing 回调失败
    #[error("Failed to look up existing record: {0}")]
    FindExisting(String),
}

// ==========================================
// RowError - 单条导入错误
// ==========================================
// message: 错误消息；实体校验失败时为完整消息拼接
// validation: 实体校验失败的结构化明细
// row: 关联的原始单元格（文件级错误为空）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub message: String,
    pub validation: Option<ValidationErrors>,
    pub row: Vec<String>,
}

impl RowError {
    pub fn file_level(error: &ParseError) -> Self {
        Self {
            message: error.to_string(),
            validation: None,
            row: Vec::new(),
        }
    }

    pub fn transform(error: &TransformError, row: &[String]) -> Self {
        Self {
            message: error.to_string(),
            validation: None,
            row: row.to_vec(),
        }
    }

    pub fn invalid_entity(errors: ValidationErrors, row: &[String]) -> Self {
        Self {
            message: errors.to_string(),
            validation: Some(errors),
            row: row.to_vec(),
        }
    }

    pub fn is_file_level(&self) -> bool {
        self.row.is_empty()
    }
}

// ==========================================
// AggregateImportError - 批次级汇总错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("CSV import failed with {} error(s); {} row(s) imported", .errors.len(), .num_imported)]
pub struct AggregateImportError {
    /// 按行顺序排列的错误
    pub errors: Vec<RowError>,

    /// 文件中读取到的原始表头（文件级错误时为空）
    pub header_row: Vec<String>,

    /// 通过行级处理并保存的行数
    ///
    /// 未开启 partial_save 时事务已整体回滚，这里仍报告回滚前保存成功的行数，
    /// 实际落库行数为 0
    pub num_imported: usize,
}

impl AggregateImportError {
    /// 错误报告 CSV：原表头 + `Errors` 列，每个错误一行
    ///
    /// 文件级错误没有关联行，对应数据列留空
    pub fn error_report_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv_writer();

        let mut header: Vec<&str> = self.header_row.iter().map(String::as_str).collect();
        header.push("Errors");
        writer.write_record(&header)?;

        for error in &self.errors {
            let mut record: Vec<&str> = if error.is_file_level() {
                vec![""; self.header_row.len()]
            } else {
                error.row.iter().map(String::as_str).collect()
            };
            record.push(&error.message);
            writer.write_record(&record)?;
        }

        into_string(writer)
    }
}

// ==========================================
// ImportError - 导入调用的顶层错误
// ==========================================
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Aggregate(#[from] AggregateImportError),

    #[error("不支持的源文件编码: {0}")]
    UnsupportedEncoding(String),

    /// 存储层故障，事务已回滚
    #[error("存储层故障, 导入已回滚: {0}")]
    Store(#[from] StoreError),

    #[error("CSV 写出失败: {0}")]
    Csv(#[from] csv::Error),
}

impl ImportError {
    pub fn as_aggregate(&self) -> Option<&AggregateImportError> {
        match self {
            ImportError::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
