// ==========================================
// CSV 批量导入 - 核心库
// ==========================================
// 声明式列映射: 表头 → 实体字段
// 行级错误汇总，整体回滚或部分提交
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值类型
pub mod domain;

// 数据仓储层 - 实体存储
pub mod repository;

// 导入层 - CSV 导入
pub mod importer;

// 配置层 - 导入选项
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigManager, ImportOptions, ImportOptionsReader};
pub use domain::FieldValue;
pub use importer::{
    AggregateImportError, ColumnSpec, CsvImporter, ImportConfiguration, ImportError,
    ImportResult, Mapping, RowError, RowFieldMap, ValueMethods,
};
pub use repository::{
    EntityStore, Identifiable, ImportEntity, SaveError, SqliteRecord, SqliteStore, StoreError,
    ValidationErrors,
};

// ==========================================
// 常量定义
// ==========================================

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
