// ==========================================
// CSV 批量导入 - 导入层
// ==========================================
// 职责: CSV 文本 → 实体记录（经 EntityStore 持久化）
// 流程: 文件解析 → 表头映射 → 值转换 → 记录定位 → 保存 → 事务收尾
// ==========================================

// 模块声明
pub mod csv_importer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_config;
pub mod record_resolver;
pub mod template;
pub mod value_methods;
pub mod value_transformer;

// 重导出核心类型
pub use csv_importer::{CsvImporter, ImportOutcome};
pub use error::{
    AggregateImportError, ImportError, ImportResult, ParseError, RowError, TransformError,
};
pub use field_mapper::{build_row_field_map, translate_column, FieldMapper};
pub use file_parser::{CsvParser, ParsedTable};
pub use import_config::{
    ColumnSpec, Conversion, FindExistingFn, ImportConfiguration, Mapping, ReferenceFn,
    RowFieldMap, ValueFn,
};
pub use record_resolver::resolve_record;
pub use template::generate_template;
pub use value_methods::{parse_yes_no, ValueMethods};
pub use value_transformer::ValueTransformer;
