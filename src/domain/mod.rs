// ==========================================
// CSV 批量导入 - 领域模型层
// ==========================================
// 职责: 定义导入过程中流转的值类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod display_name;
pub mod field_value;

// 重导出核心类型
pub use display_name::humanize;
pub use field_value::FieldValue;
