// ==========================================
// CSV 批量导入 - 配置层
// ==========================================
// 职责: 导入选项定义与持久化读取
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_options;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager, ImportOptionsReader};
pub use import_options::ImportOptions;
