// ==========================================
// CSV 批量导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含导入业务逻辑
// ==========================================
// 职责: 提供实体存储接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod entity_store;
pub mod error;
pub mod sqlite_store;

// 重导出核心仓储
pub use entity_store::{EntityStore, Identifiable, ImportEntity};
pub use error::{SaveError, StoreError, StoreResult, ValidationErrors};
pub use sqlite_store::{SqliteRecord, SqliteStore};
