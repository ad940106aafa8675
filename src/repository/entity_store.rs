// ==========================================
// CSV 批量导入 - 持久化协作方 Trait
// ==========================================
// 职责: 定义导入核心所需的实体存储接口（不包含实现）
// 红线: 导入核心只调用这些接口，不关心底层存储细节
// ==========================================

use crate::domain::FieldValue;
use crate::repository::error::{SaveError, StoreResult};

// ==========================================
// ImportEntity Trait
// ==========================================
// 用途: 可被导入流程逐字段赋值的实体
pub trait ImportEntity {
    /// 为字段赋值（覆盖原值）
    fn assign(&mut self, field: &str, value: FieldValue);

    /// 读取字段当前值
    fn get(&self, field: &str) -> Option<&FieldValue>;
}

// ==========================================
// Identifiable Trait
// ==========================================
// 用途: 关联记录解析器返回的实体，导入时只存其标识
pub trait Identifiable {
    fn identifier(&self) -> FieldValue;
}

// ==========================================
// EntityStore Trait
// ==========================================
// 用途: 实体创建、保存与事务边界
// 实现者: SqliteStore（使用 rusqlite）
pub trait EntityStore {
    type Entity: ImportEntity;

    /// 构造一个未持久化的新实体
    fn new_entity(&self) -> Self::Entity;

    /// 保存实体
    ///
    /// # 返回
    /// - Ok(()): 保存成功
    /// - Err(SaveError::Invalid): 实体未通过校验，未写入
    /// - Err(SaveError::Store): 存储层故障
    fn save(&self, entity: &mut Self::Entity) -> Result<(), SaveError>;

    /// 开启事务
    fn begin(&self) -> StoreResult<()>;

    /// 提交事务
    fn commit(&self) -> StoreResult<()>;

    /// 回滚事务
    fn rollback(&self) -> StoreResult<()>;
}
