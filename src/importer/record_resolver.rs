// ==========================================
// CSV 批量导入 - 目标记录解析
// ==========================================
// 职责: 决定当前行更新已有记录还是新建记录
// ==========================================

use crate::importer::error::TransformError;
use crate::importer::import_config::{FindExistingFn, RowFieldMap};
use crate::repository::EntityStore;
use tracing::trace;

/// 解析当前行的目标实体
///
/// find_existing 命中则返回已有实体，否则由存储构造新实体
///
/// 查找失败时返回 FindExisting，调用方放弃当前行（不回退为新建，避免重复记录）
pub fn resolve_record<S: EntityStore>(
    store: &S,
    find_existing: Option<&FindExistingFn<S::Entity>>,
    row: &RowFieldMap,
) -> Result<S::Entity, TransformError> {
    let Some(find) = find_existing else {
        return Ok(store.new_entity());
    };

    match find(row) {
        Ok(Some(existing)) => {
            trace!("命中已有记录，按更新处理");
            Ok(existing)
        }
        Ok(None) => Ok(store.new_entity()),
        Err(e) => Err(TransformError::FindExisting(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;
    use crate::repository::{ImportEntity, SaveError, StoreResult};
    use std::collections::HashMap;

    #[derive(Debug, Default, PartialEq)]
    struct Item {
        fields: HashMap<String, FieldValue>,
    }

    impl ImportEntity for Item {
        fn assign(&mut self, field: &str, value: FieldValue) {
            self.fields.insert(field.to_string(), value);
        }

        fn get(&self, field: &str) -> Option<&FieldValue> {
            self.fields.get(field)
        }
    }

    struct NullStore;

    impl EntityStore for NullStore {
        type Entity = Item;

        fn new_entity(&self) -> Item {
            Item::default()
        }

        fn save(&self, _entity: &mut Item) -> Result<(), SaveError> {
            Ok(())
        }

        fn begin(&self) -> StoreResult<()> {
            Ok(())
        }

        fn commit(&self) -> StoreResult<()> {
            Ok(())
        }

        fn rollback(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn row(name: &str) -> RowFieldMap {
        let mut row = RowFieldMap::new();
        row.insert("name".to_string(), name.to_string());
        row
    }

    #[test]
    fn test_without_find_existing_always_new() {
        let record = resolve_record(&NullStore, None, &row("Material1")).unwrap();
        assert_eq!(record, Item::default());
    }

    #[test]
    fn test_find_existing_hit_and_miss() {
        let find: FindExistingFn<Item> = Box::new(|row: &RowFieldMap| {
            Ok((row.get("name").map(String::as_str) == Some("Material1")).then(|| {
                let mut item = Item::default();
                item.assign("name", FieldValue::from("Material1"));
                item
            }))
        });

        let hit = resolve_record(&NullStore, Some(&find), &row("Material1")).unwrap();
        assert_eq!(hit.get("name"), Some(&FieldValue::from("Material1")));

        let miss = resolve_record(&NullStore, Some(&find), &row("Material2")).unwrap();
        assert_eq!(miss, Item::default());
    }

    #[test]
    fn test_failed_lookup_is_not_a_miss() {
        let find: FindExistingFn<Item> =
            Box::new(|_row: &RowFieldMap| anyhow::bail!("no such table: materials"));

        let err = resolve_record(&NullStore, Some(&find), &row("Material1")).unwrap_err();
        assert_eq!(
            err,
            TransformError::FindExisting("no such table: materials".to_string())
        );
        assert_eq!(
            err.to_string(),
            "Failed to look up existing record: no such table: materials"
        );
    }
}
