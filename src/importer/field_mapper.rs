// ==========================================
// CSV 批量导入 - 字段映射器
// ==========================================
// 职责: 表头文本 → 字段键（大小写不敏感）
// 规则: 显示名优先取 ColumnSpec.display_name；否则去掉 `_id` 后缀再人性化
// ==========================================

use crate::domain::humanize;
use crate::importer::import_config::{ColumnSpec, Mapping, RowFieldMap};
use std::collections::HashMap;
use tracing::debug;

/// 字段键的表头显示名
pub fn translate_column(key: &str, spec: &ColumnSpec) -> String {
    match &spec.display_name {
        Some(name) => name.clone(),
        None => humanize(key.strip_suffix("_id").unwrap_or(key)),
    }
}

// ==========================================
// FieldMapper - 表头解析
// ==========================================
pub struct FieldMapper {
    // 小写显示名 → 字段键
    lookup: HashMap<String, String>,
}

impl FieldMapper {
    /// 由映射构建查找表
    ///
    /// 小写后显示名重复时，后插入的字段键覆盖先插入的
    pub fn new(mapping: &Mapping) -> Self {
        let lookup = mapping
            .iter()
            .map(|(key, spec)| (translate_column(key, spec).to_lowercase(), key.to_string()))
            .collect();
        Self { lookup }
    }

    /// 单个表头对应的字段键
    pub fn field_key_for(&self, heading: &str) -> Option<&str> {
        self.lookup.get(&heading.to_lowercase()).map(String::as_str)
    }

    /// 解析整行表头，第 i 项为第 i 列的字段键，未匹配为 None
    pub fn resolve(&self, header_row: &[String]) -> Vec<Option<String>> {
        let field_keys: Vec<Option<String>> = header_row
            .iter()
            .map(|heading| self.field_key_for(heading).map(str::to_string))
            .collect();

        let ignored: Vec<&str> = header_row
            .iter()
            .zip(&field_keys)
            .filter(|(_, key)| key.is_none())
            .map(|(heading, _)| heading.as_str())
            .collect();
        if !ignored.is_empty() {
            debug!(columns = ?ignored, "未匹配的列将被忽略");
        }

        field_keys
    }
}

/// 按解析出的字段键组装单行字段表
pub fn build_row_field_map(field_keys: &[Option<String>], row: &[String]) -> RowFieldMap {
    field_keys
        .iter()
        .zip(row)
        .filter_map(|(key, cell)| key.as_ref().map(|k| (k.clone(), cell.clone())))
        .collect()
}
