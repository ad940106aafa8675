// ==========================================
// CSV 批量导入 - 单元格值转换
// ==========================================
// 职责: 原始单元格 → 写入实体的值
// 顺序: 空白跳过 → 自定义转换 → 关联记录解析 → 原样文本
// 失败: 统一包装为 ColumnTransform，保留文件中的原始表头
// ==========================================

use crate::domain::FieldValue;
use crate::importer::error::TransformError;
use crate::importer::import_config::{ColumnSpec, Conversion, Mapping, RowFieldMap};

pub struct ValueTransformer<'a> {
    mapping: &'a Mapping,
}

impl<'a> ValueTransformer<'a> {
    pub fn new(mapping: &'a Mapping) -> Self {
        Self { mapping }
    }

    /// 转换单个单元格
    ///
    /// # 参数
    /// - raw: 原始单元格文本
    /// - heading: 该列在文件中的原始表头（用于错误消息）
    /// - spec: 该列的列规格
    /// - row: 当前行字段表
    ///
    /// # 返回
    /// - Ok(None): 空白单元格，不赋值（保留实体默认值）
    /// - Ok(Some(value)): 待写入的值
    /// - Err(ColumnTransform): 转换失败
    pub fn transform(
        &self,
        raw: &str,
        heading: &str,
        spec: &ColumnSpec,
        row: &RowFieldMap,
    ) -> Result<Option<FieldValue>, TransformError> {
        if raw.trim().is_empty() {
            return Ok(None);
        }

        self.convert(raw, spec, row)
            .map(Some)
            .map_err(|e| TransformError::ColumnTransform {
                header: heading.to_string(),
                message: e.to_string(),
            })
    }

    fn convert(&self, raw: &str, spec: &ColumnSpec, row: &RowFieldMap) -> anyhow::Result<FieldValue> {
        match &spec.conversion {
            Conversion::Transform(method) => method(raw, row, self.mapping),
            Conversion::Reference(resolver) => match resolver(raw, row, self.mapping)? {
                Some(related) => Ok(related.identifier()),
                None => Err(TransformError::ReferenceNotFound(raw.to_string()).into()),
            },
            Conversion::Verbatim => Ok(FieldValue::Text(raw.to_string())),
        }
    }
}
