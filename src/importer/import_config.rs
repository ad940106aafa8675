// ==========================================
// CSV 批量导入 - 导入配置
// ==========================================
// 职责: 声明式列映射（字段键 → 列规格）与已有记录查找
// 说明: 每次导入调用独立传入，核心不保留跨调用状态
// ==========================================

use crate::domain::FieldValue;
use crate::repository::Identifiable;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 单行的字段键 → 原始单元格文本（未匹配的列不出现）
pub type RowFieldMap = HashMap<String, String>;

/// 自定义值转换：(原始值, 行字段表, 完整映射) → 写入值
pub type ValueFn =
    Arc<dyn Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<FieldValue> + Send + Sync>;

/// 关联记录解析：返回的记录只取其标识写入
pub type ReferenceFn = Arc<
    dyn Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<Option<Box<dyn Identifiable>>>
        + Send
        + Sync,
>;

/// 已有记录查找：命中则更新该记录，未命中则新建，失败则放弃当前行
pub type FindExistingFn<E> =
    Box<dyn Fn(&RowFieldMap) -> anyhow::Result<Option<E>> + Send + Sync>;

// ==========================================
// Conversion - 单元格转换方式
// ==========================================
#[derive(Clone, Default)]
pub enum Conversion {
    /// 原样写入原始文本
    #[default]
    Verbatim,
    Transform(ValueFn),
    Reference(ReferenceFn),
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Verbatim => write!(f, "Verbatim"),
            Conversion::Transform(_) => write!(f, "Transform(<fn>)"),
            Conversion::Reference(_) => write!(f, "Reference(<fn>)"),
        }
    }
}

// ==========================================
// ColumnSpec - 列规格
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ColumnSpec {
    /// 显式表头文本；None 时由字段键推导
    pub display_name: Option<String>,
    pub conversion: Conversion,
}

impl ColumnSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    /// 设置自定义值转换
    pub fn value_method<F>(mut self, method: F) -> Self
    where
        F: Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<FieldValue> + Send + Sync + 'static,
    {
        self.conversion = Conversion::Transform(Arc::new(method));
        self
    }

    /// 设置关联记录解析，返回 None 视为找不到关联记录
    pub fn record_method<F, R>(mut self, method: F) -> Self
    where
        F: Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<Option<R>> + Send + Sync + 'static,
        R: Identifiable + 'static,
    {
        let resolver: ReferenceFn = Arc::new(
            move |value: &str,
                  row: &RowFieldMap,
                  mapping: &Mapping|
                  -> anyhow::Result<Option<Box<dyn Identifiable>>> {
                let found = method(value, row, mapping)?;
                Ok(found.map(|record| Box::new(record) as Box<dyn Identifiable>))
            },
        );
        self.conversion = Conversion::Reference(resolver);
        self
    }
}

// ==========================================
// Mapping - 有序列映射
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    columns: Vec<(String, ColumnSpec)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一列（链式）
    pub fn column(mut self, key: &str, spec: ColumnSpec) -> Self {
        self.insert(key, spec);
        self
    }

    /// 插入一列；字段键已存在时原位替换
    pub fn insert(&mut self, key: &str, spec: ColumnSpec) {
        match self.columns.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = spec,
            None => self.columns.push((key.to_string(), spec)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, spec)| spec)
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnSpec)> {
        self.columns.iter().map(|(k, spec)| (k.as_str(), spec))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ==========================================
// ImportConfiguration - 导入配置
// ==========================================
pub struct ImportConfiguration<E> {
    pub mapping: Mapping,
    find_existing: Option<FindExistingFn<E>>,
}

impl<E> ImportConfiguration<E> {
    pub fn new(mapping: Mapping) -> Self {
        Self {
            mapping,
            find_existing: None,
        }
    }

    /// 设置已有记录查找
    pub fn with_find_existing<F>(mut self, find_existing: F) -> Self
    where
        F: Fn(&RowFieldMap) -> anyhow::Result<Option<E>> + Send + Sync + 'static,
    {
        self.find_existing = Some(Box::new(find_existing));
        self
    }

    pub fn find_existing(&self) -> Option<&FindExistingFn<E>> {
        self.find_existing.as_ref()
    }
}

impl<E> fmt::Debug for ImportConfiguration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfiguration")
            .field("mapping", &self.mapping)
            .field("find_existing", &self.find_existing.is_some())
            .finish()
    }
}
