// ==========================================
// CSV 批量导入 - 导入编排器
// ==========================================
// 流程: 解析 → 表头解析 → 逐行处理（转换/定位记录/保存）→ 收尾
// 事务: 整个导入在单个事务内执行
// - 无错误: 提交，返回导入行数
// - 有错误且未开启 partial_save: 整体回滚，返回汇总错误
// - 有错误且开启 partial_save: 提交成功行，仍返回汇总错误
// 行级错误只放弃当前行（每行至多一条错误），文件级错误跳过全部行处理
// ==========================================

use crate::config::ImportOptions;
use crate::importer::error::{
    AggregateImportError, ImportError, ImportResult, RowError, TransformError,
};
use crate::importer::field_mapper::{build_row_field_map, FieldMapper};
use crate::importer::file_parser::CsvParser;
use crate::importer::import_config::{ImportConfiguration, RowFieldMap};
use crate::importer::record_resolver::resolve_record;
use crate::importer::template::generate_template;
use crate::importer::value_transformer::ValueTransformer;
use crate::repository::{EntityStore, ImportEntity, SaveError, StoreError, StoreResult};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ImportOutcome - 单次导入的记账结果
// ==========================================
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub errors: Vec<RowError>,
    pub header_row: Vec<String>,
    pub num_imported: usize,
}

impl From<ImportOutcome> for AggregateImportError {
    fn from(outcome: ImportOutcome) -> Self {
        AggregateImportError {
            errors: outcome.errors,
            header_row: outcome.header_row,
            num_imported: outcome.num_imported,
        }
    }
}

enum RowStatus {
    Imported,
    Rejected(RowError),
}

// ==========================================
// CsvImporter - 绑定一份导入配置与一个实体存储
// ==========================================
pub struct CsvImporter<S: EntityStore> {
    config: ImportConfiguration<S::Entity>,
    store: S,
}

impl<S: EntityStore> CsvImporter<S> {
    pub fn new(config: ImportConfiguration<S::Entity>, store: S) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn configuration(&self) -> &ImportConfiguration<S::Entity> {
        &self.config
    }

    /// 导入模板（单行表头）
    pub fn csv_import_template(&self) -> ImportResult<String> {
        Ok(generate_template(&self.config.mapping)?)
    }

    /// 从 CSV 内容导入
    ///
    /// # 返回
    /// - Ok(usize): 全部成功，已提交的行数
    /// - Err(ImportError::Aggregate): 存在文件级或行级错误
    /// - Err(ImportError::Store): 存储层故障，事务已回滚
    /// - Err(ImportError::UnsupportedEncoding): 选项中的源编码无法识别
    #[instrument(
        skip_all,
        fields(import_id = %Uuid::new_v4(), partial_save = options.partial_save)
    )]
    pub fn import_from_csv(
        &self,
        content: impl AsRef<[u8]>,
        options: &ImportOptions,
    ) -> ImportResult<usize> {
        let parser = match &options.source_encoding {
            Some(label) => CsvParser::with_encoding_label(label)
                .ok_or_else(|| ImportError::UnsupportedEncoding(label.clone()))?,
            None => CsvParser::new(),
        };
        let mapping = &self.config.mapping;
        let field_mapper = FieldMapper::new(mapping);
        let transformer = ValueTransformer::new(mapping);
        let mut outcome = ImportOutcome::default();

        let scope = TransactionScope::begin(&self.store)?;

        // === 阶段 1: 解析文件 ===
        debug!(encoding = parser.encoding_name(), "阶段 1: 解析文件");
        let data_rows = match parser.parse(content.as_ref()) {
            Ok(table) => {
                outcome.header_row = table.header_row;
                table.data_rows
            }
            Err(e) => {
                warn!(error = %e, "文件解析失败，跳过行处理");
                outcome.errors.push(RowError::file_level(&e));
                Vec::new()
            }
        };

        // === 阶段 2: 表头解析 ===
        debug!(header = ?outcome.header_row, "阶段 2: 表头解析");
        let field_keys = field_mapper.resolve(&outcome.header_row);

        // === 阶段 3: 逐行处理 ===
        debug!(rows = data_rows.len(), "阶段 3: 逐行处理");
        for (idx, row) in data_rows.iter().enumerate() {
            match self.process_row(row, &field_keys, &outcome.header_row, &transformer)? {
                RowStatus::Imported => outcome.num_imported += 1,
                RowStatus::Rejected(row_error) => {
                    warn!(data_row = idx + 1, error = %row_error.message, "行导入失败");
                    outcome.errors.push(row_error);
                }
            }
        }

        // === 阶段 4: 收尾 ===
        self.finalize(scope, outcome, options)
    }

    fn process_row(
        &self,
        row: &[String],
        field_keys: &[Option<String>],
        header_row: &[String],
        transformer: &ValueTransformer<'_>,
    ) -> Result<RowStatus, StoreError> {
        let row_map = build_row_field_map(field_keys, row);
        let mut record = match resolve_record(&self.store, self.config.find_existing(), &row_map) {
            Ok(record) => record,
            Err(e) => return Ok(RowStatus::Rejected(RowError::transform(&e, row))),
        };

        if let Err(e) = self.assign_columns(&mut record, row, field_keys, header_row, &row_map, transformer) {
            return Ok(RowStatus::Rejected(RowError::transform(&e, row)));
        }

        match self.store.save(&mut record) {
            Ok(()) => Ok(RowStatus::Imported),
            Err(SaveError::Invalid(errors)) => Ok(RowStatus::Rejected(RowError::invalid_entity(errors, row))),
            Err(SaveError::Store(e)) => Err(e),
        }
    }

    /// 逐列赋值，遇到第一个转换失败即放弃本行
    fn assign_columns(
        &self,
        record: &mut S::Entity,
        row: &[String],
        field_keys: &[Option<String>],
        header_row: &[String],
        row_map: &RowFieldMap,
        transformer: &ValueTransformer<'_>,
    ) -> Result<(), TransformError> {
        for ((cell, key), heading) in row.iter().zip(field_keys).zip(header_row) {
            let Some(key) = key else { continue };
            let Some(spec) = self.config.mapping.get(key) else { continue };

            if let Some(value) = transformer.transform(cell, heading, spec, row_map)? {
                record.assign(key, value);
            }
        }
        Ok(())
    }

    fn finalize(
        &self,
        scope: TransactionScope<'_, S>,
        outcome: ImportOutcome,
        options: &ImportOptions,
    ) -> ImportResult<usize> {
        if outcome.errors.is_empty() {
            scope.commit()?;
            info!(imported = outcome.num_imported, "CSV 导入完成");
            return Ok(outcome.num_imported);
        }

        if options.partial_save {
            scope.commit()?;
            warn!(
                imported = outcome.num_imported,
                errors = outcome.errors.len(),
                "CSV 导入部分成功，已提交成功行"
            );
        } else {
            scope.rollback()?;
            warn!(
                passed = outcome.num_imported,
                errors = outcome.errors.len(),
                "CSV 导入失败，事务已回滚"
            );
        }

        Err(AggregateImportError::from(outcome).into())
    }
}

// ==========================================
// TransactionScope - 事务作用域
// ==========================================
// 未显式提交/回滚即离开作用域（? 提前返回、回调 panic）时自动回滚
struct TransactionScope<'a, S: EntityStore> {
    store: &'a S,
    open: bool,
}

impl<'a, S: EntityStore> TransactionScope<'a, S> {
    fn begin(store: &'a S) -> StoreResult<Self> {
        store.begin()?;
        Ok(Self { store, open: true })
    }

    fn commit(mut self) -> StoreResult<()> {
        self.store.commit()?;
        self.open = false;
        Ok(())
    }

    fn rollback(mut self) -> StoreResult<()> {
        self.store.rollback()?;
        self.open = false;
        Ok(())
    }
}

impl<S: EntityStore> Drop for TransactionScope<'_, S> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.store.rollback() {
                error!(error = %e, "事务回滚失败");
            }
        }
    }
}
