// ==========================================
// CSV 批量导入 - 导入模板生成
// ==========================================
// 职责: 按列映射生成空白表头行，与导入时的列名规则一致
// ==========================================

use crate::importer::field_mapper::translate_column;
use crate::importer::import_config::Mapping;
use csv::{Terminator, Writer, WriterBuilder};

/// 生成导入模板（单行表头，换行结尾）
///
/// 列顺序与 mapping 的插入顺序一致
pub fn generate_template(mapping: &Mapping) -> Result<String, csv::Error> {
    let headings: Vec<String> = mapping
        .iter()
        .map(|(key, spec)| translate_column(key, spec))
        .collect();

    let mut writer = csv_writer();
    writer.write_record(&headings)?;
    into_string(writer)
}

/// 写入内存的 CSV writer（`\n` 结尾，允许行长不一致）
pub(crate) fn csv_writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

pub(crate) fn into_string(writer: Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = writer
        .into_inner()
        .map_err(|e| {
            csv::Error::from(std::io::Error::new(e.error().kind(), e.error().to_string()))
        })?;
    // 输入全部为 &str，输出必为合法 UTF-8
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
