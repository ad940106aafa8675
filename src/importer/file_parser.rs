// ==========================================
// CSV 批量导入 - 文件解析器
// ==========================================
// 阶段 1: 整个文件解析到内存，逐单元格转码为 UTF-8
// 失败即中止（不返回任何行）:
// - 非法字节序列 → ParseError::Encoding（行号/列号从 1 起）
// - 语法错误（引号未闭合、行长与表头不一致）→ ParseError::MalformedFormat
// 空白行整行跳过；第一行为表头
// ==========================================

use crate::importer::error::ParseError;
use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::{Encoding, UTF_8};

/// 解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub header_row: Vec<String>,
    pub data_rows: Vec<Vec<String>>,
}

// ==========================================
// CsvParser
// ==========================================
pub struct CsvParser {
    encoding: &'static Encoding,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按 WHATWG 编码标签创建
    ///
    /// 仅支持 ASCII 兼容编码（分隔符与引号按单字节识别）
    pub fn with_encoding_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .filter(|encoding| encoding.is_ascii_compatible())
            .map(|encoding| Self { encoding })
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// 解析 CSV 内容
    pub fn parse(&self, content: &[u8]) -> Result<ParsedTable, ParseError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content);

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut record = ByteRecord::new();
        loop {
            match reader.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => return Err(ParseError::MalformedFormat(e.to_string())),
            }

            if is_blank_record(&record) {
                continue;
            }

            let row_number = rows.len() + 1;
            if let Some(header) = rows.first() {
                if record.len() != header.len() {
                    return Err(ParseError::MalformedFormat(format!(
                        "Row {} has {} fields, but the header row has {} fields.",
                        row_number,
                        record.len(),
                        header.len()
                    )));
                }
            }

            let mut cells = Vec::with_capacity(record.len());
            for (idx, field) in record.iter().enumerate() {
                let cell = self.decode(field).map_err(|message| ParseError::Encoding {
                    row: row_number,
                    column: idx + 1,
                    message,
                })?;
                cells.push(cell);
            }
            rows.push(cells);
        }

        if let Some(line) = find_unclosed_quote(content) {
            return Err(ParseError::MalformedFormat(format!(
                "Unclosed quoted field on line {}.",
                line
            )));
        }

        let mut rows = rows.into_iter();
        let header_row = rows.next().unwrap_or_default();
        Ok(ParsedTable {
            header_row,
            data_rows: rows.collect(),
        })
    }

    /// 单元格转码（不做替换，非法序列即失败）
    fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        if self.encoding == UTF_8 {
            return std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| e.to_string());
        }

        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| format!("invalid {} byte sequence", self.encoding.name()))
    }
}

/// 所有字段均为空白的记录
fn is_blank_record(record: &ByteRecord) -> bool {
    record
        .iter()
        .all(|field| field.iter().all(u8::is_ascii_whitespace))
}

/// 查找未闭合的引号字段，返回其起始行号
///
/// 与 csv 解析器一致：引号只在字段开头有特殊含义，`""` 为转义
fn find_unclosed_quote(content: &[u8]) -> Option<usize> {
    let mut line = 1;
    let mut open_line = 0;
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut bytes = content.iter().peekable();

    while let Some(&byte) = bytes.next() {
        if in_quotes {
            match byte {
                b'"' if bytes.peek() == Some(&&b'"') => {
                    bytes.next();
                }
                b'"' => in_quotes = false,
                b'\n' => line += 1,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' if at_field_start => {
                in_quotes = true;
                open_line = line;
                at_field_start = false;
            }
            b',' | b'\r' => at_field_start = true,
            b'\n' => {
                line += 1;
                at_field_start = true;
            }
            _ => at_field_start = false,
        }
    }

    in_quotes.then_some(open_line)
}
