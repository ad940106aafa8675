// ==========================================
// CSV 批量导入 - 导入选项
// ==========================================
// 职责: 单次导入调用的行为开关
// ==========================================

use serde::{Deserialize, Serialize};

/// 导入选项
///
/// - `partial_save`: 存在错误行时仍提交成功行（默认 false，整批回滚）
/// - `source_encoding`: 源文件编码标签（WHATWG 标签，如 `windows-1252`），
///   None 表示 UTF-8
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub partial_save: bool,
    pub source_encoding: Option<String>,
}

impl ImportOptions {
    pub fn with_partial_save(mut self, partial_save: bool) -> Self {
        self.partial_save = partial_save;
        self
    }

    pub fn with_source_encoding(mut self, label: &str) -> Self {
        self.source_encoding = Some(label.to_string());
        self
    }
}
