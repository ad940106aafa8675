// ==========================================
// CSV 批量导入 - 显示名工具
// ==========================================
// 职责: 字段键 → 人类可读标签
// 用途: 列映射 / 模板生成 / 校验错误全文
// ==========================================

/// 将字段键转换为首字母大写的可读短语
///
/// 规则：去掉前导下划线，下划线转空格，整体小写后首字母大写。
/// 例如 `unit_price` → `Unit price`
pub fn humanize(key: &str) -> String {
    let phrase = key.trim_start_matches('_').replace('_', " ").to_lowercase();

    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
