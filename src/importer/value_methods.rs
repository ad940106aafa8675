// ==========================================
// CSV 批量导入 - 内置值转换
// ==========================================
// 用途: 作为 ColumnSpec::value_method 的参数直接使用
// ==========================================

use crate::domain::FieldValue;
use crate::importer::import_config::{Mapping, RowFieldMap};
use anyhow::{anyhow, bail};
use chrono::NaiveDate;

pub struct ValueMethods;

impl ValueMethods {
    /// 布尔列：仅接受 Yes / No（大小写不敏感）
    pub fn yes_no_value_method(
    ) -> impl Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<FieldValue> + Send + Sync + 'static
    {
        |value: &str, _row: &RowFieldMap, _mapping: &Mapping| parse_yes_no(value).map(FieldValue::Bool)
    }

    /// 整数列
    pub fn integer_value_method(
    ) -> impl Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<FieldValue> + Send + Sync + 'static
    {
        |value: &str, _row: &RowFieldMap, _mapping: &Mapping| {
            value
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| anyhow!("Value must be an integer"))
        }
    }

    /// 数值列
    pub fn decimal_value_method(
    ) -> impl Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<FieldValue> + Send + Sync + 'static
    {
        |value: &str, _row: &RowFieldMap, _mapping: &Mapping| {
            match value.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(FieldValue::Float(number)),
                _ => bail!("Value must be a number"),
            }
        }
    }

    /// 日期列，`format` 为 chrono 格式串（如 `%Y%m%d`）
    pub fn date_value_method(
        format: &str,
    ) -> impl Fn(&str, &RowFieldMap, &Mapping) -> anyhow::Result<FieldValue> + Send + Sync + 'static
    {
        let format = format.to_string();
        move |value: &str, _row: &RowFieldMap, _mapping: &Mapping| {
            NaiveDate::parse_from_str(value.trim(), &format)
                .map(FieldValue::Date)
                .map_err(|_| anyhow!("Value must be a date in the format {}", format))
        }
    }
}

/// 解析 Yes / No
pub fn parse_yes_no(value: &str) -> anyhow::Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => bail!("Value must be Yes or No"),
    }
}
