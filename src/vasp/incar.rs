//! # INCAR 生成
//!
//! INCAR 标签值的类型化表示、VASP 取值格式化和用户覆盖合并。
//!
//! ## 依赖关系
//! - 被 `vasp/mod.rs` 和 `vasp/config.rs` 使用
//! - 无外部模块依赖

use std::collections::BTreeMap;
use std::fmt;

/// INCAR 标签值
#[derive(Debug, Clone, PartialEq)]
pub enum IncarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for IncarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncarValue::Bool(true) => write!(f, ".TRUE."),
            IncarValue::Bool(false) => write!(f, ".FALSE."),
            IncarValue::Int(v) => write!(f, "{}", v),
            // 很小的数用科学计数法，和 VASP 手册里的写法一致
            IncarValue::Float(v) => {
                if *v != 0.0 && v.abs() < 1e-2 {
                    write!(f, "{:e}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            IncarValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// 从字符串推断 INCAR 值类型
pub fn parse_incar_value(s: &str) -> IncarValue {
    let trimmed = s.trim();
    match trimmed.to_uppercase().as_str() {
        ".TRUE." | "TRUE" | ".T." | "T" => return IncarValue::Bool(true),
        ".FALSE." | "FALSE" | ".F." | "F" => return IncarValue::Bool(false),
        _ => {}
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return IncarValue::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return IncarValue::Float(v);
    }
    IncarValue::Str(trimmed.to_string())
}

/// 默认配置叠加用户覆盖；覆盖值为 None 时删除该标签
pub fn merge_incar(
    base: &BTreeMap<&'static str, IncarValue>,
    overrides: &[(String, Option<IncarValue>)],
) -> BTreeMap<String, IncarValue> {
    let mut merged: BTreeMap<String, IncarValue> = base
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();

    for (tag, value) in overrides {
        let tag = tag.to_uppercase();
        match value {
            Some(v) => {
                merged.insert(tag, v.clone());
            }
            None => {
                merged.remove(&tag);
            }
        }
    }

    merged
}

/// INCAR 文件内容，标签按字母序
pub fn to_incar_string(tags: &BTreeMap<String, IncarValue>) -> String {
    let mut out = String::new();
    for (tag, value) in tags {
        out.push_str(&format!("{} = {}\n", tag, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_formatting() {
        assert_eq!(IncarValue::Bool(true).to_string(), ".TRUE.");
        assert_eq!(IncarValue::Bool(false).to_string(), ".FALSE.");
        assert_eq!(IncarValue::Int(500).to_string(), "500");
        assert_eq!(IncarValue::Float(1e-6).to_string(), "1e-6");
        assert_eq!(IncarValue::Float(-0.01).to_string(), "-0.01");
        assert_eq!(IncarValue::Float(0.01).to_string(), "0.01");
        assert_eq!(IncarValue::Str("Accurate".to_string()).to_string(), "Accurate");
    }

    #[test]
    fn test_parse_incar_value() {
        assert_eq!(parse_incar_value(".TRUE."), IncarValue::Bool(true));
        assert_eq!(parse_incar_value("false"), IncarValue::Bool(false));
        assert_eq!(parse_incar_value("150"), IncarValue::Int(150));
        assert_eq!(parse_incar_value("-0.01"), IncarValue::Float(-0.01));
        assert_eq!(
            parse_incar_value("Accurate"),
            IncarValue::Str("Accurate".to_string())
        );
    }

    #[test]
    fn test_merge_override_and_delete() {
        let mut base: BTreeMap<&'static str, IncarValue> = BTreeMap::new();
        base.insert("ENCUT", IncarValue::Int(500));
        base.insert("NSW", IncarValue::Int(0));

        let overrides = vec![
            ("encut".to_string(), Some(IncarValue::Int(600))),
            ("NSW".to_string(), None),
            ("ISPIN".to_string(), Some(IncarValue::Int(2))),
        ];
        let merged = merge_incar(&base, &overrides);

        assert_eq!(merged["ENCUT"], IncarValue::Int(600));
        assert_eq!(merged["ISPIN"], IncarValue::Int(2));
        assert!(!merged.contains_key("NSW"));
    }

    #[test]
    fn test_incar_string_sorted() {
        let mut tags: BTreeMap<String, IncarValue> = BTreeMap::new();
        tags.insert("NSW".to_string(), IncarValue::Int(0));
        tags.insert("ALGO".to_string(), IncarValue::Str("Normal".to_string()));
        tags.insert("EDIFF".to_string(), IncarValue::Float(1e-6));

        let s = to_incar_string(&tags);
        assert_eq!(s, "ALGO = Normal\nEDIFF = 1e-6\nNSW = 0\n");
    }
}
