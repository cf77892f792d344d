// ==========================================
// 参数注册表 - 参数表加载器
// ==========================================
// 流程: 原始行 → 默认值求值 → gui_args 解析 → 组装定义 → 默认值兼容性检查
// 红线: 全有或全无，遇到第一条错误行即整体失败
// ==========================================

use crate::domain::definition::{ParameterDefinition, RawParamRow};
use crate::expr;
use crate::importer::error::{SchemaError, SchemaResult};
use crate::importer::file_parser::{CsvParser, UniversalFileParser};
use crate::widget::{WidgetKind, WidgetOptions};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// 从文件加载参数定义（.csv / .xlsx / .xls）
pub fn load_schema_file<P: AsRef<Path>>(path: P) -> SchemaResult<Vec<ParameterDefinition>> {
    let path = path.as_ref();
    let rows = UniversalFileParser.parse(path)?;
    let definitions = build_definitions(rows)?;
    info!(
        path = %path.display(),
        count = definitions.len(),
        "参数表加载完成"
    );
    Ok(definitions)
}

/// 从 CSV 文本加载参数定义
pub fn load_schema_str(text: &str) -> SchemaResult<Vec<ParameterDefinition>> {
    let rows = CsvParser.parse_reader(text.as_bytes())?;
    build_definitions(rows)
}

/// 逐行构建定义，并检查 key 唯一
pub fn build_definitions(rows: Vec<RawParamRow>) -> SchemaResult<Vec<ParameterDefinition>> {
    if rows.is_empty() {
        return Err(SchemaError::EmptySchema);
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut definitions = Vec::with_capacity(rows.len());
    for row in &rows {
        let definition = build_definition(row)?;
        if !seen.insert(definition.key.clone()) {
            return Err(SchemaError::DuplicateKey {
                row: row.row,
                key: definition.key,
            });
        }
        definitions.push(definition);
    }

    Ok(definitions)
}

/// 单行 → 参数定义
///
/// # 检查顺序
/// 1. key 非空，group / default / gui_type 必填
/// 2. gui_type 可识别
/// 3. 默认值可求值（Func 类允许保留为未求值标记）
/// 4. gui_args 合法
/// 5. 默认值通过该控件的 commit
pub fn build_definition(row: &RawParamRow) -> SchemaResult<ParameterDefinition> {
    let key = row.key.trim();
    if key.is_empty() {
        return Err(SchemaError::EmptyKey { row: row.row });
    }

    let missing = |field: &str| SchemaError::MissingField {
        row: row.row,
        key: key.to_string(),
        field: field.to_string(),
    };
    if row.group.trim().is_empty() {
        return Err(missing("group"));
    }
    if row.default.trim().is_empty() {
        return Err(missing("default"));
    }
    if row.gui_type.trim().is_empty() {
        return Err(missing("gui_type"));
    }

    let widget_kind: WidgetKind =
        row.gui_type
            .trim()
            .parse()
            .map_err(|_| SchemaError::UnknownWidgetKind {
                row: row.row,
                key: key.to_string(),
                gui_type: row.gui_type.clone(),
            })?;

    let evaluated = if widget_kind == WidgetKind::Func {
        expr::evaluate_deferred(&row.default)
    } else {
        expr::evaluate(&row.default)
    };
    let default_value = evaluated.map_err(|source| SchemaError::InvalidDefault {
        row: row.row,
        key: key.to_string(),
        source,
    })?;

    let widget_options = WidgetOptions::parse(row.gui_args.as_deref().unwrap_or(""), widget_kind)
        .map_err(|source| SchemaError::InvalidWidgetArgs {
            row: row.row,
            key: key.to_string(),
            source,
        })?;

    let definition = ParameterDefinition {
        key: key.to_string(),
        alias: row.alias.clone(),
        group: row.group.trim().to_string(),
        default_raw: row.default.trim().to_string(),
        default_value,
        unit: row.unit.clone(),
        description: row.description.clone(),
        widget_kind,
        widget_options,
    };

    // 默认值按原样保存，commit 只用于兼容性检查
    definition
        .commit(definition.default_value.clone())
        .map_err(|source| SchemaError::IncompatibleDefault {
            row: row.row,
            key: key.to_string(),
            source,
        })?;

    debug!(key = %definition.key, kind = %widget_kind, "参数定义已构建");
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::ParamValue;
    use crate::widget::ValidationError;

    fn row(key: &str, default: &str, gui_type: &str, gui_args: Option<&str>) -> RawParamRow {
        RawParamRow {
            row: 2,
            key: key.to_string(),
            group: "General".to_string(),
            default: default.to_string(),
            gui_type: gui_type.to_string(),
            gui_args: gui_args.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_slider_definition() {
        let def = build_definition(&row(
            "highpass",
            "1",
            "SliderGui",
            Some("{'min_val': 0, 'max_val': 100, 'step': 1, 'none_select': True}"),
        ))
        .unwrap();
        assert_eq!(def.widget_kind, WidgetKind::Slider);
        assert_eq!(def.default_value, ParamValue::Int(1));
        assert_eq!(def.label(), "highpass");
    }

    #[test]
    fn test_unknown_widget_kind() {
        let err = build_definition(&row("x", "1", "Knob", None)).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownWidgetKind { .. }));
        assert_eq!(err.key(), Some("x"));
        assert_eq!(err.row(), Some(2));
    }

    #[test]
    fn test_null_default_requires_none_select() {
        let err = build_definition(&row("n_jobs", "None", "Int", None)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::IncompatibleDefault {
                source: ValidationError::NullNotAllowed,
                ..
            }
        ));
        let nullable = row("n_jobs", "None", "Int", Some("{'none_select': True}"));
        assert!(build_definition(&nullable).is_ok());
    }

    #[test]
    fn test_func_default_is_deferred() {
        let call = "ar.get_rejection_threshold(epochs)";
        let def = build_definition(&row("reject", call, "FuncGui", None)).unwrap();
        assert!(def.default_value.is_marker());

        let err = build_definition(&row("reject", call, "Dict", None)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    }

    #[test]
    fn test_missing_fields() {
        let err = build_definition(&row("", "1", "Int", None)).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyKey { row: 2 }));

        let err = build_definition(&row("a", "", "Int", None)).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { ref field, .. } if field == "default"));
    }

    #[test]
    fn test_duplicate_key() {
        let rows = vec![row("a", "1", "Int", None), row("a", "2", "Int", None)];
        let err = build_definitions(rows).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKey { ref key, .. } if key == "a"));
        assert!(matches!(build_definitions(Vec::new()), Err(SchemaError::EmptySchema)));
    }
}
