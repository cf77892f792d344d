// ==========================================
// 参数注册表 - 注册表本体
// ==========================================
// 职责: 持有参数定义（只读）与当前值（可变），按分组索引
// 红线: current_values 的键集合始终等于 definitions 的键集合
// 红线: 所有写入必须经过控件 commit 校验
// ==========================================

use crate::domain::definition::{ParameterDefinition, RawParamRow};
use crate::domain::value::{ParamValue, ValueMap};
use crate::expr;
use crate::importer::{self, SchemaError, SchemaResult};
use crate::registry::error::{RegistryError, RegistryResult};
use crate::widget::{EditableView, ValidationError, WidgetKind};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// 内置参数表
const BUILTIN_SCHEMA: &str = include_str!("../../resources/parameters.csv");

// ==========================================
// ParamChange - 与上次运行值的对比结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParamChange {
    Unchanged {
        key: String,
    },
    Changed {
        key: String,
        previous: String,
        current: String,
    },
    /// 上次运行没有记录该参数
    Missing {
        key: String,
    },
}

impl ParamChange {
    pub fn key(&self) -> &str {
        match self {
            ParamChange::Unchanged { key }
            | ParamChange::Changed { key, .. }
            | ParamChange::Missing { key } => key,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, ParamChange::Unchanged { .. })
    }
}

// ==========================================
// ParameterRegistry
// ==========================================
#[derive(Debug, Clone)]
pub struct ParameterRegistry {
    /// key → 定义（保持参数表顺序）
    pub(crate) definitions: IndexMap<String, ParameterDefinition>,
    /// 分组 → key 列表（按首次出现顺序）
    pub(crate) group_index: IndexMap<String, Vec<String>>,
    pub(crate) current_values: HashMap<String, ParamValue>,
    /// Func 参数当前值对应的表达式文本
    pub(crate) expressions: HashMap<String, String>,
}

impl ParameterRegistry {
    // ===== 构建 =====

    /// 从参数表文件加载（全有或全无）
    pub fn load<P: AsRef<Path>>(path: P) -> SchemaResult<Self> {
        let definitions = importer::load_schema_file(path)?;
        Self::from_definitions(definitions)
    }

    /// 从 CSV 文本加载
    pub fn from_schema_str(text: &str) -> SchemaResult<Self> {
        let definitions = importer::load_schema_str(text)?;
        Self::from_definitions(definitions)
    }

    /// 从原始行构建
    pub fn from_rows(rows: Vec<RawParamRow>) -> SchemaResult<Self> {
        Self::from_definitions(importer::build_definitions(rows)?)
    }

    /// 加载内置参数表
    pub fn builtin() -> SchemaResult<Self> {
        Self::from_schema_str(BUILTIN_SCHEMA)
    }

    pub fn from_definitions(definitions: Vec<ParameterDefinition>) -> SchemaResult<Self> {
        if definitions.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        let mut registry = Self {
            definitions: IndexMap::with_capacity(definitions.len()),
            group_index: IndexMap::new(),
            current_values: HashMap::with_capacity(definitions.len()),
            expressions: HashMap::new(),
        };

        for definition in definitions {
            let key = definition.key.clone();
            if registry.definitions.contains_key(&key) {
                return Err(SchemaError::DuplicateDefinition(key));
            }
            registry
                .group_index
                .entry(definition.group.clone())
                .or_default()
                .push(key.clone());
            registry
                .current_values
                .insert(key.clone(), definition.default_value.clone());
            if definition.widget_kind == WidgetKind::Func {
                registry
                    .expressions
                    .insert(key.clone(), definition.default_raw.clone());
            }
            registry.definitions.insert(key, definition);
        }

        info!(
            parameters = registry.definitions.len(),
            groups = registry.group_index.len(),
            "参数注册表已构建"
        );
        registry.check_key_set();
        Ok(registry)
    }

    // ===== 查询 =====

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    /// 当前值
    pub fn get(&self, key: &str) -> RegistryResult<&ParamValue> {
        self.current_values
            .get(key)
            .ok_or_else(|| RegistryError::UnknownParameter(key.to_string()))
    }

    pub fn definition(&self, key: &str) -> RegistryResult<&ParameterDefinition> {
        self.definitions
            .get(key)
            .ok_or_else(|| RegistryError::UnknownParameter(key.to_string()))
    }

    /// 全部定义（参数表顺序）
    pub fn definitions(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.definitions.values()
    }

    /// 全部 key（参数表顺序）
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// 分组内的 key（未知分组返回空）
    pub fn by_group(&self, group: &str) -> &[String] {
        self.group_index
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 分组名（按首次出现顺序）
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.group_index.keys().map(String::as_str)
    }

    /// GUI 视图
    pub fn view(&self, key: &str) -> RegistryResult<EditableView> {
        let definition = self.definition(key)?;
        Ok(definition.render(self.get(key)?))
    }

    /// Func 参数的表达式文本（其它类型返回 None）
    pub fn expression(&self, key: &str) -> Option<&str> {
        self.expressions.get(key).map(String::as_str)
    }

    // ===== 写入 =====

    /// 经 commit 校验后写入；失败时状态不变
    pub fn set(&mut self, key: &str, value: ParamValue) -> RegistryResult<()> {
        let definition = self.definition(key)?;
        let kind = definition.widget_kind;
        // Func 收到字符串时按表达式求值，记录原文
        let entered = match (&value, kind) {
            (ParamValue::Str(text), WidgetKind::Func) => Some(text.trim().to_string()),
            _ => None,
        };
        let committed = definition
            .commit(value)
            .map_err(|source| validation(key, source))?;

        if kind == WidgetKind::Func {
            let text = match (entered, &committed) {
                (Some(text), _) => text,
                (None, ParamValue::Marker(text)) => text.clone(),
                (None, other) => other.to_string(),
            };
            self.expressions.insert(key.to_string(), text);
        }
        debug!(key, value = %committed, "参数已更新");
        self.current_values.insert(key.to_string(), committed);
        Ok(())
    }

    /// GUI 文本输入
    ///
    /// # 规则
    /// - String: 文本原样作为字符串（无需引号）
    /// - Func: 延迟求值，同时记录表达式文本
    /// - 其它: 严格求值后 commit
    pub fn set_from_text(&mut self, key: &str, text: &str) -> RegistryResult<()> {
        let definition = self.definition(key)?;
        let kind = definition.widget_kind;
        match kind {
            WidgetKind::String => self.set(key, ParamValue::Str(text.to_string())),
            WidgetKind::Func => {
                let value = expr::evaluate_deferred(text)
                    .map_err(|e| validation(key, ValidationError::Expression(e)))?;
                let committed = definition
                    .commit(value)
                    .map_err(|source| validation(key, source))?;
                debug!(key, expression = text.trim(), "函数参数已更新");
                self.expressions
                    .insert(key.to_string(), text.trim().to_string());
                self.current_values.insert(key.to_string(), committed);
                Ok(())
            }
            _ => {
                let value = expr::evaluate(text)
                    .map_err(|e| validation(key, ValidationError::Expression(e)))?;
                self.set(key, value)
            }
        }
    }

    /// 恢复单个参数的默认值
    pub fn reset_to_default(&mut self, key: &str) -> RegistryResult<()> {
        if !self.restore_default(key) {
            return Err(RegistryError::UnknownParameter(key.to_string()));
        }
        debug!(key, "参数已恢复默认值");
        Ok(())
    }

    /// 写回默认值（含 Func 表达式文本）；key 不在参数表中时返回 false
    pub(crate) fn restore_default(&mut self, key: &str) -> bool {
        let Some(definition) = self.definitions.get(key) else {
            return false;
        };
        self.current_values
            .insert(key.to_string(), definition.default_value.clone());
        if definition.widget_kind == WidgetKind::Func {
            self.expressions
                .insert(key.to_string(), definition.default_raw.clone());
        }
        true
    }

    /// 全部恢复默认值
    pub fn reset_all(&mut self) {
        for (key, definition) in &self.definitions {
            self.current_values
                .insert(key.clone(), definition.default_value.clone());
            if definition.widget_kind == WidgetKind::Func {
                self.expressions
                    .insert(key.clone(), definition.default_raw.clone());
            }
        }
        self.check_key_set();
        info!("全部参数已恢复默认值");
    }

    // ===== 变更追踪 =====

    /// 当前值与默认值不同的 key（参数表顺序）
    pub fn modified_keys(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .filter(|(key, definition)| {
                self.current_values.get(key.as_str()) != Some(&definition.default_value)
            })
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// 与上次运行时的值逐个对比
    pub fn compare(&self, previous: &ValueMap) -> Vec<ParamChange> {
        self.definitions
            .keys()
            .filter_map(|key| {
                let current = self.current_values.get(key)?;
                let change = match previous.get(key) {
                    None => ParamChange::Missing { key: key.clone() },
                    Some(prev) if prev == current => ParamChange::Unchanged { key: key.clone() },
                    Some(prev) => ParamChange::Changed {
                        key: key.clone(),
                        previous: prev.to_string(),
                        current: current.to_string(),
                    },
                };
                Some(change)
            })
            .collect()
    }

    /// 当前值（参数表顺序）
    pub fn values(&self) -> ValueMap {
        self.definitions
            .keys()
            .filter_map(|key| {
                self.current_values
                    .get(key)
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }

    pub(crate) fn check_key_set(&self) {
        debug_assert_eq!(self.current_values.len(), self.definitions.len());
        debug_assert!(self
            .definitions
            .keys()
            .all(|key| self.current_values.contains_key(key)));
    }
}

pub(crate) fn validation(key: &str, source: ValidationError) -> RegistryError {
    RegistryError::Validation {
        key: key.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "\
key;alias;group;default;unit;description;gui_type;gui_args
highpass;High-Pass;Filter;1;Hz;;Slider;{'min_val': 0, 'max_val': 100, 'step': 1, 'none_select': True}
lowpass;Low-Pass;Filter;30;Hz;;Slider;{'min_val': 0, 'max_val': 100, 'none_select': True}
ica_method;ICA Method;ICA;'fastica';;;Combo;{'options': ['fastica', 'infomax', 'picard']}
tfr_freqs;;Time-Frequency;np.arange(5, 40, 5);Hz;;Func;
plot_title;;Plot;'Evoked';;;String;
";

    fn registry() -> ParameterRegistry {
        ParameterRegistry::from_schema_str(SCHEMA).unwrap()
    }

    #[test]
    fn test_load_and_get() {
        let reg = registry();
        assert_eq!(reg.len(), 5);
        assert_eq!(reg.get("highpass").unwrap(), &ParamValue::Int(1));
        assert_eq!(reg.by_group("Filter"), &["highpass", "lowpass"]);
        assert!(reg.by_group("Nope").is_empty());
        assert_eq!(
            reg.groups().collect::<Vec<_>>(),
            vec!["Filter", "ICA", "Time-Frequency", "Plot"]
        );
        assert!(matches!(
            reg.get("missing"),
            Err(RegistryError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_set_failure_keeps_state() {
        let mut reg = registry();
        let err = reg.set("ica_method", "other".into()).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Validation {
                source: ValidationError::NotInOptions { .. },
                ..
            }
        ));
        assert_eq!(reg.get("ica_method").unwrap(), &ParamValue::from("fastica"));

        reg.set("highpass", ParamValue::Null).unwrap();
        assert!(reg.get("highpass").unwrap().is_null());
        assert!(reg.set("nope", ParamValue::Int(1)).is_err());
    }

    #[test]
    fn test_reset() {
        let mut reg = registry();
        reg.set("lowpass", ParamValue::Int(40)).unwrap();
        reg.set("highpass", ParamValue::Float(0.5)).unwrap();
        reg.reset_to_default("lowpass").unwrap();
        assert_eq!(reg.get("lowpass").unwrap(), &ParamValue::Int(30));
        assert_eq!(reg.modified_keys(), vec!["highpass"]);

        reg.reset_all();
        let once = reg.values();
        reg.reset_all();
        assert_eq!(reg.values(), once);
        assert!(reg.modified_keys().is_empty());
    }

    #[test]
    fn test_set_from_text() {
        let mut reg = registry();
        reg.set_from_text("plot_title", "Evoked (filtered)").unwrap();
        assert_eq!(
            reg.get("plot_title").unwrap(),
            &ParamValue::from("Evoked (filtered)")
        );

        reg.set_from_text("lowpass", "45").unwrap();
        assert_eq!(reg.get("lowpass").unwrap(), &ParamValue::Int(45));
        assert!(reg.set_from_text("lowpass", "45 +").is_err());

        assert_eq!(reg.expression("tfr_freqs"), Some("np.arange(5, 40, 5)"));
        reg.set_from_text("tfr_freqs", "np.arange(1, 3)").unwrap();
        assert_eq!(reg.expression("tfr_freqs"), Some("np.arange(1, 3)"));
        assert_eq!(
            reg.get("tfr_freqs").unwrap(),
            &ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(2)])
        );
        reg.reset_to_default("tfr_freqs").unwrap();
        assert_eq!(reg.expression("tfr_freqs"), Some("np.arange(5, 40, 5)"));
        assert_eq!(reg.expression("lowpass"), None);
    }

    #[test]
    fn test_set_func_keeps_entered_text() {
        let mut reg = registry();
        reg.set("tfr_freqs", " np.arange(2, 6, 2) ".into()).unwrap();
        assert_eq!(reg.expression("tfr_freqs"), Some("np.arange(2, 6, 2)"));
        assert_eq!(
            reg.get("tfr_freqs").unwrap(),
            &ParamValue::List(vec![ParamValue::Int(2), ParamValue::Int(4)])
        );

        let literal = ParamValue::List(vec![ParamValue::Int(7)]);
        reg.set("tfr_freqs", literal).unwrap();
        assert_eq!(reg.expression("tfr_freqs"), Some("[7]"));
    }

    #[test]
    fn test_duplicate_definitions_rejected() {
        let mut definitions: Vec<ParameterDefinition> =
            registry().definitions().cloned().collect();
        definitions.push(definitions[0].clone());
        let err = ParameterRegistry::from_definitions(definitions).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateDefinition(ref key) if key == "highpass"));
        assert_eq!(err.key(), Some("highpass"));
        assert_eq!(err.row(), None);
    }

    #[test]
    fn test_compare() {
        let mut reg = registry();
        let previous = reg.values();
        reg.set("lowpass", ParamValue::Int(40)).unwrap();

        let mut partial = previous.clone();
        partial.shift_remove("plot_title");
        let changes = reg.compare(&partial);
        assert_eq!(changes.len(), 5);
        assert!(changes.iter().any(|c| matches!(
            c,
            ParamChange::Changed { key, previous, current }
                if key == "lowpass" && previous == "30" && current == "40"
        )));
        assert!(changes
            .iter()
            .any(|c| matches!(c, ParamChange::Missing { key } if key == "plot_title")));
        assert_eq!(changes.iter().filter(|c| c.is_unchanged()).count(), 3);
    }

    #[test]
    fn test_view() {
        let reg = registry();
        let view = reg.view("highpass").unwrap();
        assert_eq!(view.label, "High-Pass");
        assert_eq!(view.unit.as_deref(), Some("Hz"));
        assert!(view.none_selectable);
    }
}
