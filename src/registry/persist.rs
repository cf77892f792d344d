// ==========================================
// 参数注册表 - 参数值持久化
// ==========================================
// 格式: 扁平 JSON 对象 key → 带类型标签的值
// - 元组 {"tuple_type": [...]} / 集合 {"set_type": [...]} / 未求值标记 {"expr_marker": "..."}
// - Func 参数额外保存 "<key>_exp" 表达式文本，加载时重新求值
// 加载规则: 参数表外的键丢弃，缺失的键补默认值，校验失败的值保留默认值
// ==========================================

use crate::domain::value::ParamValue;
use crate::registry::error::{RegistryError, RegistryResult};
use crate::registry::store::ParameterRegistry;
use crate::widget::{ValidationError, WidgetKind};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{info, warn};

/// Func 参数表达式文本的键后缀
pub const EXPRESSION_SUFFIX: &str = "_exp";

/// 单个被拒绝的值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedValue {
    pub key: String,
    pub reason: String,
}

/// 参数值加载报告
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// 成功载入的 key
    pub loaded: Vec<String>,
    /// 参数表中不存在、被丢弃的 key
    pub dropped: Vec<String>,
    /// 缺失、以默认值补齐的 key
    pub filled: Vec<String>,
    /// 校验失败、保留默认值的 key
    pub rejected: Vec<RejectedValue>,
}

impl LoadReport {
    /// 所有值都原样载入
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.filled.is_empty() && self.rejected.is_empty()
    }
}

impl ParameterRegistry {
    /// 导出当前值（参数表顺序）
    pub fn dump_values(&self) -> RegistryResult<Map<String, JsonValue>> {
        let mut map = Map::new();
        for (key, definition) in &self.definitions {
            let value = self.get(key)?;
            let json = value.to_json().map_err(|message| RegistryError::Serialize {
                key: key.clone(),
                message,
            })?;
            map.insert(key.clone(), json);

            if definition.widget_kind == WidgetKind::Func {
                let companion = format!("{}{}", key, EXPRESSION_SUFFIX);
                if self.contains(&companion) {
                    continue;
                }
                if let Some(text) = self.expression(key) {
                    map.insert(companion, JsonValue::String(text.to_string()));
                }
            }
        }
        Ok(map)
    }

    /// 导出为格式化 JSON 文本
    pub fn to_json_string(&self) -> RegistryResult<String> {
        Ok(serde_json::to_string_pretty(&self.dump_values()?)?)
    }

    /// 载入持久化的参数值
    ///
    /// 单个值的失败不影响其它值，结果汇总在报告中
    pub fn load_values(&mut self, map: &Map<String, JsonValue>) -> LoadReport {
        let mut report = LoadReport::default();

        for key in map.keys() {
            if self.contains(key) || self.is_expression_companion(key) {
                continue;
            }
            warn!(key = %key, "参数表中不存在该参数，已丢弃");
            report.dropped.push(key.clone());
        }

        let keys: Vec<String> = self.keys().map(str::to_string).collect();
        for key in keys {
            let expression = self.expression_entry(&key, map);

            let outcome = match (expression, map.get(&key)) {
                (Some(text), _) => Some(self.set_from_text(&key, text)),
                (_, Some(json)) => Some(
                    ParamValue::from_json(json)
                        .map_err(|message| RegistryError::Validation {
                            key: key.clone(),
                            source: ValidationError::MalformedContainer(message),
                        })
                        .and_then(|value| self.set(&key, value)),
                ),
                _ => None,
            };

            match outcome {
                Some(Ok(())) => report.loaded.push(key),
                Some(Err(err)) => {
                    warn!(key = %key, error = %err, "参数值无效，保留默认值");
                    let restored = self.restore_default(&key);
                    debug_assert!(restored);
                    report.rejected.push(RejectedValue {
                        key,
                        reason: err.to_string(),
                    });
                }
                None => {
                    let restored = self.restore_default(&key);
                    debug_assert!(restored);
                    report.filled.push(key);
                }
            }
        }

        self.check_key_set();
        info!(
            loaded = report.loaded.len(),
            dropped = report.dropped.len(),
            filled = report.filled.len(),
            rejected = report.rejected.len(),
            "参数值已载入"
        );
        report
    }

    /// 从 JSON 文本载入
    pub fn load_values_json(&mut self, text: &str) -> RegistryResult<LoadReport> {
        match serde_json::from_str::<JsonValue>(text)? {
            JsonValue::Object(map) => Ok(self.load_values(&map)),
            other => Err(RegistryError::Format(format!(
                "需要 JSON 对象，实际为 {}",
                json_kind(&other)
            ))),
        }
    }

    /// Func 参数在持久化映射中的表达式文本
    ///
    /// "<key>_exp" 本身是参数表中的参数时不视为表达式
    fn expression_entry<'m>(
        &self,
        key: &str,
        map: &'m Map<String, JsonValue>,
    ) -> Option<&'m str> {
        let is_func = self
            .definitions
            .get(key)
            .map_or(false, |d| d.widget_kind == WidgetKind::Func);
        let companion = format!("{}{}", key, EXPRESSION_SUFFIX);
        if !is_func || self.contains(&companion) {
            return None;
        }
        map.get(&companion).and_then(JsonValue::as_str)
    }

    /// "<key>_exp" 且 key 为 Func 参数
    fn is_expression_companion(&self, key: &str) -> bool {
        !self.contains(key)
            && key
                .strip_suffix(EXPRESSION_SUFFIX)
                .and_then(|base| self.definitions.get(base))
                .map_or(false, |d| d.widget_kind == WidgetKind::Func)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &str = "\
key;alias;group;default;unit;description;gui_type;gui_args
epo_baseline;;Epochs;(-0.2, 0);s;;Tuple;
ch_types;;General;['grad'];;;CheckList;{'options': ['grad', 'mag', 'eeg']}
reject;;Epochs;{'grad': 4000e-13};;;Dict;{'none_select': True}
tfr_freqs;;Time-Frequency;np.arange(5, 20, 5);Hz;;Func;
n_jobs;;General;-1;;;Int;{'min_val': -1}
";

    fn registry() -> ParameterRegistry {
        ParameterRegistry::from_schema_str(SCHEMA).unwrap()
    }

    #[test]
    fn test_dump_tags_tuple_and_expression() {
        let reg = registry();
        let map = reg.dump_values().unwrap();
        assert_eq!(map["epo_baseline"], json!({"tuple_type": [-0.2, 0]}));
        assert_eq!(map["tfr_freqs"], json!([5, 10, 15]));
        assert_eq!(map["tfr_freqs_exp"], json!("np.arange(5, 20, 5)"));
        assert!(!map.contains_key("n_jobs_exp"));
    }

    #[test]
    fn test_round_trip_restores_values() {
        let mut reg = registry();
        reg.set_from_text("epo_baseline", "(-0.5, 0.1)").unwrap();
        reg.set_from_text("tfr_freqs", "np.arange(1, 4)").unwrap();
        reg.set("reject", ParamValue::Null).unwrap();
        let text = reg.to_json_string().unwrap();

        let mut other = registry();
        let report = other.load_values_json(&text).unwrap();
        assert!(report.is_clean(), "unexpected report: {:?}", report);
        assert_eq!(other.values(), reg.values());
        assert_eq!(other.expression("tfr_freqs"), Some("np.arange(1, 4)"));
    }

    #[test]
    fn test_load_drops_fills_and_rejects() {
        let mut reg = registry();
        let map = json!({
            "n_jobs": -5,
            "ch_types": ["mag", "eeg"],
            "legacy_param": 3,
        });
        let report = reg.load_values(map.as_object().unwrap());

        assert_eq!(report.dropped, vec!["legacy_param"]);
        assert_eq!(report.loaded, vec!["ch_types"]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].key, "n_jobs");
        assert_eq!(report.filled, vec!["epo_baseline", "reject", "tfr_freqs"]);
        assert_eq!(reg.get("n_jobs").unwrap(), &ParamValue::Int(-1));
        assert!(!reg.contains("legacy_param"));
    }

    #[test]
    fn test_schema_key_with_expression_suffix() {
        let schema = "\
key;alias;group;default;unit;description;gui_type;gui_args
freqs;;Time-Frequency;np.arange(1, 4);Hz;;Func;
freqs_exp;;Time-Frequency;'note';;;String;
";
        let mut reg = ParameterRegistry::from_schema_str(schema).unwrap();
        let dumped = reg.dump_values().unwrap();
        assert_eq!(dumped["freqs_exp"], json!("note"));

        let map = json!({"freqs": [5, 6], "freqs_exp": "np.arange(10, 12)"});
        let report = reg.load_values(map.as_object().unwrap());
        assert!(report.is_clean(), "unexpected report: {:?}", report);
        assert_eq!(
            reg.get("freqs").unwrap(),
            &ParamValue::List(vec![ParamValue::Int(5), ParamValue::Int(6)])
        );
        assert_eq!(reg.get("freqs_exp").unwrap(), &ParamValue::from("np.arange(10, 12)"));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let mut reg = registry();
        assert!(matches!(
            reg.load_values_json("[1, 2]"),
            Err(RegistryError::Format(_))
        ));
        assert!(matches!(
            reg.load_values_json("{not json"),
            Err(RegistryError::Format(_))
        ));
    }
}
