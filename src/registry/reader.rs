// ==========================================
// 参数注册表 - 流水线只读接口
// ==========================================
// 职责: 为处理流水线提供带类型的只读取值
// 实现者: ParameterRegistry / ValueSnapshot
// ==========================================

use crate::domain::value::{ParamValue, ValueMap};
use crate::registry::error::{RegistryError, RegistryResult};
use crate::registry::store::ParameterRegistry;
use serde::Serialize;

// ==========================================
// ParameterReader Trait
// ==========================================
pub trait ParameterReader {
    /// 原始值
    fn value(&self, key: &str) -> RegistryResult<&ParamValue>;

    fn get_bool(&self, key: &str) -> RegistryResult<bool> {
        let value = self.value(key)?;
        value.as_bool().ok_or_else(|| mismatch(key, "bool", value))
    }

    fn get_i64(&self, key: &str) -> RegistryResult<i64> {
        let value = self.value(key)?;
        value.as_i64().ok_or_else(|| mismatch(key, "int", value))
    }

    /// 整数会提升为浮点
    fn get_f64(&self, key: &str) -> RegistryResult<f64> {
        let value = self.value(key)?;
        value.as_f64().ok_or_else(|| mismatch(key, "float", value))
    }

    /// 可为 None 的数值参数（如滤波截止频率）
    fn get_opt_f64(&self, key: &str) -> RegistryResult<Option<f64>> {
        let value = self.value(key)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_f64()
            .map(Some)
            .ok_or_else(|| mismatch(key, "float or None", value))
    }

    fn get_str(&self, key: &str) -> RegistryResult<&str> {
        let value = self.value(key)?;
        value.as_str().ok_or_else(|| mismatch(key, "str", value))
    }

    /// 数值序列（list / tuple / set）
    fn get_f64_list(&self, key: &str) -> RegistryResult<Vec<f64>> {
        let value = self.value(key)?;
        value
            .as_seq()
            .and_then(|items| items.iter().map(ParamValue::as_f64).collect::<Option<Vec<_>>>())
            .ok_or_else(|| mismatch(key, "numeric sequence", value))
    }
}

fn mismatch(key: &str, expected: &'static str, actual: &ParamValue) -> RegistryError {
    RegistryError::TypeMismatch {
        key: key.to_string(),
        expected,
        actual: actual.value_type(),
    }
}

impl ParameterReader for ParameterRegistry {
    fn value(&self, key: &str) -> RegistryResult<&ParamValue> {
        self.get(key)
    }
}

// ==========================================
// ValueSnapshot - 当前值的只读快照
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSnapshot {
    values: ValueMap,
}

impl ValueSnapshot {
    pub fn new(values: ValueMap) -> Self {
        Self { values }
    }

    pub fn as_map(&self) -> &ValueMap {
        &self.values
    }

    pub fn into_map(self) -> ValueMap {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParameterReader for ValueSnapshot {
    fn value(&self, key: &str) -> RegistryResult<&ParamValue> {
        self.values
            .get(key)
            .ok_or_else(|| RegistryError::UnknownParameter(key.to_string()))
    }
}

impl Serialize for ValueSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{Error, SerializeMap};

        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            let json = value.to_json().map_err(S::Error::custom)?;
            map.serialize_entry(key, &json)?;
        }
        map.end()
    }
}

impl ParameterRegistry {
    /// 当前值快照（参数表顺序）
    pub fn snapshot(&self) -> ValueSnapshot {
        ValueSnapshot::new(self.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "\
key;alias;group;default;unit;description;gui_type;gui_args
highpass;;Filter;1;Hz;;Slider;{'none_select': True}
lowpass;;Filter;None;Hz;;Float;{'none_select': True}
apply_ica;;ICA;True;;;Bool;
ica_method;;ICA;'fastica';;;Combo;{'options': ['fastica', 'picard']}
tfr_freqs;;Time-Frequency;np.linspace(2, 8, 4);Hz;;Func;
";

    #[test]
    fn test_typed_getters() {
        let reg = ParameterRegistry::from_schema_str(SCHEMA).unwrap();
        assert_eq!(reg.get_i64("highpass").unwrap(), 1);
        assert_eq!(reg.get_f64("highpass").unwrap(), 1.0);
        assert_eq!(reg.get_opt_f64("lowpass").unwrap(), None);
        assert!(reg.get_bool("apply_ica").unwrap());
        assert_eq!(reg.get_str("ica_method").unwrap(), "fastica");
        assert_eq!(reg.get_f64_list("tfr_freqs").unwrap(), vec![2.0, 4.0, 6.0, 8.0]);

        assert!(matches!(
            reg.get_str("highpass"),
            Err(RegistryError::TypeMismatch { expected: "str", .. })
        ));
        assert!(matches!(
            reg.get_bool("nope"),
            Err(RegistryError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut reg = ParameterRegistry::from_schema_str(SCHEMA).unwrap();
        let snapshot = reg.snapshot();
        reg.set("ica_method", "picard".into()).unwrap();

        assert_eq!(snapshot.get_str("ica_method").unwrap(), "fastica");
        assert_eq!(reg.get_str("ica_method").unwrap(), "picard");
        assert_eq!(snapshot.len(), 5);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["apply_ica"], serde_json::json!(true));
    }
}
