// ==========================================
// 参数注册表 - 参数值类型
// ==========================================
// 职责: 默认值表达式求值结果 / 当前值 的统一类型
// 持久化: 带类型标记的 JSON（tuple_type / set_type / expr_marker）
// ==========================================

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// 映射类型（保持插入顺序）
pub type ValueMap = IndexMap<String, ParamValue>;

// JSON 类型标记键
pub const TUPLE_TAG: &str = "tuple_type";
pub const SET_TAG: &str = "set_type";
pub const MARKER_TAG: &str = "expr_marker";

// ==========================================
// ParamValue - 参数值
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParamValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    Tuple(Vec<ParamValue>),
    /// 集合：按插入顺序保存，已去重
    Set(Vec<ParamValue>),
    Dict(ValueMap),
    /// 未求值标记：保留原始表达式文本，由流水线运行时处理
    Marker(String),
}

// ==========================================
// ValueType - 值类型标签
// ==========================================
// 标签文本与参数表 gui_args 中 types 的写法一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum ValueType {
    #[strum(to_string = "None", serialize = "none", serialize = "NoneType")]
    Null,
    #[strum(to_string = "bool")]
    Bool,
    #[strum(to_string = "int")]
    Int,
    #[strum(to_string = "float")]
    Float,
    #[strum(to_string = "str", serialize = "string")]
    Str,
    #[strum(to_string = "list")]
    List,
    #[strum(to_string = "tuple")]
    Tuple,
    #[strum(to_string = "set")]
    Set,
    #[strum(to_string = "dict")]
    Dict,
    #[strum(to_string = "marker")]
    Marker,
}

impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl ValueType {
    /// 是否为数值类型
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }
}

impl ParamValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Str(_) => ValueType::Str,
            Self::List(_) => ValueType::List,
            Self::Tuple(_) => ValueType::Tuple,
            Self::Set(_) => ValueType::Set,
            Self::Dict(_) => ValueType::Dict,
            Self::Marker(_) => ValueType::Marker,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Marker(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// 数值读取（整数自动提升为浮点）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// 序列视图（list / tuple / set）
    pub fn as_seq(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&ValueMap> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }

    pub fn marker_text(&self) -> Option<&str> {
        match self {
            Self::Marker(text) => Some(text),
            _ => None,
        }
    }

    /// 构造集合（去重，保留首次出现顺序）
    pub fn set_from(items: Vec<ParamValue>) -> Self {
        let mut unique: Vec<ParamValue> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Self::Set(unique)
    }

    // ==========================================
    // 带类型标记的 JSON 编解码
    // ==========================================

    /// 转为带类型标记的 JSON
    ///
    /// # 返回
    /// - Err: 浮点值为 NaN/inf（JSON 无法表示）
    pub fn to_json(&self) -> Result<JsonValue, String> {
        Ok(match self {
            Self::Null => JsonValue::Null,
            Self::Bool(v) => JsonValue::Bool(*v),
            Self::Int(v) => JsonValue::Number(Number::from(*v)),
            Self::Float(v) => JsonValue::Number(
                Number::from_f64(*v).ok_or_else(|| format!("浮点值无法写入 JSON: {}", v))?,
            ),
            Self::Str(v) => JsonValue::String(v.clone()),
            Self::List(items) => JsonValue::Array(seq_to_json(items)?),
            Self::Tuple(items) => tagged(TUPLE_TAG, JsonValue::Array(seq_to_json(items)?)),
            Self::Set(items) => tagged(SET_TAG, JsonValue::Array(seq_to_json(items)?)),
            Self::Dict(map) => {
                let mut object = Map::new();
                for (key, value) in map {
                    object.insert(key.clone(), value.to_json()?);
                }
                JsonValue::Object(object)
            }
            Self::Marker(text) => tagged(MARKER_TAG, JsonValue::String(text.clone())),
        })
    }

    /// 从带类型标记的 JSON 还原
    pub fn from_json(json: &JsonValue) -> Result<Self, String> {
        Ok(match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(v) => Self::Bool(*v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(
                    n.as_f64()
                        .ok_or_else(|| format!("无法识别的数值: {}", n))?,
                ),
            },
            JsonValue::String(s) => Self::Str(s.clone()),
            JsonValue::Array(items) => Self::List(seq_from_json(items)?),
            JsonValue::Object(object) => {
                if object.len() == 1 {
                    if let Some(JsonValue::Array(items)) = object.get(TUPLE_TAG) {
                        return Ok(Self::Tuple(seq_from_json(items)?));
                    }
                    if let Some(JsonValue::Array(items)) = object.get(SET_TAG) {
                        return Ok(Self::set_from(seq_from_json(items)?));
                    }
                    if let Some(JsonValue::String(text)) = object.get(MARKER_TAG) {
                        return Ok(Self::Marker(text.clone()));
                    }
                }
                let mut map = ValueMap::with_capacity(object.len());
                for (key, value) in object {
                    map.insert(key.clone(), Self::from_json(value)?);
                }
                Self::Dict(map)
            }
        })
    }
}

fn tagged(tag: &str, inner: JsonValue) -> JsonValue {
    let mut object = Map::new();
    object.insert(tag.to_string(), inner);
    JsonValue::Object(object)
}

fn seq_to_json(items: &[ParamValue]) -> Result<Vec<JsonValue>, String> {
    items.iter().map(ParamValue::to_json).collect()
}

fn seq_from_json(items: &[JsonValue]) -> Result<Vec<ParamValue>, String> {
    items.iter().map(ParamValue::from_json).collect()
}

// ==========================================
// Display - 与参数表写法一致的文本形式
// ==========================================
// 输出可被表达式求值器重新解析（Marker 除外，输出原文）
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write_float(f, *v),
            Self::Str(v) => write_quoted(f, v),
            Self::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Self::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Set(items) => {
                if items.is_empty() {
                    return write!(f, "set()");
                }
                write!(f, "{{")?;
                write_items(f, items)?;
                write!(f, "}}")
            }
            Self::Dict(map) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write_quoted(f, key)?;
                    write!(f, ": {}", value)?;
                }
                write!(f, "}}")
            }
            Self::Marker(text) => write!(f, "{}", text),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[ParamValue]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        write!(f, "nan")
    } else if v.is_infinite() {
        write!(f, "{}", if v > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug 格式保证带小数点或指数（1.0 / 3e-12）
        write!(f, "{:?}", v)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "'")?;
    for ch in s.chars() {
        match ch {
            '\'' => write!(f, "\\'")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            _ => write!(f, "{}", ch)?,
        }
    }
    write!(f, "'")
}

// ==========================================
// 便捷转换
// ==========================================
impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_python_style() {
        let value = ParamValue::Tuple(vec![ParamValue::Float(-0.5), ParamValue::Float(1.5)]);
        assert_eq!(value.to_string(), "(-0.5, 1.5)");

        let single = ParamValue::Tuple(vec![ParamValue::Int(3)]);
        assert_eq!(single.to_string(), "(3,)");

        assert_eq!(ParamValue::Float(1.0).to_string(), "1.0");
        assert_eq!(ParamValue::Null.to_string(), "None");
        assert_eq!(ParamValue::Bool(true).to_string(), "True");
        assert_eq!(ParamValue::from("it's").to_string(), "'it\\'s'");
        assert_eq!(ParamValue::Set(vec![]).to_string(), "set()");
    }

    #[test]
    fn test_json_keeps_tuple_and_set() {
        let value = ParamValue::Tuple(vec![ParamValue::Int(1), ParamValue::Float(2.5)]);
        let json = value.to_json().unwrap();
        assert_eq!(json, serde_json::json!({"tuple_type": [1, 2.5]}));
        assert_eq!(ParamValue::from_json(&json).unwrap(), value);

        let set = ParamValue::set_from(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(set, ParamValue::Set(vec!["a".into(), "b".into()]));
        let json = set.to_json().unwrap();
        assert_eq!(ParamValue::from_json(&json).unwrap(), set);
    }

    #[test]
    fn test_json_marker_and_float() {
        let marker = ParamValue::Marker("autoreject".to_string());
        let json = marker.to_json().unwrap();
        assert_eq!(json, serde_json::json!({"expr_marker": "autoreject"}));
        assert_eq!(ParamValue::from_json(&json).unwrap(), marker);

        // 1.0 在 JSON 中保留为浮点
        let json = ParamValue::Float(1.0).to_json().unwrap();
        assert_eq!(ParamValue::from_json(&json).unwrap(), ParamValue::Float(1.0));

        assert!(ParamValue::Float(f64::NAN).to_json().is_err());
    }

    #[test]
    fn test_value_type_tags() {
        assert_eq!("int".parse::<ValueType>().unwrap(), ValueType::Int);
        assert_eq!("None".parse::<ValueType>().unwrap(), ValueType::Null);
        assert_eq!("string".parse::<ValueType>().unwrap(), ValueType::Str);
        assert_eq!(ValueType::Str.to_string(), "str");
        assert!("complex".parse::<ValueType>().is_err());
    }
}
