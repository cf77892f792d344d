// ==========================================
// 参数注册表 - 控件选项（gui_args 求值）
// ==========================================
// 职责: 将 gui_args 映射字面量解析为 WidgetOptions，并按控件类型校验
// 红线: 控件不支持的选项键一律报错，不静默忽略
// ==========================================

use crate::domain::value::{ParamValue, ValueType};
use crate::expr;
use crate::widget::error::{OptionsError, OptionsResult};
use crate::widget::kind::WidgetKind;
use strum::{AsRefStr, EnumString};

/// Slider 未声明边界时使用的默认区间
pub const SLIDER_DEFAULT_MIN: f64 = 0.0;
pub const SLIDER_DEFAULT_MAX: f64 = 100.0;
pub const SLIDER_DEFAULT_STEP: f64 = 1.0;

/// MultiType 未声明 types 时允许的类型
pub const DEFAULT_MULTI_TYPES: &[ValueType] = &[
    ValueType::Int,
    ValueType::Float,
    ValueType::Bool,
    ValueType::Str,
    ValueType::List,
    ValueType::Tuple,
    ValueType::Dict,
];

// ==========================================
// OptionKey - gui_args 中可识别的键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum OptionKey {
    Options,
    MinVal,
    MaxVal,
    Step,
    NoneSelect,
    TypeSelection,
    Types,
}

impl OptionKey {
    /// 判断该键对给定控件类型是否有效
    pub fn applies_to(self, kind: WidgetKind) -> bool {
        match self {
            OptionKey::NoneSelect => true,
            OptionKey::Options => kind.is_choice(),
            OptionKey::MinVal | OptionKey::MaxVal | OptionKey::Step => kind.is_numeric(),
            OptionKey::TypeSelection | OptionKey::Types => kind == WidgetKind::MultiType,
        }
    }
}

// ==========================================
// WidgetOptions - 结构化控件选项
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetOptions {
    /// 可选项（Combo / CheckList）
    pub options: Option<Vec<ParamValue>>,
    pub min_val: Option<f64>,
    pub max_val: Option<f64>,
    pub step: Option<f64>,
    /// None 是否为额外可选值
    pub none_select: bool,
    pub type_selection: bool,
    /// MultiType 允许的类型
    pub types: Option<Vec<ValueType>>,
}

impl WidgetOptions {
    /// 解析 gui_args 单元格
    ///
    /// # 参数
    /// - raw: 映射字面量文本（空白表示无选项）
    /// - kind: 声明的控件类型
    ///
    /// # 返回
    /// - Err(OptionsError): 非映射 / 未知键 / min_val > max_val / step <= 0 等
    pub fn parse(raw: &str, kind: WidgetKind) -> OptionsResult<Self> {
        let mut opts = WidgetOptions::default();

        if !raw.trim().is_empty() {
            let map = match expr::evaluate(raw)? {
                ParamValue::Dict(map) => map,
                other => return Err(OptionsError::NotAMapping(other.to_string())),
            };

            for (name, value) in map {
                let key = name
                    .parse::<OptionKey>()
                    .ok()
                    .filter(|key| key.applies_to(kind))
                    .ok_or_else(|| OptionsError::UnknownKey {
                        kind,
                        key: name.clone(),
                    })?;

                match key {
                    OptionKey::Options => opts.options = Some(sequence_option(key, value)?),
                    OptionKey::MinVal => opts.min_val = Some(number_option(key, &value)?),
                    OptionKey::MaxVal => opts.max_val = Some(number_option(key, &value)?),
                    OptionKey::Step => opts.step = Some(number_option(key, &value)?),
                    OptionKey::NoneSelect => opts.none_select = bool_option(key, &value)?,
                    OptionKey::TypeSelection => opts.type_selection = bool_option(key, &value)?,
                    OptionKey::Types => {
                        let tags = sequence_option(key, value)?;
                        let mut types = Vec::with_capacity(tags.len());
                        for tag in tags {
                            let text = match &tag {
                                ParamValue::Str(s) => s.clone(),
                                ParamValue::Marker(s) => s.clone(),
                                other => other.to_string(),
                            };
                            let ty = text
                                .parse::<ValueType>()
                                .ok()
                                .filter(|t| *t != ValueType::Marker)
                                .ok_or(OptionsError::UnknownType(text))?;
                            if !types.contains(&ty) {
                                types.push(ty);
                            }
                        }
                        opts.types = Some(types);
                    }
                }
            }
        }

        opts.validate(kind)?;
        Ok(opts)
    }

    fn validate(&self, kind: WidgetKind) -> OptionsResult<()> {
        if let (Some(min), Some(max)) = (self.min_val, self.max_val) {
            if min > max {
                return Err(OptionsError::InvertedRange { min, max });
            }
        }
        if let Some(step) = self.step {
            if step <= 0.0 {
                return Err(OptionsError::NonPositiveStep(step));
            }
        }
        if kind.is_choice() && self.options.as_ref().map_or(true, |o| o.is_empty()) {
            return Err(OptionsError::MissingOptions(kind));
        }
        if kind == WidgetKind::Slider {
            let (min, max) = self.bounds(kind);
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(OptionsError::InvertedRange { min, max });
                }
            }
        }
        Ok(())
    }

    /// 生效的数值边界（Slider 缺省时补默认区间）
    pub fn bounds(&self, kind: WidgetKind) -> (Option<f64>, Option<f64>) {
        if kind == WidgetKind::Slider {
            (
                Some(self.min_val.unwrap_or(SLIDER_DEFAULT_MIN)),
                Some(self.max_val.unwrap_or(SLIDER_DEFAULT_MAX)),
            )
        } else {
            (self.min_val, self.max_val)
        }
    }

    /// 生效的步长
    pub fn effective_step(&self, kind: WidgetKind) -> Option<f64> {
        match (self.step, kind) {
            (Some(step), _) => Some(step),
            (None, WidgetKind::Slider) => Some(SLIDER_DEFAULT_STEP),
            (None, _) => None,
        }
    }

    /// MultiType 允许的类型
    pub fn allowed_types(&self) -> &[ValueType] {
        self.types.as_deref().unwrap_or(DEFAULT_MULTI_TYPES)
    }
}

fn invalid(key: OptionKey, message: impl Into<String>) -> OptionsError {
    OptionsError::InvalidValue {
        key: key.as_ref().to_string(),
        message: message.into(),
    }
}

fn number_option(key: OptionKey, value: &ParamValue) -> OptionsResult<f64> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(key, format!("需要数值，实际为 {}", value)))
}

fn bool_option(key: OptionKey, value: &ParamValue) -> OptionsResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| invalid(key, format!("需要布尔值，实际为 {}", value)))
}

fn sequence_option(key: OptionKey, value: ParamValue) -> OptionsResult<Vec<ParamValue>> {
    match value {
        ParamValue::List(items) | ParamValue::Tuple(items) | ParamValue::Set(items) => Ok(items),
        other => Err(invalid(key, format!("需要序列，实际为 {}", other))),
    }
}
