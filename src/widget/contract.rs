// ==========================================
// 参数注册表 - 控件契约
// ==========================================
// 职责: 每种控件统一提供 render / commit
// - render: 定义 + 当前值 → 可编辑视图（无副作用）
// - commit: 校验候选值，成功返回规整后的值，失败返回具体违反的约束
// 红线: commit 对任何输入都返回 Result，不 panic
// ==========================================

use crate::domain::definition::ParameterDefinition;
use crate::domain::value::{ParamValue, ValueType};
use crate::expr;
use crate::widget::error::{ValidationError, ValidationResult};
use crate::widget::kind::WidgetKind;
use crate::widget::view::{CheckItem, Control, EditableView};

/// 步长对齐判断的容差
const STEP_EPSILON: f64 = 1e-9;

// ==========================================
// WidgetContract Trait
// ==========================================
// 实现者: WidgetKind（封闭枚举）；GUI 前端可包装实现
pub trait WidgetContract {
    /// 生成可编辑视图
    fn render(&self, definition: &ParameterDefinition, current: &ParamValue) -> EditableView;

    /// 校验用户提交的值
    ///
    /// # 返回
    /// - Ok(ParamValue): 规整后的值（如 Float 控件收到整数时转为浮点）
    /// - Err(ValidationError): 违反的约束
    fn commit(
        &self,
        definition: &ParameterDefinition,
        proposed: ParamValue,
    ) -> ValidationResult<ParamValue>;
}

impl WidgetContract for WidgetKind {
    fn render(&self, definition: &ParameterDefinition, current: &ParamValue) -> EditableView {
        EditableView {
            key: definition.key.clone(),
            label: definition.label().to_string(),
            group: definition.group.clone(),
            unit: definition.unit.clone(),
            description: definition.description.clone(),
            kind: *self,
            is_null: current.is_null(),
            none_selectable: definition.widget_options.none_select,
            value_text: current.to_string(),
            control: render_control(*self, definition, current),
        }
    }

    fn commit(
        &self,
        definition: &ParameterDefinition,
        proposed: ParamValue,
    ) -> ValidationResult<ParamValue> {
        let opts = &definition.widget_options;
        if proposed.is_null() {
            return if opts.none_select {
                Ok(ParamValue::Null)
            } else {
                Err(ValidationError::NullNotAllowed)
            };
        }

        let kind = *self;
        match kind {
            WidgetKind::Bool => match proposed {
                ParamValue::Bool(_) => Ok(proposed),
                other => Err(ValidationError::wrong_type("bool", other.value_type())),
            },
            WidgetKind::Int => {
                let value = match proposed {
                    ParamValue::Int(v) => v,
                    ParamValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                        v as i64
                    }
                    other => return Err(ValidationError::wrong_type("int", other.value_type())),
                };
                check_number(kind, definition, value as f64)?;
                Ok(ParamValue::Int(value))
            }
            WidgetKind::Float => {
                let value = proposed
                    .as_f64()
                    .ok_or_else(|| ValidationError::wrong_type("float", proposed.value_type()))?;
                check_number(kind, definition, value)?;
                Ok(ParamValue::Float(value))
            }
            WidgetKind::Slider => {
                let value = proposed
                    .as_f64()
                    .ok_or_else(|| ValidationError::wrong_type("number", proposed.value_type()))?;
                check_number(kind, definition, value)?;
                Ok(proposed)
            }
            WidgetKind::String => match proposed {
                ParamValue::Str(_) => Ok(proposed),
                other => Err(ValidationError::wrong_type("str", other.value_type())),
            },
            WidgetKind::Combo => canonical_option(definition, &proposed),
            WidgetKind::CheckList => {
                let items = proposed
                    .as_seq()
                    .ok_or_else(|| ValidationError::wrong_type("list", proposed.value_type()))?;
                let mut selected: Vec<ParamValue> = Vec::with_capacity(items.len());
                for item in items {
                    let option = canonical_option(definition, item)?;
                    if !selected.contains(&option) {
                        selected.push(option);
                    }
                }
                Ok(ParamValue::List(selected))
            }
            WidgetKind::List => {
                let items = match proposed {
                    ParamValue::List(items) | ParamValue::Tuple(items) => items,
                    other => return Err(ValidationError::wrong_type("list", other.value_type())),
                };
                if let Some(bad) = items.iter().find(|v| {
                    !matches!(
                        v,
                        ParamValue::Str(_) | ParamValue::Int(_) | ParamValue::Float(_)
                    )
                }) {
                    return Err(ValidationError::MalformedContainer(format!(
                        "列表元素必须为字符串或数值: {}",
                        bad
                    )));
                }
                Ok(ParamValue::List(items))
            }
            WidgetKind::Tuple => {
                let items = match proposed {
                    ParamValue::Tuple(items) | ParamValue::List(items) => items,
                    other => return Err(ValidationError::wrong_type("tuple", other.value_type())),
                };
                if let ParamValue::Tuple(default_items) = &definition.default_value {
                    if default_items.len() != items.len() {
                        return Err(ValidationError::WrongArity {
                            expected: default_items.len(),
                            actual: items.len(),
                        });
                    }
                }
                if let Some(bad) = items
                    .iter()
                    .find(|v| v.as_seq().is_some() || v.as_dict().is_some())
                {
                    return Err(ValidationError::MalformedContainer(format!(
                        "元组元素不能为容器: {}",
                        bad
                    )));
                }
                Ok(ParamValue::Tuple(items))
            }
            WidgetKind::Dict => match proposed {
                ParamValue::Dict(map) => {
                    if let Some((key, _)) = map.iter().find(|(_, v)| v.is_marker()) {
                        return Err(ValidationError::MalformedContainer(format!(
                            "映射值必须为字面量: {}",
                            key
                        )));
                    }
                    Ok(ParamValue::Dict(map))
                }
                other => Err(ValidationError::wrong_type("dict", other.value_type())),
            },
            WidgetKind::MultiType => {
                let selected = proposed.value_type();
                check_type_allowed(definition, selected)?;
                if let Some(value) = proposed.as_f64() {
                    check_number(kind, definition, value)?;
                }
                Ok(proposed)
            }
            WidgetKind::Func => {
                let value = match proposed {
                    ParamValue::Str(text) => expr::evaluate_deferred(&text)?,
                    other => other,
                };
                match value {
                    ParamValue::Marker(_)
                    | ParamValue::Int(_)
                    | ParamValue::Float(_)
                    | ParamValue::List(_)
                    | ParamValue::Tuple(_)
                    | ParamValue::Set(_)
                    | ParamValue::Null => Ok(value),
                    other => Err(ValidationError::wrong_type(
                        "marker / sequence / number",
                        other.value_type(),
                    )),
                }
            }
        }
    }
}

/// MultiType: 按用户选定的类型解析文本后提交
///
/// # 参数
/// - selected: 用户选定的类型
/// - text: 输入框文本（str 类型不加引号也可）
pub fn commit_typed(
    definition: &ParameterDefinition,
    selected: ValueType,
    text: &str,
) -> ValidationResult<ParamValue> {
    check_type_allowed(definition, selected)?;

    let value = if selected == ValueType::Str {
        match expr::evaluate(text) {
            Ok(ParamValue::Str(s)) => ParamValue::Str(s),
            _ => ParamValue::Str(text.to_string()),
        }
    } else {
        coerce(expr::evaluate(text)?, selected)?
    };
    definition.widget_kind.commit(definition, value)
}

fn coerce(value: ParamValue, target: ValueType) -> ValidationResult<ParamValue> {
    let actual = value.value_type();
    match (target, value) {
        (t, v) if t == actual => Ok(v),
        (ValueType::Float, ParamValue::Int(v)) => Ok(ParamValue::Float(v as f64)),
        (ValueType::Int, ParamValue::Float(v)) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Ok(ParamValue::Int(v as i64))
        }
        (ValueType::List, ParamValue::Tuple(items) | ParamValue::Set(items)) => {
            Ok(ParamValue::List(items))
        }
        (ValueType::Tuple, ParamValue::List(items)) => Ok(ParamValue::Tuple(items)),
        (ValueType::Set, ParamValue::List(items) | ParamValue::Tuple(items)) => {
            Ok(ParamValue::set_from(items))
        }
        (target, _) => Err(ValidationError::wrong_type(target.to_string(), actual)),
    }
}

fn check_type_allowed(
    definition: &ParameterDefinition,
    selected: ValueType,
) -> ValidationResult<()> {
    let allowed = definition.widget_options.allowed_types();
    if allowed.contains(&selected) {
        return Ok(());
    }
    Err(ValidationError::TypeNotAllowed {
        selected,
        allowed: allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// 区间校验；步长仅提示
fn check_number(
    kind: WidgetKind,
    definition: &ParameterDefinition,
    value: f64,
) -> ValidationResult<()> {
    let opts = &definition.widget_options;
    let (min, max) = opts.bounds(kind);
    let below = min.map_or(false, |m| value < m);
    let above = max.map_or(false, |m| value > m);
    if !value.is_finite() || below || above {
        return Err(ValidationError::OutOfRange {
            value,
            min: min.map_or_else(|| "-inf".to_string(), |m| m.to_string()),
            max: max.map_or_else(|| "inf".to_string(), |m| m.to_string()),
        });
    }

    if let Some(step) = opts.effective_step(kind) {
        let origin = min.unwrap_or(0.0);
        let ratio = (value - origin) / step;
        if (ratio - ratio.round()).abs() > STEP_EPSILON {
            tracing::debug!(
                key = %definition.key,
                value,
                step,
                "数值未对齐步长（仅提示）"
            );
        }
    }
    Ok(())
}

/// 在 options 中查找候选值（数值按大小比较），返回选项本身
fn canonical_option(
    definition: &ParameterDefinition,
    proposed: &ParamValue,
) -> ValidationResult<ParamValue> {
    let options = definition.widget_options.options.as_deref().unwrap_or(&[]);
    options
        .iter()
        .find(|option| loosely_equal(option, proposed))
        .cloned()
        .ok_or_else(|| ValidationError::NotInOptions {
            value: proposed.to_string(),
            options: ParamValue::List(options.to_vec()).to_string(),
        })
}

fn loosely_equal(a: &ParamValue, b: &ParamValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

// ==========================================
// 渲染
// ==========================================

fn render_control(
    kind: WidgetKind,
    definition: &ParameterDefinition,
    current: &ParamValue,
) -> Control {
    let opts = &definition.widget_options;
    match kind {
        WidgetKind::Bool => Control::Toggle {
            checked: current.as_bool().unwrap_or(false),
        },
        WidgetKind::Int | WidgetKind::Float => {
            let (min, max) = opts.bounds(kind);
            Control::Spin {
                value: current.as_f64(),
                min,
                max,
                step: opts.effective_step(kind),
                integer: kind == WidgetKind::Int,
            }
        }
        WidgetKind::Slider => {
            let (min, max) = opts.bounds(kind);
            let min = min.unwrap_or(0.0);
            let max = max.unwrap_or(min);
            let step = opts.effective_step(kind).unwrap_or(1.0);
            // 浮点转整数饱和，极宽区间时刻度数封顶为 u64::MAX
            let ticks = (((max - min) / step).floor() as u64).saturating_add(1);
            let position = current.as_f64().map(|v| {
                let index = ((v - min) / step).round().max(0.0) as u64;
                index.min(ticks.saturating_sub(1))
            });
            Control::Slider {
                value: current.as_f64(),
                min,
                max,
                step,
                position,
                ticks,
            }
        }
        WidgetKind::String => Control::Text {
            text: current.as_str().map(str::to_string).unwrap_or_default(),
        },
        WidgetKind::Combo => {
            let options = opts.options.as_deref().unwrap_or(&[]);
            Control::Choice {
                options: options.iter().map(option_label).collect(),
                selected: options.iter().position(|o| loosely_equal(o, current)),
            }
        }
        WidgetKind::CheckList => {
            let checked = current.as_seq().unwrap_or(&[]);
            Control::Checks {
                items: opts
                    .options
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|o| CheckItem {
                        label: option_label(o),
                        checked: checked.iter().any(|c| loosely_equal(c, o)),
                    })
                    .collect(),
            }
        }
        WidgetKind::List => Control::Items {
            items: current
                .as_seq()
                .unwrap_or(&[])
                .iter()
                .map(ToString::to_string)
                .collect(),
        },
        WidgetKind::Tuple => {
            let items: Vec<String> = current
                .as_seq()
                .unwrap_or(&[])
                .iter()
                .map(ToString::to_string)
                .collect();
            let arity = match &definition.default_value {
                ParamValue::Tuple(d) => d.len(),
                _ => items.len(),
            };
            Control::Fields { items, arity }
        }
        WidgetKind::Dict => Control::Pairs {
            pairs: current
                .as_dict()
                .map(|map| {
                    map.iter()
                        .map(|(k, v)| (k.clone(), v.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
        },
        WidgetKind::MultiType => {
            let types = opts.allowed_types().to_vec();
            let current_type = current.value_type();
            let selected = if types.contains(&current_type) {
                current_type
            } else {
                types.first().copied().unwrap_or(ValueType::Str)
            };
            let text = match current {
                ParamValue::Null => String::new(),
                ParamValue::Str(s) => s.clone(),
                other => other.to_string(),
            };
            Control::TypeSwitch {
                types,
                selected,
                text,
            }
        }
        WidgetKind::Func => Control::Expression {
            text: match current {
                ParamValue::Null => String::new(),
                other => other.to_string(),
            },
            evaluated: !current.is_marker(),
        },
    }
}

fn option_label(option: &ParamValue) -> String {
    match option {
        ParamValue::Str(s) => s.clone(),
        other => other.to_string(),
    }
}
