// ==========================================
// 参数注册表 - 可编辑视图
// ==========================================
// 职责: render 的输出；GUI 前端据此绘制控件，不含任何工具包细节
// ==========================================

use crate::domain::value::ValueType;
use crate::widget::kind::WidgetKind;
use serde::Serialize;

/// 单个参数的可编辑视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditableView {
    pub key: String,
    pub label: String,
    pub group: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub kind: WidgetKind,
    /// 当前值为 None
    pub is_null: bool,
    /// 是否提供 None 选项
    pub none_selectable: bool,
    /// 当前值文本（参数表写法）
    pub value_text: String,
    pub control: Control,
}

/// 控件状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    Toggle {
        checked: bool,
    },
    Spin {
        value: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        integer: bool,
    },
    Slider {
        value: Option<f64>,
        min: f64,
        max: f64,
        step: f64,
        /// 当前值在步长网格上的刻度位置
        position: Option<u64>,
        ticks: u64,
    },
    Text {
        text: String,
    },
    Choice {
        options: Vec<String>,
        selected: Option<usize>,
    },
    Checks {
        items: Vec<CheckItem>,
    },
    Items {
        items: Vec<String>,
    },
    Fields {
        items: Vec<String>,
        arity: usize,
    },
    Pairs {
        pairs: Vec<(String, String)>,
    },
    TypeSwitch {
        types: Vec<ValueType>,
        selected: ValueType,
        text: String,
    },
    Expression {
        text: String,
        /// false 表示当前值为未求值标记
        evaluated: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckItem {
    pub label: String,
    pub checked: bool,
}
