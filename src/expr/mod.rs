// ==========================================
// 参数注册表 - 默认值表达式求值器
// ==========================================
// 职责: 将参数表 default / gui_args 单元格文本转为 ParamValue
// 红线: 封闭文法，不调用任何通用解释器
// ==========================================

pub mod ast;
pub mod error;
pub mod eval;
mod parser;

pub use ast::{ArithOp, ContainerKind, Expr, UnaryOp};
pub use error::{ExprResult, ExpressionError};
pub use eval::{SequenceConstructor, MAX_SEQUENCE_LEN};

use crate::domain::value::ParamValue;
use parser::Parser;

/// 解析为语法树（不求值）
pub fn parse(raw: &str) -> ExprResult<Expr> {
    Parser::new(raw).parse_document()
}

/// 严格求值
///
/// # 支持的形式（按优先级）
/// 1. None
/// 2. True / False
/// 3. 单/双引号字符串
/// 4. 整数 / 浮点数（含指数与符号）
/// 5. 列表 / 元组 / 映射 / 集合
/// 6. `+ - * / **` 算术（结果为浮点）
/// 7. 允许列表内的序列构造函数（np.arange / np.linspace / ...）
/// 8. 裸标识符 → 未求值标记
///
/// # 返回
/// - Err(ExpressionError::UnknownConstructor): 调用了允许列表之外的函数
pub fn evaluate(raw: &str) -> ExprResult<ParamValue> {
    eval::eval(&parse(raw)?)
}

/// 延迟求值（Func 类参数）
///
/// 与 [`evaluate`] 相同，但顶层为允许列表之外的调用时，
/// 整个文本作为未求值标记返回，留给流水线运行时处理。
pub fn evaluate_deferred(raw: &str) -> ExprResult<ParamValue> {
    let expr = parse(raw)?;
    match eval::eval(&expr) {
        Err(ExpressionError::UnknownConstructor(name)) if expr.is_constructor() => {
            tracing::debug!(constructor = %name, "调用不在允许列表中，保留为未求值标记");
            Ok(ParamValue::Marker(raw.trim().to_string()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_precedence() {
        assert_eq!(evaluate("None").unwrap(), ParamValue::Null);
        assert_eq!(evaluate("True").unwrap(), ParamValue::Bool(true));
        assert_eq!(evaluate("'fastica'").unwrap(), ParamValue::from("fastica"));
        assert_eq!(evaluate("\"abs\"").unwrap(), ParamValue::from("abs"));
        assert_eq!(evaluate("40").unwrap(), ParamValue::Int(40));
        assert_eq!(evaluate("-0.2").unwrap(), ParamValue::Float(-0.2));
        assert_eq!(evaluate("4e-6").unwrap(), ParamValue::Float(4e-6));
    }

    #[test]
    fn test_bare_identifier_is_marker() {
        assert_eq!(
            evaluate("autoreject").unwrap(),
            ParamValue::Marker("autoreject".to_string())
        );
        assert_eq!(
            evaluate("mne.channels.layout").unwrap(),
            ParamValue::Marker("mne.channels.layout".to_string())
        );
    }

    #[test]
    fn test_deferred_keeps_unknown_call() {
        let raw = "ar.get_rejection_threshold(epochs)";
        assert!(matches!(
            evaluate(raw),
            Err(ExpressionError::UnknownConstructor(_))
        ));
        assert_eq!(
            evaluate_deferred(raw).unwrap(),
            ParamValue::Marker(raw.to_string())
        );
        // 允许列表内的调用照常求值
        assert_eq!(
            evaluate_deferred("np.arange(1, 4)").unwrap(),
            ParamValue::List(vec![
                ParamValue::Int(1),
                ParamValue::Int(2),
                ParamValue::Int(3)
            ])
        );
        // 嵌套在容器里的未知调用仍然报错
        assert!(evaluate_deferred("[foo(1)]").is_err());
    }
}
