// ==========================================
// 参数注册表 - 表达式求值
// ==========================================
// 职责: 语法树 → ParamValue
// 红线: 不执行任何允许列表之外的调用
// ==========================================

use super::ast::{ArithOp, ContainerKind, Expr, UnaryOp};
use super::error::{ExprResult, ExpressionError};
use crate::domain::value::{ParamValue, ValueMap};

/// 构造函数生成序列的最大长度
pub const MAX_SEQUENCE_LEN: usize = 1_000_000;

/// linspace / logspace 的默认点数（与 numpy 一致）
const DEFAULT_NUM: i64 = 50;

// ==========================================
// 序列构造函数允许列表
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceConstructor {
    /// 等间距数组 `arange([start,] stop[, step])`
    Arange,
    /// 整数区间 `range([start,] stop[, step])`
    Range,
    /// 区间内 N 个点 `linspace(start, stop[, num])`
    Linspace,
    /// 10 的幂次上的 N 个点 `logspace(start, stop[, num])`
    Logspace,
    /// `np.array([...])`
    Array,
}

impl SequenceConstructor {
    /// 按名称查找（允许 np. / numpy. 前缀）
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "np.arange" | "numpy.arange" | "arange" => Some(Self::Arange),
            "range" => Some(Self::Range),
            "np.linspace" | "numpy.linspace" | "linspace" => Some(Self::Linspace),
            "np.logspace" | "numpy.logspace" | "logspace" => Some(Self::Logspace),
            "np.array" | "numpy.array" => Some(Self::Array),
            _ => None,
        }
    }

    fn allowed_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Arange => &["step"],
            Self::Linspace | Self::Logspace => &["num", "endpoint"],
            Self::Range | Self::Array => &[],
        }
    }
}

/// 对语法树求值
pub(crate) fn eval(expr: &Expr) -> ExprResult<ParamValue> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Marker(text) => Ok(ParamValue::Marker(text.clone())),
        Expr::Container(kind, items) => {
            let values = items.iter().map(eval).collect::<ExprResult<Vec<_>>>()?;
            Ok(match kind {
                ContainerKind::List => ParamValue::List(values),
                ContainerKind::Tuple => ParamValue::Tuple(values),
                ContainerKind::Set => ParamValue::set_from(values),
            })
        }
        Expr::Mapping(pairs) => {
            let mut map = ValueMap::with_capacity(pairs.len());
            for (key_expr, value_expr) in pairs {
                let key = match eval(key_expr)? {
                    ParamValue::Str(key) => key,
                    other => return Err(ExpressionError::NonStringKey(other.to_string())),
                };
                // 重复键: 后者覆盖前者
                map.insert(key, eval(value_expr)?);
            }
            Ok(ParamValue::Dict(map))
        }
        Expr::Unary(op, operand) => {
            let v = numeric_operand(&eval(operand)?)?;
            let result = match op {
                UnaryOp::Neg => -v,
                UnaryOp::Pos => v,
            };
            Ok(ParamValue::Float(result))
        }
        Expr::Arithmetic { op, lhs, rhs } => {
            let a = numeric_operand(&eval(lhs)?)?;
            let b = numeric_operand(&eval(rhs)?)?;
            apply_arith(*op, a, b).map(ParamValue::Float)
        }
        Expr::Constructor { name, args, kwargs } => {
            let ctor = SequenceConstructor::lookup(name)
                .ok_or_else(|| ExpressionError::UnknownConstructor(name.clone()))?;
            for (keyword, _) in kwargs {
                if !ctor.allowed_keywords().contains(&keyword.as_str()) {
                    return Err(ExpressionError::bad_args(
                        name,
                        format!("不支持关键字参数 '{}'", keyword),
                    ));
                }
            }
            let args = args.iter().map(eval).collect::<ExprResult<Vec<_>>>()?;
            let mut kw = Vec::with_capacity(kwargs.len());
            for (keyword, value) in kwargs {
                kw.push((keyword.as_str(), eval(value)?));
            }
            construct(ctor, name, args, &kw)
        }
    }
}

fn numeric_operand(value: &ParamValue) -> ExprResult<f64> {
    match value {
        ParamValue::Int(v) => Ok(*v as f64),
        ParamValue::Float(v) => Ok(*v),
        other => Err(ExpressionError::Arithmetic(format!(
            "非数值操作数: {}",
            other
        ))),
    }
}

fn apply_arith(op: ArithOp, a: f64, b: f64) -> ExprResult<f64> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Err(ExpressionError::Arithmetic(format!("除数为零: {} / {}", a, b)));
            }
            a / b
        }
        ArithOp::Pow => a.powf(b),
    };
    if !result.is_finite() {
        return Err(ExpressionError::Arithmetic(format!(
            "结果非有限值: {} {} {}",
            a,
            op.symbol(),
            b
        )));
    }
    Ok(result)
}

// ==========================================
// 序列构造
// ==========================================

fn construct(
    ctor: SequenceConstructor,
    name: &str,
    args: Vec<ParamValue>,
    kwargs: &[(&str, ParamValue)],
) -> ExprResult<ParamValue> {
    match ctor {
        SequenceConstructor::Array => {
            if args.len() != 1 || !kwargs.is_empty() {
                return Err(ExpressionError::bad_args(name, "需要且仅需要 1 个序列参数"));
            }
            match args.into_iter().next() {
                Some(ParamValue::List(items)) | Some(ParamValue::Tuple(items)) => {
                    if let Some(bad) = items.iter().find(|v| v.as_f64().is_none()) {
                        return Err(ExpressionError::bad_args(
                            name,
                            format!("元素必须为数值: {}", bad),
                        ));
                    }
                    Ok(ParamValue::List(items))
                }
                _ => Err(ExpressionError::bad_args(name, "参数必须为列表或元组")),
            }
        }
        SequenceConstructor::Arange | SequenceConstructor::Range => {
            let mut args = args;
            if let Some((_, step)) = kwargs.iter().find(|(k, _)| *k == "step") {
                if args.len() != 2 {
                    return Err(ExpressionError::bad_args(name, "使用 step= 时需要 start 和 stop"));
                }
                args.push(step.clone());
            }
            arange(ctor, name, &args)
        }
        SequenceConstructor::Linspace | SequenceConstructor::Logspace => {
            linspace(ctor, name, &args, kwargs)
        }
    }
}

fn arange(ctor: SequenceConstructor, name: &str, args: &[ParamValue]) -> ExprResult<ParamValue> {
    for arg in args {
        match arg {
            ParamValue::Int(_) => {}
            ParamValue::Float(_) if ctor == SequenceConstructor::Arange => {}
            other => {
                return Err(ExpressionError::bad_args(
                    name,
                    format!("参数类型不支持: {}", other),
                ))
            }
        }
    }

    let all_int = args.iter().all(|a| matches!(a, ParamValue::Int(_)));
    if all_int {
        let ints: Vec<i64> = args.iter().filter_map(ParamValue::as_i64).collect();
        let (start, stop, step) = match ints.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => return Err(ExpressionError::bad_args(name, "需要 1 到 3 个参数")),
        };
        if step == 0 {
            return Err(ExpressionError::bad_args(name, "step 不能为 0"));
        }
        let span = stop as i128 - start as i128;
        let count = if (span > 0) == (step > 0) && span != 0 {
            let step = step as i128;
            ((span + step - step.signum()) / step).max(0) as u64
        } else {
            0
        };
        check_len(name, count)?;
        // 元素落在 [start, stop) 内，中间乘积用 i128 计算
        let values = (0..count as i128)
            .map(|i| ParamValue::Int((start as i128 + i * step as i128) as i64))
            .collect();
        return Ok(ParamValue::List(values));
    }

    let floats: Vec<f64> = args.iter().filter_map(ParamValue::as_f64).collect();
    let (start, stop, step) = match floats.as_slice() {
        [stop] => (0.0, *stop, 1.0),
        [start, stop] => (*start, *stop, 1.0),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(ExpressionError::bad_args(name, "需要 1 到 3 个参数")),
    };
    if step == 0.0 {
        return Err(ExpressionError::bad_args(name, "step 不能为 0"));
    }
    let raw = ((stop - start) / step).ceil();
    if !raw.is_finite() {
        return Err(ExpressionError::bad_args(name, "区间或步长非有限值"));
    }
    let count = raw.max(0.0) as u64;
    check_len(name, count)?;
    let values = (0..count)
        .map(|i| ParamValue::Float(start + i as f64 * step))
        .collect();
    Ok(ParamValue::List(values))
}

fn linspace(
    ctor: SequenceConstructor,
    name: &str,
    args: &[ParamValue],
    kwargs: &[(&str, ParamValue)],
) -> ExprResult<ParamValue> {
    let mut num_value = None;
    let mut endpoint = true;
    for (keyword, value) in kwargs {
        match *keyword {
            "num" => num_value = Some(value.clone()),
            "endpoint" => {
                endpoint = value
                    .as_bool()
                    .ok_or_else(|| ExpressionError::bad_args(name, "endpoint 必须为布尔值"))?;
            }
            _ => {}
        }
    }

    let (start, stop, positional_num) = match args {
        [start, stop] => (start, stop, None),
        [start, stop, num] => (start, stop, Some(num.clone())),
        _ => return Err(ExpressionError::bad_args(name, "需要 start, stop[, num]")),
    };
    if positional_num.is_some() && num_value.is_some() {
        return Err(ExpressionError::bad_args(name, "num 重复指定"));
    }
    let num = match positional_num.or(num_value) {
        None => DEFAULT_NUM,
        Some(ParamValue::Int(n)) if n >= 0 => n,
        Some(other) => {
            return Err(ExpressionError::bad_args(
                name,
                format!("num 必须为非负整数，实际为 {}", other),
            ))
        }
    };
    let start = start
        .as_f64()
        .ok_or_else(|| ExpressionError::bad_args(name, "start 必须为数值"))?;
    let stop = stop
        .as_f64()
        .ok_or_else(|| ExpressionError::bad_args(name, "stop 必须为数值"))?;
    check_len(name, num as u64)?;

    let divisor = if endpoint { num - 1 } else { num };
    let step = if divisor > 0 {
        (stop - start) / divisor as f64
    } else {
        0.0
    };
    let mut points: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
    if endpoint && num > 1 {
        if let Some(last) = points.last_mut() {
            *last = stop;
        }
    }
    if ctor == SequenceConstructor::Logspace {
        for p in points.iter_mut() {
            *p = 10f64.powf(*p);
        }
    }
    Ok(ParamValue::List(points.into_iter().map(ParamValue::Float).collect()))
}

fn check_len(name: &str, len: u64) -> ExprResult<()> {
    if len > MAX_SEQUENCE_LEN as u64 {
        return Err(ExpressionError::SequenceTooLong {
            name: name.to_string(),
            len,
            limit: MAX_SEQUENCE_LEN,
        });
    }
    Ok(())
}
