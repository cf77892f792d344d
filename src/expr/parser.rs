// ==========================================
// 参数注册表 - 表达式递归下降解析器
// ==========================================
// 文法:
//
//   document  = expr EOF
//   expr      = term (("+" | "-") term)*
//   term      = unary (("*" | "/") unary)*
//   unary     = ("-" | "+") unary | power
//   power     = primary ("**" unary)?
//   primary   = number | string | "None" | "True" | "False"
//             | "[" items "]" | "(" items ")" | "{" (pairs | items)? "}"
//             | name "(" args ")" | name
//   name      = ident ("." ident)*
// ==========================================

use super::ast::{ArithOp, ContainerKind, Expr, UnaryOp};
use super::error::{ExprResult, ExpressionError};
use crate::domain::value::ParamValue;

/// 解析器状态（当前字节位置）
pub(crate) struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// 解析完整输入，不允许尾随字符
    pub(crate) fn parse_document(&mut self) -> ExprResult<Expr> {
        self.skip_ws();
        if self.is_end() {
            return Err(ExpressionError::Empty);
        }
        let expr = self.parse_expr()?;
        self.skip_ws();
        if let Some(ch) = self.peek() {
            return Err(self.error(format!("多余的字符 '{}'", ch)));
        }
        Ok(expr)
    }

    // ===== 字符级操作 =====

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn is_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
    }

    /// 跳过空白后，若下一个字符匹配则消费
    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> ExprResult<()> {
        if self.eat(expected) {
            return Ok(());
        }
        Err(match self.peek() {
            Some(ch) => self.error(format!("期望 '{}'，实际为 '{}'", expected, ch)),
            None => self.error(format!("期望 '{}'，表达式意外结束", expected)),
        })
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::syntax(self.pos, message)
    }

    // ===== 算术层 =====

    fn parse_expr(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = if self.eat('+') {
                ArithOp::Add
            } else if self.eat('-') {
                ArithOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_term()?;
            lhs = arith(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_ws();
            let op = match (self.peek(), self.peek_at(1)) {
                (Some('*'), Some('*')) => break,
                (Some('*'), _) => ArithOp::Mul,
                (Some('/'), Some('/')) => return Err(self.error("不支持整除运算符 '//'")),
                (Some('/'), _) => ArithOp::Div,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = arith(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        if self.eat('-') {
            let operand = self.parse_unary()?;
            // 带符号数值字面量保持字面量类型
            return Ok(match operand {
                Expr::Literal(ParamValue::Int(v)) => match v.checked_neg() {
                    Some(neg) => Expr::Literal(ParamValue::Int(neg)),
                    None => return Err(self.error("整数超出范围")),
                },
                Expr::Literal(ParamValue::Float(v)) => Expr::Literal(ParamValue::Float(-v)),
                other => Expr::Unary(UnaryOp::Neg, Box::new(other)),
            });
        }
        if self.eat('+') {
            let operand = self.parse_unary()?;
            return Ok(match operand {
                lit @ Expr::Literal(ParamValue::Int(_) | ParamValue::Float(_)) => lit,
                other => Expr::Unary(UnaryOp::Pos, Box::new(other)),
            });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> ExprResult<Expr> {
        let base = self.parse_primary()?;
        self.skip_ws();
        if self.rest().starts_with("**") {
            self.pos += 2;
            // ** 右结合，且指数可带一元符号
            let exponent = self.parse_unary()?;
            return Ok(arith(ArithOp::Pow, base, exponent));
        }
        Ok(base)
    }

    // ===== 基本项 =====

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        self.skip_ws();
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Err(self.error("表达式意外结束")),
        };

        match ch {
            '\'' | '"' => self.parse_string().map(|s| Expr::Literal(ParamValue::Str(s))),
            '0'..='9' => self.parse_number(),
            '.' if matches!(self.peek_at(1), Some('0'..='9')) => self.parse_number(),
            '[' => {
                self.bump();
                let items = self.parse_items(']')?;
                Ok(Expr::Container(ContainerKind::List, items))
            }
            '(' => self.parse_paren(),
            '{' => self.parse_brace(),
            c if is_ident_start(c) => self.parse_name_or_call(),
            other => Err(self.error(format!("无法识别的字符 '{}'", other))),
        }
    }

    /// 逗号分隔的元素列表，允许尾随逗号（开括号已消费）
    fn parse_items(&mut self, close: char) -> ExprResult<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_expr()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(',')?;
        }
    }

    /// `()` 空元组 / `(x)` 分组 / `(x,)` `(x, y)` 元组
    fn parse_paren(&mut self) -> ExprResult<Expr> {
        self.bump();
        if self.eat(')') {
            return Ok(Expr::Container(ContainerKind::Tuple, Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.eat(')') {
            return Ok(first);
        }
        self.expect(',')?;
        let mut items = vec![first];
        items.extend(self.parse_items(')')?);
        Ok(Expr::Container(ContainerKind::Tuple, items))
    }

    /// `{}` 空映射 / `{k: v, ...}` 映射 / `{a, b}` 集合
    fn parse_brace(&mut self) -> ExprResult<Expr> {
        self.bump();
        if self.eat('}') {
            return Ok(Expr::Mapping(Vec::new()));
        }
        let first = self.parse_expr()?;
        if !self.eat(':') {
            let mut items = vec![first];
            if !self.eat('}') {
                self.expect(',')?;
                items.extend(self.parse_items('}')?);
            }
            return Ok(Expr::Container(ContainerKind::Set, items));
        }

        let mut pairs = vec![(first, self.parse_expr()?)];
        loop {
            if self.eat('}') {
                return Ok(Expr::Mapping(pairs));
            }
            self.expect(',')?;
            if self.eat('}') {
                return Ok(Expr::Mapping(pairs));
            }
            let key = self.parse_expr()?;
            self.expect(':')?;
            let value = self.parse_expr()?;
            pairs.push((key, value));
        }
    }

    fn parse_string(&mut self) -> ExprResult<String> {
        let start = self.pos;
        let quote = match self.bump() {
            Some(q) => q,
            None => return Err(self.error("表达式意外结束")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ExpressionError::syntax(start, "字符串未闭合"));
                }
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(ExpressionError::syntax(start, "字符串未闭合")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> ExprResult<Expr> {
        let start = self.pos;
        let mut is_float = false;

        self.take_digits();
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            self.take_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let has_exponent = match self.peek_at(1) {
                Some('0'..='9') => true,
                Some('+' | '-') => matches!(self.peek_at(2), Some('0'..='9')),
                _ => false,
            };
            if !has_exponent {
                return Err(self.error("指数部分不完整"));
            }
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            self.take_digits();
        }
        if matches!(self.peek(), Some(c) if is_ident_start(c)) {
            return Err(self.error("数值后出现非法字符"));
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(|v| Expr::Literal(ParamValue::Float(v)))
                .map_err(|e| {
                    ExpressionError::syntax(start, format!("浮点数无效 '{}': {}", text, e))
                })
        } else {
            text.parse::<i64>()
                .map(|v| Expr::Literal(ParamValue::Int(v)))
                .map_err(|_| ExpressionError::syntax(start, format!("整数超出范围 '{}'", text)))
        }
    }

    fn take_digits(&mut self) {
        while matches!(self.peek(), Some('0'..='9')) {
            self.bump();
        }
    }

    fn parse_ident(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// 点分名称（`np.arange`）
    fn parse_dotted_name(&mut self) -> ExprResult<String> {
        let mut name = self.parse_ident().to_string();
        while self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if is_ident_start(c)) {
            self.bump();
            name.push('.');
            name.push_str(self.parse_ident());
        }
        if self.peek() == Some('.') {
            return Err(self.error(format!("名称 '{}' 后出现非法的 '.'", name)));
        }
        Ok(name)
    }

    fn parse_name_or_call(&mut self) -> ExprResult<Expr> {
        let name = self.parse_dotted_name()?;
        match name.as_str() {
            "None" => return Ok(Expr::Literal(ParamValue::Null)),
            "True" => return Ok(Expr::Literal(ParamValue::Bool(true))),
            "False" => return Ok(Expr::Literal(ParamValue::Bool(false))),
            _ => {}
        }

        if !self.eat('(') {
            return Ok(Expr::Marker(name));
        }

        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        loop {
            if self.eat(')') {
                break;
            }
            match self.try_keyword()? {
                Some(keyword) => {
                    let value = self.parse_expr()?;
                    kwargs.push((keyword, value));
                }
                None => {
                    if !kwargs.is_empty() {
                        return Err(self.error("位置参数不能出现在关键字参数之后"));
                    }
                    args.push(self.parse_expr()?);
                }
            }
            if self.eat(')') {
                break;
            }
            self.expect(',')?;
        }
        Ok(Expr::Constructor { name, args, kwargs })
    }

    /// 尝试解析 `name=`，失败时回退位置
    fn try_keyword(&mut self) -> ExprResult<Option<String>> {
        self.skip_ws();
        let snapshot = self.pos;
        if !matches!(self.peek(), Some(c) if is_ident_start(c)) {
            return Ok(None);
        }
        let ident = self.parse_ident().to_string();
        self.skip_ws();
        if self.peek() == Some('=') && self.peek_at(1) != Some('=') {
            self.bump();
            return Ok(Some(ident));
        }
        self.pos = snapshot;
        Ok(None)
    }
}

fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Arithmetic {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ExprResult<Expr> {
        Parser::new(src).parse_document()
    }

    #[test]
    fn test_signed_literal_folds() {
        assert_eq!(parse("-5").unwrap(), Expr::Literal(ParamValue::Int(-5)));
        assert_eq!(parse(" -0.5 ").unwrap(), Expr::Literal(ParamValue::Float(-0.5)));
        assert_eq!(parse("+3e2").unwrap(), Expr::Literal(ParamValue::Float(300.0)));
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        // -2**2 == -(2**2)
        match parse("-2**2").unwrap() {
            Expr::Unary(UnaryOp::Neg, inner) => {
                assert!(matches!(*inner, Expr::Arithmetic { op: ArithOp::Pow, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_tuple_vs_grouping() {
        assert_eq!(parse("(1)").unwrap(), Expr::Literal(ParamValue::Int(1)));
        assert!(matches!(
            parse("(1,)").unwrap(),
            Expr::Container(ContainerKind::Tuple, ref items) if items.len() == 1
        ));
        assert!(matches!(
            parse("()").unwrap(),
            Expr::Container(ContainerKind::Tuple, ref items) if items.is_empty()
        ));
    }

    #[test]
    fn test_brace_forms() {
        assert_eq!(parse("{}").unwrap(), Expr::Mapping(Vec::new()));
        assert!(matches!(parse("{'a': 1,}").unwrap(), Expr::Mapping(ref p) if p.len() == 1));
        assert!(matches!(
            parse("{1, 2}").unwrap(),
            Expr::Container(ContainerKind::Set, ref items) if items.len() == 2
        ));
    }

    #[test]
    fn test_call_with_keywords() {
        match parse("np.linspace(0, 1, num=5)").unwrap() {
            Expr::Constructor { name, args, kwargs } => {
                assert_eq!(name, "np.linspace");
                assert_eq!(args.len(), 2);
                assert_eq!(kwargs.len(), 1);
                assert_eq!(kwargs[0].0, "num");
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors_report_position() {
        match parse("[1, 2") {
            Err(ExpressionError::Syntax { position, .. }) => assert_eq!(position, 5),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(parse("'abc"), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(parse("1 2"), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(parse("3 // 2"), Err(ExpressionError::Syntax { .. })));
        assert_eq!(parse("   "), Err(ExpressionError::Empty));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse(r#"'it\'s'"#).unwrap(),
            Expr::Literal(ParamValue::Str("it's".to_string()))
        );
        assert_eq!(
            parse(r#""a\nb""#).unwrap(),
            Expr::Literal(ParamValue::Str("a\nb".to_string()))
        );
    }
}
