use super::{ParseError, Rule};
use crate::ast::{
    BinaryOp, Expression, FunctionBody, FunctionDef, Literal, LogicalOp, Statement, UnaryOp,
};
use pest::iterators::{Pair, Pairs};

fn unexpected(expected: &str, pair: &Pair<Rule>) -> ParseError {
    ParseError::UnexpectedRule {
        expected: expected.to_string(),
        found: format!("{:?} `{}`", pair.as_rule(), pair.as_str()),
    }
}

fn missing(expected: &str) -> ParseError {
    ParseError::UnexpectedRule {
        expected: expected.to_string(),
        found: "nothing".to_string(),
    }
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_function
            | Rule::kw_return
            | Rule::kw_decl
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_typeof
    )
}

/// Children of `pair` without the keyword tokens.
fn significant(pair: Pair<Rule>) -> impl Iterator<Item = Pair<Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

pub(super) fn build_function(pair: Pair<Rule>) -> Result<FunctionDef, ParseError> {
    let pair = match pair.as_rule() {
        Rule::function_def => pair
            .into_inner()
            .next()
            .ok_or_else(|| missing("arrow function or function expression"))?,
        _ => pair,
    };
    match pair.as_rule() {
        Rule::function_expr => {
            let mut name = None;
            let mut params = Vec::new();
            let mut body = None;
            for child in significant(pair) {
                match child.as_rule() {
                    Rule::ident => name = Some(child.as_str().to_string()),
                    Rule::params => params = build_params(child),
                    Rule::block => body = Some(FunctionBody::Block(build_block(child)?)),
                    _ => return Err(unexpected("function expression part", &child)),
                }
            }
            Ok(FunctionDef {
                name,
                params,
                body: body.ok_or_else(|| missing("function body"))?,
            })
        }
        Rule::arrow_fn => {
            let mut inner = pair.into_inner();
            let params_pair = inner.next().ok_or_else(|| missing("arrow parameters"))?;
            let param = params_pair
                .into_inner()
                .next()
                .ok_or_else(|| missing("arrow parameters"))?;
            let params = match param.as_rule() {
                Rule::params => build_params(param),
                Rule::ident => vec![param.as_str().to_string()],
                _ => return Err(unexpected("arrow parameters", &param)),
            };
            let body_pair = inner
                .next()
                .and_then(|b| b.into_inner().next())
                .ok_or_else(|| missing("arrow body"))?;
            let body = match body_pair.as_rule() {
                Rule::block => FunctionBody::Block(build_block(body_pair)?),
                Rule::expression => FunctionBody::Expression(Box::new(build_expression(body_pair)?)),
                _ => return Err(unexpected("arrow body", &body_pair)),
            };
            Ok(FunctionDef {
                name: None,
                params,
                body,
            })
        }
        _ => Err(unexpected("function definition", &pair)),
    }
}

fn build_params(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .collect()
}

fn build_block(pair: Pair<Rule>) -> Result<Vec<Statement>, ParseError> {
    pair.into_inner().map(build_statement).collect()
}

fn build_statement(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let pair = match pair.as_rule() {
        Rule::statement => pair.into_inner().next().ok_or_else(|| missing("statement"))?,
        _ => pair,
    };
    match pair.as_rule() {
        Rule::empty_stmt => Ok(Statement::Empty),
        Rule::declaration => {
            let mut inner = significant(pair);
            let name = inner
                .next()
                .ok_or_else(|| missing("declared name"))?
                .as_str()
                .to_string();
            let init = inner.next().map(build_expression).transpose()?;
            Ok(Statement::Declare(name, init))
        }
        Rule::return_stmt => {
            let value = significant(pair).next().map(build_expression).transpose()?;
            Ok(Statement::Return(value))
        }
        Rule::if_stmt => {
            let mut inner = significant(pair);
            let test = build_expression(inner.next().ok_or_else(|| missing("if condition"))?)?;
            let then = build_branch(inner.next().ok_or_else(|| missing("if branch"))?)?;
            let otherwise = inner.next().map(build_branch).transpose()?;
            Ok(Statement::If(test, then, otherwise))
        }
        Rule::expr_stmt => {
            let expr = pair
                .into_inner()
                .next()
                .ok_or_else(|| missing("expression"))?;
            Ok(Statement::Expression(build_expression(expr)?))
        }
        _ => Err(unexpected("statement", &pair)),
    }
}

fn build_branch(pair: Pair<Rule>) -> Result<Vec<Statement>, ParseError> {
    let inner = pair.into_inner().next().ok_or_else(|| missing("branch"))?;
    match inner.as_rule() {
        Rule::block => build_block(inner),
        _ => Ok(vec![build_statement(inner)?]),
    }
}

pub(super) fn build_expression(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    match pair.as_rule() {
        Rule::expression => {
            build_expression(pair.into_inner().next().ok_or_else(|| missing("expression"))?)
        }
        Rule::conditional => {
            let mut inner = pair.into_inner();
            let test = build_expression(inner.next().ok_or_else(|| missing("expression"))?)?;
            match (inner.next(), inner.next()) {
                (Some(then), Some(otherwise)) => Ok(Expression::Conditional(
                    Box::new(test),
                    Box::new(build_expression(then)?),
                    Box::new(build_expression(otherwise)?),
                )),
                _ => Ok(test),
            }
        }
        Rule::logical_or | Rule::logical_and => build_chain(pair.into_inner(), |op| match op {
            "||" => Some(Chain::Logical(LogicalOp::Or)),
            "??" => Some(Chain::Logical(LogicalOp::Coalesce)),
            "&&" => Some(Chain::Logical(LogicalOp::And)),
            _ => None,
        }),
        Rule::equality | Rule::relational | Rule::additive | Rule::multiplicative => {
            build_chain(pair.into_inner(), |op| {
                let op = match op {
                    "===" => BinaryOp::StrictEqual,
                    "!==" => BinaryOp::StrictNotEqual,
                    "==" => BinaryOp::Equal,
                    "!=" => BinaryOp::NotEqual,
                    "<=" => BinaryOp::LessEqual,
                    ">=" => BinaryOp::GreaterEqual,
                    "<" => BinaryOp::Less,
                    ">" => BinaryOp::Greater,
                    "+" => BinaryOp::Add,
                    "-" => BinaryOp::Subtract,
                    "*" => BinaryOp::Multiply,
                    "/" => BinaryOp::Divide,
                    "%" => BinaryOp::Remainder,
                    _ => return None,
                };
                Some(Chain::Binary(op))
            })
        }
        Rule::unary => {
            let mut ops = Vec::new();
            let mut operand = None;
            for child in pair.into_inner() {
                match child.as_rule() {
                    Rule::unary_op => ops.push(match child.as_str() {
                        "!" => UnaryOp::Not,
                        "-" => UnaryOp::Negate,
                        "+" => UnaryOp::Plus,
                        _ => UnaryOp::TypeOf,
                    }),
                    _ => operand = Some(build_expression(child)?),
                }
            }
            let operand = operand.ok_or_else(|| missing("unary operand"))?;
            Ok(ops
                .into_iter()
                .rev()
                .fold(operand, |expr, op| Expression::Unary(op, Box::new(expr))))
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let mut expr = build_expression(inner.next().ok_or_else(|| missing("operand"))?)?;
            for suffix in inner {
                expr = match suffix.as_rule() {
                    Rule::member => {
                        let name = suffix
                            .into_inner()
                            .next()
                            .ok_or_else(|| missing("property name"))?;
                        Expression::Member(Box::new(expr), name.as_str().to_string())
                    }
                    Rule::index => {
                        let key = suffix
                            .into_inner()
                            .next()
                            .ok_or_else(|| missing("index expression"))?;
                        Expression::Index(Box::new(expr), Box::new(build_expression(key)?))
                    }
                    Rule::call_args => {
                        let args = suffix
                            .into_inner()
                            .map(build_expression)
                            .collect::<Result<Vec<_>, _>>()?;
                        Expression::Call(Box::new(expr), args)
                    }
                    _ => return Err(unexpected("member access, index or call", &suffix)),
                };
            }
            Ok(expr)
        }
        Rule::primary => {
            let inner = pair.into_inner().next().ok_or_else(|| missing("primary"))?;
            build_primary(inner)
        }
        _ => build_primary(pair),
    }
}

enum Chain {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Folds `operand (op operand)*` left-associatively.
fn build_chain(
    mut pairs: Pairs<Rule>,
    operator: impl Fn(&str) -> Option<Chain>,
) -> Result<Expression, ParseError> {
    let mut left = build_expression(pairs.next().ok_or_else(|| missing("operand"))?)?;
    while let Some(op_pair) = pairs.next() {
        let op = operator(op_pair.as_str()).ok_or_else(|| unexpected("operator", &op_pair))?;
        let right = build_expression(pairs.next().ok_or_else(|| missing("right operand"))?)?;
        left = match op {
            Chain::Binary(op) => Expression::Binary(op, Box::new(left), Box::new(right)),
            Chain::Logical(op) => Expression::Logical(op, Box::new(left), Box::new(right)),
        };
    }
    Ok(left)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    match pair.as_rule() {
        Rule::function_def => {
            let source = pair.as_str().to_string();
            Ok(Expression::Function(Box::new(build_function(pair)?), source))
        }
        Rule::template => build_template(pair),
        Rule::literal => Ok(Expression::Literal(build_literal(pair)?)),
        Rule::ident => Ok(Expression::Identifier(pair.as_str().to_string())),
        Rule::array_lit => Ok(Expression::Array(
            pair.into_inner()
                .map(build_expression)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Rule::object_lit => {
            let mut props = Vec::new();
            for prop in pair.into_inner() {
                let mut inner = prop.into_inner();
                let head = inner.next().ok_or_else(|| missing("property"))?;
                match head.as_rule() {
                    // shorthand `{ name }`
                    Rule::ident => {
                        let name = head.as_str().to_string();
                        props.push((name.clone(), Expression::Identifier(name)));
                    }
                    Rule::property_key => {
                        let key = build_property_key(head)?;
                        let value = build_expression(
                            inner.next().ok_or_else(|| missing("property value"))?,
                        )?;
                        props.push((key, value));
                    }
                    _ => return Err(unexpected("property", &head)),
                }
            }
            Ok(Expression::Object(props))
        }
        Rule::expression => build_expression(pair),
        _ => Err(unexpected("primary expression", &pair)),
    }
}

/// Template literals lower to string concatenation starting from `""`.
fn build_template(pair: Pair<Rule>) -> Result<Expression, ParseError> {
    let mut acc = Expression::Literal(Literal::String(String::new()));
    for part in pair.into_inner() {
        let piece = match part.as_rule() {
            Rule::template_chars => {
                let text = unescape(part.as_str()).map_err(|m| invalid_literal(&part, m))?;
                Expression::Literal(Literal::String(text))
            }
            Rule::template_sub => build_expression(
                part.into_inner()
                    .next()
                    .ok_or_else(|| missing("template substitution"))?,
            )?,
            _ => return Err(unexpected("template part", &part)),
        };
        acc = Expression::Binary(BinaryOp::Add, Box::new(acc), Box::new(piece));
    }
    Ok(acc)
}

fn build_property_key(pair: Pair<Rule>) -> Result<String, ParseError> {
    let key = pair.into_inner().next().ok_or_else(|| missing("property key"))?;
    match key.as_rule() {
        Rule::property_name => Ok(key.as_str().to_string()),
        Rule::string => build_string(key),
        Rule::number => Ok(crate::runtime::number::render_number(build_number(key)?)),
        _ => Err(unexpected("property key", &key)),
    }
}

fn build_literal(pair: Pair<Rule>) -> Result<Literal, ParseError> {
    let inner = pair.into_inner().next().ok_or_else(|| missing("literal"))?;
    match inner.as_rule() {
        Rule::number => Ok(Literal::Number(build_number(inner)?)),
        Rule::string => Ok(Literal::String(build_string(inner)?)),
        Rule::kw_true => Ok(Literal::Boolean(true)),
        Rule::kw_false => Ok(Literal::Boolean(false)),
        Rule::kw_null => Ok(Literal::Null),
        Rule::kw_undefined => Ok(Literal::Undefined),
        _ => Err(unexpected("literal", &inner)),
    }
}

fn invalid_literal(pair: &Pair<Rule>, message: String) -> ParseError {
    let (line, column) = pair.line_col();
    ParseError::InvalidLiteral {
        message,
        line,
        column,
    }
}

fn build_number(pair: Pair<Rule>) -> Result<f64, ParseError> {
    let text = pair.as_str();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).map(|v| v as f64).ok(),
        None => text.parse::<f64>().ok(),
    };
    parsed.ok_or_else(|| invalid_literal(&pair, format!("invalid number `{}`", text)))
}

fn build_string(pair: Pair<Rule>) -> Result<String, ParseError> {
    let raw = pair
        .clone()
        .into_inner()
        .next()
        .map(|chars| chars.as_str())
        .unwrap_or("");
    unescape(raw).map_err(|message| invalid_literal(&pair, message))
}

/// Resolves backslash escapes inside a quoted string body.
pub(super) fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars
            .next()
            .ok_or_else(|| "trailing backslash".to_string())?;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            other => out.push(other),
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, String> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err(format!("truncated escape `{}`", hex));
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape `{}`", hex))
}

#[cfg(test)]
mod tests {
    use super::unescape;

    #[test]
    fn unescape_handles_unicode_and_hex() {
        assert_eq!(unescape(r"é\x41").unwrap(), "éA");
        assert_eq!(unescape(r"a\\b").unwrap(), "a\\b");
        assert!(unescape(r"\u12").is_err());
    }
}
